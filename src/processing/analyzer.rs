//! Job description analysis: posting text into labeled requirements

use crate::error::{Result, ResumeTailorError};
use crate::llm::prompts::{PromptTemplates, SYSTEM_PROMPT};
use crate::llm::response::extract_json;
use crate::llm::{complete_structured, LlmClient, LlmRequest};
use crate::processing::document::{JobRequirement, RequirementCategory};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;

pub struct JobAnalyzer<'a, L: LlmClient> {
    llm: &'a L,
    prompts: PromptTemplates,
}

impl<'a, L: LlmClient> JobAnalyzer<'a, L> {
    pub fn new(llm: &'a L) -> Self {
        Self {
            llm,
            prompts: PromptTemplates::default(),
        }
    }

    pub async fn analyze(&self, job_text: &str) -> Result<Vec<JobRequirement>> {
        if job_text.trim().is_empty() {
            return Err(ResumeTailorError::InvalidInput(
                "Job description is empty".to_string(),
            ));
        }

        let request = LlmRequest::new(SYSTEM_PROMPT, self.prompts.render_analyze_job(job_text));
        let requirements = complete_structured(self.llm, &request, interpret_requirements).await?;

        info!("Extracted {} job requirements", requirements.len());
        Ok(requirements)
    }
}

/// Turn an LLM reply into a duplicate-free requirement list.
///
/// Duplicates are detected case-insensitively within a category; the first
/// spelling wins.
pub fn interpret_requirements(reply: &str) -> Result<Vec<JobRequirement>> {
    let Value::Object(categories) = extract_json(reply)? else {
        return Err(ResumeTailorError::MalformedResponse(
            "Expected a JSON object keyed by requirement category".to_string(),
        ));
    };

    let mut seen = HashSet::new();
    let mut requirements = Vec::new();

    for (label, value) in categories {
        let category = RequirementCategory::parse(&label);
        let items = match value {
            Value::Array(items) => items,
            Value::String(text) => vec![Value::String(text)],
            Value::Null => continue,
            other => {
                debug!("Ignoring non-list requirement category {}: {}", label, other);
                continue;
            }
        };

        for item in items {
            let Some(text) = item.as_str().map(str::trim).filter(|t| !t.is_empty()) else {
                continue;
            };
            if seen.insert((category.clone(), text.to_lowercase())) {
                requirements.push(JobRequirement {
                    category: category.clone(),
                    text: text.to_string(),
                });
            }
        }
    }

    if requirements.is_empty() {
        return Err(ResumeTailorError::MalformedResponse(
            "LLM reply contained no job requirements".to_string(),
        ));
    }

    Ok(requirements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::ScriptedLlm;

    #[test]
    fn test_requirements_are_deduplicated_per_category() {
        let reply = r#"{
            "skills": ["Python", "python", " SQL ", ""],
            "experience": ["Python"],
            "qualifications": []
        }"#;
        let requirements = interpret_requirements(reply).unwrap();

        let skills: Vec<_> = requirements
            .iter()
            .filter(|r| r.category == RequirementCategory::Skills)
            .map(|r| r.text.as_str())
            .collect();
        assert_eq!(skills, vec!["Python", "SQL"]);
        assert!(requirements
            .iter()
            .any(|r| r.category == RequirementCategory::Experience && r.text == "Python"));
        assert_eq!(requirements.len(), 3);
    }

    #[test]
    fn test_custom_categories_are_kept() {
        let reply = r#"{"Tools": ["Docker"]}"#;
        let requirements = interpret_requirements(reply).unwrap();
        assert_eq!(requirements[0].category, RequirementCategory::Other("tools".to_string()));
    }

    #[test]
    fn test_empty_result_is_malformed() {
        for reply in [r#"{"skills": []}"#, "[]", "no json here"] {
            assert!(
                matches!(
                    interpret_requirements(reply),
                    Err(ResumeTailorError::MalformedResponse(_))
                ),
                "reply {:?} should be malformed",
                reply
            );
        }
    }

    #[tokio::test]
    async fn test_analyze_retries_once() {
        let llm = ScriptedLlm::new()
            .reply(r#"{"skills": []}"#)
            .reply(r#"{"skills": ["Kubernetes"]}"#);

        let requirements = JobAnalyzer::new(&llm)
            .analyze("We run Kubernetes in production.")
            .await
            .unwrap();

        assert_eq!(requirements.len(), 1);
        assert_eq!(llm.call_count(), 2);
        assert!(llm.requests()[0].prompt.contains("We run Kubernetes in production."));
    }
}

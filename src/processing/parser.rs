//! Resume parsing: master resume text into labeled content blocks

use crate::error::{Result, ResumeTailorError};
use crate::llm::prompts::{PromptTemplates, SYSTEM_PROMPT};
use crate::llm::response::extract_json;
use crate::llm::{complete_structured, LlmClient, LlmRequest};
use crate::processing::document::{BlockCategory, ResumeBlock};
use crate::processing::grounding::SourceVocabulary;
use log::{debug, info};
use serde_json::{Map, Value};

/// Field names folded into a block title when the reply uses per-field objects.
const TITLE_FIELDS: &[&str] = &["title", "name", "company", "organization", "institution", "location", "duration", "dates"];
const BULLET_FIELDS: &[&str] = &["bullets", "items", "highlights", "details"];
const CATEGORY_FIELDS: &[&str] = &["block_type", "type", "category"];

pub struct ResumeParser<'a, L: LlmClient> {
    llm: &'a L,
    prompts: PromptTemplates,
}

impl<'a, L: LlmClient> ResumeParser<'a, L> {
    pub fn new(llm: &'a L) -> Self {
        Self {
            llm,
            prompts: PromptTemplates::default(),
        }
    }

    /// Split the resume into blocks, in source order.
    ///
    /// Every word of every block must occur in `resume_text`; a reply that
    /// invents text is treated as malformed.
    pub async fn parse(&self, resume_text: &str) -> Result<Vec<ResumeBlock>> {
        if resume_text.trim().is_empty() {
            return Err(ResumeTailorError::InvalidInput("Resume text is empty".to_string()));
        }

        let request = LlmRequest::new(SYSTEM_PROMPT, self.prompts.render_parse_resume(resume_text));
        let vocabulary = SourceVocabulary::new(resume_text);

        let blocks = complete_structured(self.llm, &request, |reply| {
            let blocks = interpret_blocks(reply)?;
            check_grounding(&blocks, &vocabulary)?;
            Ok(blocks)
        })
        .await?;

        info!("Parsed resume into {} blocks", blocks.len());
        Ok(blocks)
    }
}

/// Turn an LLM reply into numbered blocks.
pub fn interpret_blocks(reply: &str) -> Result<Vec<ResumeBlock>> {
    let value = extract_json(reply)?;
    let raw_blocks = raw_block_list(value)?;

    let blocks: Vec<ResumeBlock> = raw_blocks
        .into_iter()
        .filter_map(|raw| block_parts(&raw))
        .enumerate()
        .map(|(i, (category, title, body))| ResumeBlock::new(i + 1, category, title, body))
        .collect();

    if blocks.is_empty() {
        return Err(ResumeTailorError::MalformedResponse(
            "LLM reply contained no resume blocks".to_string(),
        ));
    }

    Ok(blocks)
}

fn raw_block_list(value: Value) -> Result<Vec<Map<String, Value>>> {
    let entries = match value {
        Value::Array(items) => items,
        Value::Object(mut object) => match object.remove("blocks") {
            Some(Value::Array(items)) => items,
            Some(_) => {
                return Err(ResumeTailorError::MalformedResponse(
                    "\"blocks\" is not an array".to_string(),
                ))
            }
            None => numbered_blocks(object),
        },
        _ => {
            return Err(ResumeTailorError::MalformedResponse(
                "Expected a JSON object or array of blocks".to_string(),
            ))
        }
    };

    entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(map) => Ok(map),
            other => Err(ResumeTailorError::MalformedResponse(format!(
                "Block is not an object: {}",
                other
            ))),
        })
        .collect()
}

/// `{"block_1": {...}, "block_2": {...}, "total_blocks": 2}` in numeric order.
fn numbered_blocks(object: Map<String, Value>) -> Vec<Value> {
    let mut numbered: Vec<(usize, Value)> = object
        .into_iter()
        .filter_map(|(key, value)| {
            let index = key.strip_prefix("block_")?.parse().ok()?;
            Some((index, value))
        })
        .collect();
    numbered.sort_by_key(|(index, _)| *index);
    numbered.into_iter().map(|(_, value)| value).collect()
}

fn block_parts(raw: &Map<String, Value>) -> Option<(BlockCategory, Option<String>, String)> {
    let category = CATEGORY_FIELDS
        .iter()
        .find_map(|field| raw.get(*field).and_then(Value::as_str))
        .map(BlockCategory::parse)?;

    let (title, body) = match raw.get("body").and_then(Value::as_str) {
        Some(body) => (
            raw.get("title").and_then(Value::as_str).map(str::to_string),
            body.to_string(),
        ),
        None => fielded_block(raw),
    };

    let title = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    let body = body.trim().to_string();
    if title.is_none() && body.is_empty() {
        debug!("Skipping empty {} block", category);
        return None;
    }
    Some((category, title, body))
}

/// Flatten a block written as named fields (`company`, `bullets`, ...).
fn fielded_block(raw: &Map<String, Value>) -> (Option<String>, String) {
    let title_parts: Vec<&str> = TITLE_FIELDS
        .iter()
        .filter_map(|field| raw.get(*field).and_then(Value::as_str))
        .filter(|s| !s.trim().is_empty())
        .collect();
    let title = (!title_parts.is_empty()).then(|| title_parts.join(", "));

    let mut lines = Vec::new();
    for (key, value) in raw {
        let key = key.as_str();
        if CATEGORY_FIELDS.contains(&key) || TITLE_FIELDS.contains(&key) {
            continue;
        }
        match value {
            Value::String(text) if !text.trim().is_empty() => lines.push(text.trim().to_string()),
            Value::Array(items) => {
                let items: Vec<String> = items.iter().filter_map(scalar_text).collect();
                if items.is_empty() {
                    continue;
                }
                if BULLET_FIELDS.contains(&key) {
                    lines.extend(items.iter().map(|item| format!("- {}", item)));
                } else {
                    // Field names are not resume text; only the values are kept.
                    lines.push(items.join(", "));
                }
            }
            Value::Object(nested) => {
                let (nested_title, nested_body) = fielded_block(nested);
                lines.extend(nested_title);
                if !nested_body.is_empty() {
                    lines.push(nested_body);
                }
            }
            _ => {}
        }
    }

    (title, lines.join("\n"))
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn check_grounding(blocks: &[ResumeBlock], vocabulary: &SourceVocabulary) -> Result<()> {
    for block in blocks {
        let unknown = vocabulary.unknown_words(&block.full_text());
        if !unknown.is_empty() {
            let sample: Vec<_> = unknown.into_iter().take(5).collect();
            return Err(ResumeTailorError::MalformedResponse(format!(
                "{} contains text absent from the resume: {}",
                block.id,
                sample.join(", ")
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::ScriptedLlm;

    const RESUME: &str = r"\name{Jane Doe}
\section{Experience}
\textbf{Backend Engineer}, Acme Corp, 2020--2023
\item Built payment services in Rust
\section{Skills}
Rust, Python, SQL";

    #[test]
    fn test_interpret_blocks_array_shape() {
        let reply = r#"{"blocks": [
            {"block_type": "contact information", "title": null, "body": "Jane Doe"},
            {"block_type": "Work Experience", "title": "Backend Engineer, Acme Corp", "body": "- Built payment services in Rust"}
        ]}"#;
        let blocks = interpret_blocks(reply).unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].id, "block_1");
        assert_eq!(blocks[0].category, BlockCategory::ContactInformation);
        assert_eq!(blocks[1].category, BlockCategory::WorkExperience);
        assert_eq!(blocks[1].title.as_deref(), Some("Backend Engineer, Acme Corp"));
    }

    #[test]
    fn test_interpret_blocks_numbered_shape() {
        let reply = r#"```json
        {
            "block_2": {"block_type": "skills", "Languages": ["Rust", "Python"]},
            "block_10": {"block_type": "project", "title": "Compiler", "bullets": ["Wrote a parser"]},
            "block_1": {"block_type": "work experience", "title": "Engineer", "company": "Acme",
                        "bullets": ["Built services", "Ran on-call"]},
            "total_blocks": "3"
        }
        ```"#;
        let blocks = interpret_blocks(reply).unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].title.as_deref(), Some("Engineer, Acme"));
        assert_eq!(blocks[0].body, "- Built services\n- Ran on-call");
        assert_eq!(blocks[1].body, "Rust, Python");
        assert_eq!(blocks[2].category, BlockCategory::Project);
        assert_eq!(blocks[2].id, "block_3");
    }

    #[test]
    fn test_blocks_without_category_are_skipped() {
        let reply = r#"[{"title": "orphan", "body": "x"}, {"block_type": "skills", "body": "Rust"}]"#;
        let blocks = interpret_blocks(reply).unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].id, "block_1");
    }

    #[test]
    fn test_empty_reply_is_malformed() {
        assert!(matches!(
            interpret_blocks(r#"{"blocks": []}"#),
            Err(ResumeTailorError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_parse_accepts_grounded_blocks() {
        let llm = ScriptedLlm::new().reply(
            r#"{"blocks": [
                {"block_type": "contact information", "body": "Jane Doe"},
                {"block_type": "work experience", "title": "Backend Engineer, Acme Corp, 2020--2023",
                 "body": "- Built payment services in Rust"},
                {"block_type": "skills", "body": "Rust, Python, SQL"}
            ]}"#,
        );
        let blocks = ResumeParser::new(&llm).parse(RESUME).await.unwrap();

        assert_eq!(blocks.len(), 3);
        assert_eq!(llm.call_count(), 1);
        assert!(llm.requests()[0].prompt.contains("Built payment services in Rust"));
    }

    #[tokio::test]
    async fn test_parse_accepts_grounded_numbered_fields_in_reply_order() {
        let resume = "Compiler\nWrote a recursive descent parser\n- Emitted LLVM IR\nRust, LLVM";
        let llm = ScriptedLlm::new().reply(
            r#"{"block_1": {"block_type": "project", "title": "Compiler",
                "description": "Wrote a recursive descent parser",
                "bullets": ["Emitted LLVM IR"],
                "technologies": ["Rust", "LLVM"]},
              "total_blocks": 1}"#,
        );

        let blocks = ResumeParser::new(&llm).parse(resume).await.unwrap();

        assert_eq!(llm.call_count(), 1);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].title.as_deref(), Some("Compiler"));
        assert_eq!(
            blocks[0].body,
            "Wrote a recursive descent parser\n- Emitted LLVM IR\nRust, LLVM"
        );
    }

    #[tokio::test]
    async fn test_parse_rejects_invented_text_after_one_retry() {
        let invented = r#"{"blocks": [{"block_type": "work experience", "title": "Backend Engineer",
            "body": "- Led forty engineers"}]}"#;
        let llm = ScriptedLlm::new().reply(invented).reply(invented);

        let err = ResumeParser::new(&llm).parse(RESUME).await.unwrap_err();
        assert!(matches!(err, ResumeTailorError::MalformedResponse(ref m) if m.contains("forty")));
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_parse_recovers_on_second_reply() {
        let llm = ScriptedLlm::new()
            .reply("Sorry, here is a summary instead.")
            .reply(r#"[{"block_type": "skills", "body": "Rust, SQL"}]"#);

        let blocks = ResumeParser::new(&llm).parse(RESUME).await.unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_service_errors_are_not_retried() {
        let llm = ScriptedLlm::new()
            .fail(ResumeTailorError::ServiceUnavailable("down".to_string()))
            .reply(r#"[{"block_type": "skills", "body": "Rust"}]"#);

        let err = ResumeParser::new(&llm).parse(RESUME).await.unwrap_err();
        assert!(matches!(err, ResumeTailorError::ServiceUnavailable(_)));
        assert_eq!(llm.call_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_resume_is_invalid_input() {
        let llm = ScriptedLlm::new();
        let err = ResumeParser::new(&llm).parse("   ").await.unwrap_err();
        assert!(matches!(err, ResumeTailorError::InvalidInput(_)));
        assert_eq!(llm.call_count(), 0);
    }
}

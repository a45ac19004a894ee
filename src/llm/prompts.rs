//! Prompt templates for each LLM-backed stage

use crate::processing::document::{JobRequirement, ResumeBlock};
use serde_json::json;

pub const SYSTEM_PROMPT: &str =
    "You are an expert resume tailoring assistant. Follow the output format exactly and never invent content.";

/// Context for the layout critique prompt
#[derive(Debug, Clone)]
pub struct CritiqueParams {
    pub page_count: usize,
    pub max_pages: usize,
    pub font_size_pt: f64,
    pub margin_in: f64,
    pub item_sep_pt: f64,
    pub least_important_included: Vec<String>,
    pub most_important_excluded: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct PromptTemplates {
    pub parse_resume: String,
    pub analyze_job: String,
    pub rank_blocks: String,
    pub threshold: String,
    pub critique_layout: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            parse_resume: PARSE_RESUME_TEMPLATE.to_string(),
            analyze_job: ANALYZE_JOB_TEMPLATE.to_string(),
            rank_blocks: RANK_BLOCKS_TEMPLATE.to_string(),
            threshold: THRESHOLD_TEMPLATE.to_string(),
            critique_layout: CRITIQUE_LAYOUT_TEMPLATE.to_string(),
        }
    }
}

impl PromptTemplates {
    pub fn render_parse_resume(&self, resume: &str) -> String {
        self.parse_resume.replace("{resume}", resume)
    }

    pub fn render_analyze_job(&self, job: &str) -> String {
        self.analyze_job.replace("{job}", job)
    }

    pub fn render_rank_blocks(&self, blocks: &[ResumeBlock], requirements: &[JobRequirement]) -> String {
        self.rank_blocks
            .replace("{blocks}", &blocks_json(blocks))
            .replace("{requirements}", &requirements_json(requirements))
    }

    pub fn render_threshold(&self, must_include: &[&ResumeBlock], ranked: &[(usize, &ResumeBlock)]) -> String {
        let must: Vec<_> = must_include
            .iter()
            .map(|b| json!({"block_id": b.id, "type": b.category.label(), "title": b.title}))
            .collect();
        let ranked_json: Vec<_> = ranked
            .iter()
            .map(|(rank, b)| {
                json!({
                    "block_id": b.id,
                    "rank": rank,
                    "type": b.category.label(),
                    "title": b.title,
                    "lines": b.body.lines().count(),
                })
            })
            .collect();

        self.threshold
            .replace("{must_include}", &pretty(&must))
            .replace("{ranked}", &pretty(&ranked_json))
            .replace("{count}", &ranked.len().to_string())
    }

    pub fn render_critique(&self, params: &CritiqueParams) -> String {
        self.critique_layout
            .replace("{page_count}", &params.page_count.to_string())
            .replace("{max_pages}", &params.max_pages.to_string())
            .replace("{font_size}", &format!("{:.1}", params.font_size_pt))
            .replace("{margin}", &format!("{:.2}", params.margin_in))
            .replace("{item_sep}", &format!("{:.1}", params.item_sep_pt))
            .replace("{included}", &format!("{:?}", params.least_important_included))
            .replace("{excluded}", &format!("{:?}", params.most_important_excluded))
    }
}

fn blocks_json(blocks: &[ResumeBlock]) -> String {
    let values: Vec<_> = blocks
        .iter()
        .map(|b| {
            json!({
                "block_id": b.id,
                "block_type": b.category.label(),
                "title": b.title,
                "body": b.body,
            })
        })
        .collect();
    pretty(&values)
}

fn requirements_json(requirements: &[JobRequirement]) -> String {
    let mut grouped = serde_json::Map::new();
    for requirement in requirements {
        let entry = grouped
            .entry(requirement.category.label().to_string())
            .or_insert_with(|| json!([]));
        if let Some(items) = entry.as_array_mut() {
            items.push(json!(requirement.text));
        }
    }
    pretty(&grouped)
}

fn pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

const PARSE_RESUME_TEMPLATE: &str = r#"Extract structured information from this resume.

Split it into sequential blocks where EACH INDIVIDUAL ITEM gets its own block:
- each job/role is a separate block
- each project is a separate block
- each publication is a separate block
- the whole contact information section is a single block
- the whole education section is a single block
- the whole skills section is a single block

Every block has a "block_type", one of:
"contact information", "professional summary", "work experience", "education",
"skills", "project", "publication", or a short custom label for anything else.

Return ONLY JSON with this structure:
{
  "blocks": [
    {"block_type": "work experience", "title": "Job Title, Company, Location, Dates", "body": "- bullet one\n- bullet two"},
    {"block_type": "skills", "title": null, "body": "Languages: Rust, Python"}
  ]
}

Rules:
- Keep the blocks in the order they appear in the resume.
- Copy wording verbatim. Do not add, summarize or rephrase anything.
- Strip markup (LaTeX commands, bold, italics) but keep the words.
- Write each bullet point on its own line starting with "- ".

<RESUME>
{resume}
</RESUME>"#;

const ANALYZE_JOB_TEMPLATE: &str = r#"Analyze this job description and extract ONLY the information that helps tailor a resume.

Use these categories as keys: skills, experience, knowledge, responsibilities, qualifications.
Leave out a category if the description has nothing for it.

IGNORE:
- generic company information
- vague soft-skill statements such as "strong communication skills"
- cultural fit statements that do not name specific skills
- benefits, perks, compensation and application process details

Return ONLY a JSON object whose values are arrays of short strings, e.g.
{
  "skills": ["Python", "SQL", "Docker"],
  "experience": ["3+ years software development"],
  "qualifications": ["Bachelor's in Computer Science or related field"]
}

<JOB POSTING>
{job}
</JOB POSTING>"#;

const RANK_BLOCKS_TEMPLATE: &str = r#"Evaluate these resume blocks against the job requirements and decide:
1. which blocks MUST be included (non-negotiable), and
2. the priority order of the remaining blocks (most important first).

RESUME BLOCKS:
{blocks}

JOB REQUIREMENTS:
{requirements}

RANKING CRITERIA:
- Work experience directly relevant to the requirements ranks highest and usually belongs in must_include.
- For research positions, relevant publications may be must_include.
- Projects generally rank below work experience unless directly relevant.
- Judge relevance only, not length.

Return ONLY JSON in this format:
{
  "must_include": ["block_3"],
  "ranked_list": [
    {"block_id": "block_5", "rank": 1},
    {"block_id": "block_4", "rank": 2}
  ]
}

Use only block ids from the list above. Each block appears at most once."#;

const THRESHOLD_TEMPLATE: &str = r#"Decide which ranked blocks fit on a one-page resume.

MUST INCLUDE BLOCKS (always included):
{must_include}

RANKED BLOCKS (most important first):
{ranked}

GUIDELINES:
- Experience entries take about 6-8 lines, projects 3-4, publications 2-3.
- Contact, education and skills sections also take space.
- Include as many relevant blocks as fit on one page.

Every ranked block with rank less than or equal to your answer is included.
Reply with ONLY a number between 0 and {count}."#;

const CRITIQUE_LAYOUT_TEMPLATE: &str = r#"You are reviewing the attached rendering of a resume that must fit on at most {max_pages} page(s).
It currently has {page_count} page(s).

CURRENT LAYOUT:
- font size: {font_size}pt
- margins: {margin}in
- space between bullet items: {item_sep}pt

CONTEXT:
- least important blocks currently included: {included}
- most important blocks currently excluded: {excluded}

If the resume is too long, prefer dropping the least important included blocks, then tighter spacing,
smaller margins or a slightly smaller font. If it is clearly short of a full page, consider adding the most
important excluded blocks or loosening the layout. Also flag visible formatting problems.

Return ONLY JSON:
{
  "acceptable": true or false,
  "summary": "one or two sentences",
  "font_size_pt": optional number,
  "margin_in": optional number,
  "item_sep_pt": optional number,
  "drop_blocks": optional list of block ids,
  "add_blocks": optional list of block ids
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::document::{BlockCategory, RequirementCategory};

    #[test]
    fn test_parse_prompt_embeds_resume() {
        let templates = PromptTemplates::default();
        let prompt = templates.render_parse_resume("Jane Doe\nRust engineer");
        assert!(prompt.contains("<RESUME>\nJane Doe\nRust engineer\n</RESUME>"));
        assert!(!prompt.contains("{resume}"));
    }

    #[test]
    fn test_rank_prompt_groups_requirements() {
        let templates = PromptTemplates::default();
        let blocks = vec![ResumeBlock::new(
            3,
            BlockCategory::WorkExperience,
            Some("Engineer".to_string()),
            "- Built a compiler".to_string(),
        )];
        let requirements = vec![
            JobRequirement { category: RequirementCategory::Skills, text: "Rust".to_string() },
            JobRequirement { category: RequirementCategory::Skills, text: "Go".to_string() },
        ];
        let prompt = templates.render_rank_blocks(&blocks, &requirements);

        assert!(prompt.contains("\"block_id\": \"block_3\""));
        assert!(prompt.contains("\"skills\": [\n    \"Rust\",\n    \"Go\"\n  ]"));
        assert!(!prompt.contains("{blocks}"));
        assert!(!prompt.contains("{requirements}"));
    }

    #[test]
    fn test_critique_prompt_fills_every_placeholder() {
        let templates = PromptTemplates::default();
        let prompt = templates.render_critique(&CritiqueParams {
            page_count: 2,
            max_pages: 1,
            font_size_pt: 11.0,
            margin_in: 0.6,
            item_sep_pt: 1.0,
            least_important_included: vec!["block_4".to_string()],
            most_important_excluded: vec![],
        });

        assert!(prompt.contains("It currently has 2 page(s)."));
        assert!(prompt.contains("[\"block_4\"]"));
        assert!(prompt.contains("margins: 0.60in"));
        for placeholder in ["{page_count}", "{max_pages}", "{font_size}", "{included}", "{excluded}"] {
            assert!(!prompt.contains(placeholder), "unfilled {}", placeholder);
        }
    }
}

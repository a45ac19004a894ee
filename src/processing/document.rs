//! Resume and job description structures shared by every pipeline stage

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Category tag of a resume block
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockCategory {
    ContactInformation,
    ProfessionalSummary,
    WorkExperience,
    Education,
    Skills,
    Project,
    Publication,
    Other(String),
}

impl BlockCategory {
    /// Parse a category label as the LLM or a template writes it.
    ///
    /// Matching is case-insensitive and treats `_` and `-` as spaces, so
    /// `work_experience`, `Work Experience` and `work-experience` agree.
    pub fn parse(label: &str) -> Self {
        let normalized = normalize_label(label);
        match normalized.as_str() {
            "contact information" | "contact" | "contact info" => BlockCategory::ContactInformation,
            "professional summary" | "summary" | "profile" | "objective" => {
                BlockCategory::ProfessionalSummary
            }
            "work experience" | "experience" | "employment" => BlockCategory::WorkExperience,
            "education" => BlockCategory::Education,
            "skills" | "skill" | "technical skills" => BlockCategory::Skills,
            "project" | "projects" => BlockCategory::Project,
            "publication" | "publications" => BlockCategory::Publication,
            _ => BlockCategory::Other(normalized),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            BlockCategory::ContactInformation => "contact information",
            BlockCategory::ProfessionalSummary => "professional summary",
            BlockCategory::WorkExperience => "work experience",
            BlockCategory::Education => "education",
            BlockCategory::Skills => "skills",
            BlockCategory::Project => "project",
            BlockCategory::Publication => "publication",
            BlockCategory::Other(label) => label,
        }
    }

    /// Key used by template slot markers, e.g. `work_experience`.
    pub fn slot_key(&self) -> String {
        self.label().replace(' ', "_")
    }
}

impl From<String> for BlockCategory {
    fn from(value: String) -> Self {
        BlockCategory::parse(&value)
    }
}

impl From<BlockCategory> for String {
    fn from(value: BlockCategory) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for BlockCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .replace(['_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// A labeled unit of resume content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeBlock {
    pub id: String,
    pub category: BlockCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
}

impl ResumeBlock {
    pub fn new(index: usize, category: BlockCategory, title: Option<String>, body: String) -> Self {
        Self {
            id: format!("block_{}", index),
            category,
            title,
            body,
        }
    }

    /// Characters counted against the page budget.
    pub fn text_len(&self) -> usize {
        self.title.as_deref().map_or(0, |t| t.chars().count()) + self.body.chars().count()
    }

    /// Title and body joined, for matching and grounding checks.
    pub fn full_text(&self) -> String {
        match &self.title {
            Some(title) => format!("{}\n{}", title, self.body),
            None => self.body.clone(),
        }
    }

    /// Short human label used in prompts and reports.
    pub fn describe(&self) -> String {
        match &self.title {
            Some(title) => format!("{} ({}): {}", self.id, self.category, title),
            None => format!("{} ({})", self.id, self.category),
        }
    }
}

/// Category of an extracted job requirement
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequirementCategory {
    Skills,
    Experience,
    Knowledge,
    Responsibilities,
    Qualifications,
    Other(String),
}

impl RequirementCategory {
    pub fn parse(label: &str) -> Self {
        let normalized = normalize_label(label);
        match normalized.as_str() {
            "skills" | "skill" => RequirementCategory::Skills,
            "experience" => RequirementCategory::Experience,
            "knowledge" => RequirementCategory::Knowledge,
            "responsibilities" | "responsibility" => RequirementCategory::Responsibilities,
            "qualifications" | "qualification" => RequirementCategory::Qualifications,
            _ => RequirementCategory::Other(normalized),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            RequirementCategory::Skills => "skills",
            RequirementCategory::Experience => "experience",
            RequirementCategory::Knowledge => "knowledge",
            RequirementCategory::Responsibilities => "responsibilities",
            RequirementCategory::Qualifications => "qualifications",
            RequirementCategory::Other(label) => label,
        }
    }
}

impl From<String> for RequirementCategory {
    fn from(value: String) -> Self {
        RequirementCategory::parse(&value)
    }
}

impl From<RequirementCategory> for String {
    fn from(value: RequirementCategory) -> Self {
        value.label().to_string()
    }
}

impl fmt::Display for RequirementCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A labeled requirement or keyword extracted from a job description
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobRequirement {
    pub category: RequirementCategory,
    pub text: String,
}

/// Length limit for a one-page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PageBudget {
    pub max_blocks: Option<usize>,
    pub max_chars: Option<usize>,
}

impl PageBudget {
    pub fn admits(&self, block_count: usize, char_count: usize) -> bool {
        self.max_blocks.map_or(true, |max| block_count <= max)
            && self.max_chars.map_or(true, |max| char_count <= max)
    }
}

/// Ordered, duplicate-free blocks chosen for the tailored resume.
///
/// Pinned blocks come first and are never dropped by layout feedback.
/// `excluded` keeps ranked-but-cut blocks in rank order so feedback can add
/// them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedSelection {
    blocks: Vec<ResumeBlock>,
    pinned: Vec<String>,
    excluded: Vec<ResumeBlock>,
    budget: PageBudget,
}

impl RankedSelection {
    /// Assemble a selection from pinned blocks and rank-ordered candidates.
    ///
    /// Duplicated ids keep their first occurrence. Blocks are taken in order
    /// until the next one would exceed the budget; everything after that
    /// point goes to `excluded`.
    pub fn assemble(pinned: Vec<ResumeBlock>, ranked: Vec<ResumeBlock>, budget: PageBudget) -> Self {
        let mut seen = HashSet::new();
        let mut selection = Self {
            blocks: Vec::new(),
            pinned: Vec::new(),
            excluded: Vec::new(),
            budget,
        };
        let mut full = false;

        let candidates = pinned
            .into_iter()
            .map(|b| (b, true))
            .chain(ranked.into_iter().map(|b| (b, false)));

        for (block, is_pinned) in candidates {
            if !seen.insert(block.id.clone()) {
                continue;
            }
            if !full && selection.fits(&block) {
                if is_pinned {
                    selection.pinned.push(block.id.clone());
                }
                selection.blocks.push(block);
            } else {
                full = true;
                if !is_pinned {
                    selection.excluded.push(block);
                }
            }
        }

        selection
    }

    fn fits(&self, block: &ResumeBlock) -> bool {
        self.budget
            .admits(self.blocks.len() + 1, self.char_count() + block.text_len())
    }

    pub fn blocks(&self) -> &[ResumeBlock] {
        &self.blocks
    }

    pub fn excluded(&self) -> &[ResumeBlock] {
        &self.excluded
    }

    pub fn budget(&self) -> PageBudget {
        self.budget
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.blocks.iter().map(ResumeBlock::text_len).sum()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.blocks.iter().any(|b| b.id == id)
    }

    pub fn is_pinned(&self, id: &str) -> bool {
        self.pinned.iter().any(|p| p == id)
    }

    /// Ranked blocks currently selected, least important last.
    pub fn droppable(&self) -> impl Iterator<Item = &ResumeBlock> {
        self.blocks.iter().filter(|b| !self.is_pinned(&b.id))
    }

    /// Remove a non-pinned block; it becomes the first excluded block.
    pub fn drop_block(&mut self, id: &str) -> bool {
        if self.is_pinned(id) {
            return false;
        }
        match self.blocks.iter().position(|b| b.id == id) {
            Some(index) => {
                let block = self.blocks.remove(index);
                self.excluded.insert(0, block);
                true
            }
            None => false,
        }
    }

    /// Move an excluded block back into the selection if the budget allows.
    pub fn add_block(&mut self, id: &str) -> bool {
        let Some(index) = self.excluded.iter().position(|b| b.id == id) else {
            return false;
        };
        if !self.fits(&self.excluded[index]) {
            return false;
        }
        let block = self.excluded.remove(index);
        self.blocks.push(block);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(index: usize, category: BlockCategory, body: &str) -> ResumeBlock {
        ResumeBlock::new(index, category, Some(format!("Title {}", index)), body.to_string())
    }

    #[test]
    fn test_category_parsing_is_lenient() {
        assert_eq!(BlockCategory::parse("Work Experience"), BlockCategory::WorkExperience);
        assert_eq!(BlockCategory::parse("work_experience"), BlockCategory::WorkExperience);
        assert_eq!(BlockCategory::parse("  PROJECTS "), BlockCategory::Project);
        assert_eq!(
            BlockCategory::parse("Volunteer_Work"),
            BlockCategory::Other("volunteer work".to_string())
        );
        assert_eq!(BlockCategory::WorkExperience.slot_key(), "work_experience");
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&BlockCategory::ContactInformation).unwrap();
        assert_eq!(json, "\"contact information\"");
        let parsed: BlockCategory = serde_json::from_str("\"Publications\"").unwrap();
        assert_eq!(parsed, BlockCategory::Publication);
    }

    #[test]
    fn test_assemble_removes_duplicates() {
        let a = block(1, BlockCategory::WorkExperience, "- Built things");
        let b = block(2, BlockCategory::Project, "- Side project");
        let selection = RankedSelection::assemble(
            vec![],
            vec![a.clone(), b.clone(), a.clone()],
            PageBudget::default(),
        );
        let ids: Vec<_> = selection.blocks().iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["block_1", "block_2"]);
    }

    #[test]
    fn test_assemble_respects_block_budget() {
        let blocks: Vec<_> = (1..=5)
            .map(|i| block(i, BlockCategory::Project, "- Work"))
            .collect();
        let budget = PageBudget { max_blocks: Some(3), max_chars: None };
        let selection = RankedSelection::assemble(vec![], blocks, budget);

        assert_eq!(selection.len(), 3);
        assert_eq!(selection.excluded().len(), 2);
        assert_eq!(selection.excluded()[0].id, "block_4");
    }

    #[test]
    fn test_assemble_respects_char_budget() {
        let long = block(1, BlockCategory::WorkExperience, &"x".repeat(100));
        let short = block(2, BlockCategory::Project, "short");
        let budget = PageBudget { max_blocks: None, max_chars: Some(50) };
        let selection = RankedSelection::assemble(vec![], vec![long, short], budget);

        // Cut happens at the first block that does not fit; later blocks are not backfilled.
        assert!(selection.is_empty());
        assert_eq!(selection.excluded().len(), 2);
    }

    #[test]
    fn test_pinned_blocks_cannot_be_dropped() {
        let contact = block(1, BlockCategory::ContactInformation, "Jane Doe");
        let job = block(2, BlockCategory::WorkExperience, "- Shipped");
        let mut selection =
            RankedSelection::assemble(vec![contact], vec![job], PageBudget::default());

        assert!(!selection.drop_block("block_1"));
        assert!(selection.drop_block("block_2"));
        assert_eq!(selection.len(), 1);
        assert_eq!(selection.excluded()[0].id, "block_2");
        assert!(selection.add_block("block_2"));
        assert!(selection.contains("block_2"));
    }

    #[test]
    fn test_add_block_respects_budget() {
        let blocks: Vec<_> = (1..=3)
            .map(|i| block(i, BlockCategory::Project, "- Work"))
            .collect();
        let budget = PageBudget { max_blocks: Some(2), max_chars: None };
        let mut selection = RankedSelection::assemble(vec![], blocks, budget);

        assert!(!selection.add_block("block_3"));
        assert!(selection.drop_block("block_2"));
        assert!(selection.add_block("block_3"));
        assert_eq!(selection.len(), 2);
    }
}

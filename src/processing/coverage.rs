//! Which skill requirements the selected content mentions

use crate::error::{Result, ResumeTailorError};
use crate::processing::document::{JobRequirement, RequirementCategory, ResumeBlock};
use aho_corasick::AhoCorasick;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub matched: Vec<String>,
    pub missing: Vec<String>,
}

impl CoverageReport {
    /// Share of skill requirements found, 0.0 to 1.0.
    pub fn ratio(&self) -> f64 {
        let total = self.matched.len() + self.missing.len();
        if total == 0 {
            return 0.0;
        }
        self.matched.len() as f64 / total as f64
    }
}

pub fn skill_coverage(requirements: &[JobRequirement], blocks: &[ResumeBlock]) -> Result<CoverageReport> {
    let skills: Vec<&str> = requirements
        .iter()
        .filter(|r| r.category == RequirementCategory::Skills)
        .map(|r| r.text.as_str())
        .collect();
    if skills.is_empty() {
        return Ok(CoverageReport::default());
    }

    let matcher = AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(&skills)
        .map_err(|e| ResumeTailorError::InvalidInput(format!("Cannot match requirements: {}", e)))?;

    let mut found = HashSet::new();
    for block in blocks {
        let text = block.full_text();
        for m in matcher.find_overlapping_iter(&text) {
            found.insert(m.pattern().as_usize());
        }
    }

    let mut report = CoverageReport::default();
    for (i, skill) in skills.iter().enumerate() {
        if found.contains(&i) {
            report.matched.push(skill.to_string());
        } else {
            report.missing.push(skill.to_string());
        }
    }
    Ok(report)
}

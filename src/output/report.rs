//! Run summary report for a tailoring run

use crate::pipeline::TailorRun;
use crate::processing::coverage::CoverageReport;
use crate::processing::feedback::FeedbackOutcome;
use crate::typeset::LayoutSettings;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Summary of one tailoring run, shared by every output format
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// When the run started, local time
    pub generated_at: String,

    /// Wall-clock duration of the run
    pub elapsed_ms: u64,

    pub resume_file: String,
    pub job_file: String,
    pub template: String,

    /// Blocks the parser found in the master resume
    pub total_blocks: usize,

    /// Blocks placed in the final document, in document order
    pub selected: Vec<BlockSummary>,

    /// Ranked blocks that did not make the page
    pub excluded: Vec<BlockSummary>,

    /// Requirement counts per category, in first-seen order
    pub requirements: Vec<RequirementCount>,

    pub coverage: CoverageReport,

    pub page_count: usize,
    pub layout: LayoutSettings,

    pub feedback_outcome: FeedbackOutcome,
    pub feedback: Vec<PassSummary>,

    pub tex_path: String,
    pub pdf_path: String,
    pub artifacts: Vec<String>,

    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockSummary {
    pub id: String,
    pub category: String,
    pub title: String,
    pub pinned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementCount {
    pub category: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassSummary {
    pub iteration: u32,
    pub page_count: usize,
    pub acceptable: bool,
    pub summary: String,
    /// Human-readable list of what the pass changed
    pub changes: Vec<String>,
}

impl RunReport {
    pub fn from_run(run: &TailorRun, resume_file: &Path, job_file: &Path) -> Self {
        let summarize = |block: &crate::processing::document::ResumeBlock| BlockSummary {
            id: block.id.clone(),
            category: block.category.label().to_string(),
            title: block
                .title
                .clone()
                .unwrap_or_else(|| first_line(&block.body)),
            pinned: run.selection.is_pinned(&block.id),
        };

        let mut requirements: Vec<RequirementCount> = Vec::new();
        for requirement in &run.requirements {
            let label = requirement.category.label();
            match requirements.iter_mut().find(|r| r.category == label) {
                Some(entry) => entry.count += 1,
                None => requirements.push(RequirementCount {
                    category: label.to_string(),
                    count: 1,
                }),
            }
        }

        let feedback = run
            .feedback_passes
            .iter()
            .map(|pass| {
                let mut changes = Vec::new();
                if let Some(applied) = &pass.changes {
                    if applied.layout != run_layout_before(pass, run) {
                        changes.push(format!(
                            "layout {:.1}pt / {:.2}in / {:.1}pt",
                            applied.layout.font_size_pt, applied.layout.margin_in, applied.layout.item_sep_pt
                        ));
                    }
                    changes.extend(applied.dropped.iter().map(|id| format!("dropped {}", id)));
                    changes.extend(applied.added.iter().map(|id| format!("added {}", id)));
                    if let Some(id) = &applied.forced_drop {
                        changes.push(format!("dropped {} to fit the page", id));
                    }
                }
                PassSummary {
                    iteration: pass.iteration,
                    page_count: pass.page_count,
                    acceptable: pass.critique.acceptable,
                    summary: pass.critique.summary.clone(),
                    changes,
                }
            })
            .collect();

        Self {
            generated_at: run.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            elapsed_ms: run.elapsed.as_millis() as u64,
            resume_file: display_name(resume_file),
            job_file: display_name(job_file),
            template: run.template.clone(),
            total_blocks: run.blocks.len(),
            selected: run.selection.blocks().iter().map(summarize).collect(),
            excluded: run.selection.excluded().iter().map(summarize).collect(),
            requirements,
            coverage: run.coverage.clone(),
            page_count: run.document.page_count,
            layout: run.layout,
            feedback_outcome: run.feedback_outcome,
            feedback,
            tex_path: run.tex_path.display().to_string(),
            pdf_path: run.pdf_path.display().to_string(),
            artifacts: run.artifacts.iter().map(|p| p.display().to_string()).collect(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Layout in effect when `pass` was critiqued.
fn run_layout_before(pass: &crate::processing::feedback::FeedbackPass, run: &TailorRun) -> LayoutSettings {
    run.feedback_passes
        .iter()
        .take_while(|p| p.iteration < pass.iteration)
        .filter_map(|p| p.changes.as_ref().map(|c| c.layout))
        .last()
        .unwrap_or(run.initial_layout)
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().trim().to_string()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

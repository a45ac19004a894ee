//! Assemble a LaTeX document from a template and selected blocks

use crate::config::{FeedbackConfig, TemplateConfig};
use crate::error::{Result, ResumeTailorError};
use crate::processing::document::{BlockCategory, RankedSelection, ResumeBlock};
use crate::typeset::template::{Template, TemplateLine};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Values substituted into a template's layout placeholders
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSettings {
    pub font_size_pt: f64,
    pub margin_in: f64,
    pub item_sep_pt: f64,
}

impl LayoutSettings {
    pub fn from_config(config: &TemplateConfig) -> Self {
        Self {
            font_size_pt: config.font_size_pt,
            margin_in: config.margin_in,
            item_sep_pt: config.item_sep_pt,
        }
    }

    /// Clamp every value into the configured feedback bounds.
    pub fn clamped(self, bounds: &FeedbackConfig) -> Self {
        Self {
            font_size_pt: self.font_size_pt.clamp(bounds.min_font_size_pt, bounds.max_font_size_pt),
            margin_in: self.margin_in.clamp(bounds.min_margin_in, bounds.max_margin_in),
            item_sep_pt: self.item_sep_pt.clamp(bounds.min_item_sep_pt, bounds.max_item_sep_pt),
        }
    }

    fn placeholders(&self) -> [(&'static str, String); 4] {
        [
            ("<<font_size>>", format!("{}pt", trim_number(self.font_size_pt))),
            ("<<line_height>>", format!("{}pt", trim_number(self.font_size_pt * 1.2))),
            ("<<margin>>", trim_number(self.margin_in)),
            ("<<item_sep>>", trim_number(self.item_sep_pt)),
        ]
    }
}

fn trim_number(value: f64) -> String {
    let text = format!("{:.2}", value);
    match text.trim_end_matches('0').trim_end_matches('.') {
        "" | "-" => "0".to_string(),
        trimmed => trimmed.to_string(),
    }
}

pub struct ResumeBuilder {
    template: Template,
}

impl ResumeBuilder {
    pub fn new(template: Template) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    /// Produce the full LaTeX source for `selection`.
    ///
    /// Fails with `TemplateMismatch` when a selected block's category has no
    /// slot in the template.
    pub fn build(&self, selection: &RankedSelection, layout: &LayoutSettings) -> Result<String> {
        self.build_blocks(selection.blocks(), layout)
    }

    pub fn build_blocks(&self, blocks: &[ResumeBlock], layout: &LayoutSettings) -> Result<String> {
        if let Some(block) = blocks.iter().find(|b| !self.template.has_slot(&b.category)) {
            return Err(ResumeTailorError::TemplateMismatch {
                template: self.template.id.clone(),
                category: block.category.label().to_string(),
            });
        }

        let present: HashSet<&BlockCategory> = blocks.iter().map(|b| &b.category).collect();
        let mut filled = HashSet::new();
        let mut guards: Vec<bool> = Vec::new();
        let mut output = String::new();

        for line in self.template.lines() {
            let visible = guards.iter().all(|open| *open);
            match line {
                TemplateLine::If(category) => guards.push(present.contains(category)),
                TemplateLine::EndIf => {
                    guards.pop();
                }
                TemplateLine::Text(text) if visible => {
                    output.push_str(text);
                    output.push('\n');
                }
                TemplateLine::Slot(category) if visible && filled.insert(category.clone()) => {
                    for block in blocks.iter().filter(|b| &b.category == category) {
                        output.push_str(&render_block(block));
                    }
                }
                _ => {}
            }
        }

        for (placeholder, value) in layout.placeholders() {
            output = output.replace(placeholder, &value);
        }

        debug!(
            "Built {} chars of LaTeX from {} blocks with template {}",
            output.len(),
            blocks.len(),
            self.template.id
        );
        Ok(output)
    }
}

/// Render one block: optional heading, then paragraphs and bullet lists.
pub fn render_block(block: &ResumeBlock) -> String {
    let mut out = String::new();
    if block.category == BlockCategory::ContactInformation {
        let lines: Vec<String> = block
            .full_text()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(escape_latex)
            .collect();
        out.push_str(&lines.join(" \\\\\n"));
        out.push('\n');
        return out;
    }

    if let Some(title) = &block.title {
        out.push_str(&format!("\\blockheading{{{}}}\n", escape_latex(title)));
    }

    let mut in_list = false;
    for line in block.body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match bullet_text(line) {
            Some(item) => {
                if !in_list {
                    out.push_str("\\begin{itemize}\n");
                    in_list = true;
                }
                out.push_str(&format!("  \\item {}\n", escape_latex(item)));
            }
            None => {
                if in_list {
                    out.push_str("\\end{itemize}\n");
                    in_list = false;
                }
                out.push_str(&escape_latex(line));
                out.push_str("\\par\n");
            }
        }
    }
    if in_list {
        out.push_str("\\end{itemize}\n");
    }
    out
}

fn bullet_text(line: &str) -> Option<&str> {
    ["- ", "* ", "\u{2022} "]
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
        .map(str::trim)
}

/// Escape LaTeX special characters in plain text.
pub fn escape_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            _ => out.push(c),
        }
    }
    out
}

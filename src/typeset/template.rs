//! LaTeX resume templates with category slots

use crate::error::{Result, ResumeTailorError};
use crate::processing::document::BlockCategory;
use log::debug;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("classic", include_str!("../../templates/classic.tex")),
    ("compact", include_str!("../../templates/compact.tex")),
];

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| {
        Regex::new(r"^\s*%%%\s*(SLOT|IF|ENDIF)\b\s*(.*?)\s*%%%\s*$").expect("valid marker regex")
    })
}

/// One line of a parsed template
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateLine {
    Text(String),
    Slot(BlockCategory),
    If(BlockCategory),
    EndIf,
}

#[derive(Debug, Clone)]
pub struct Template {
    pub id: String,
    lines: Vec<TemplateLine>,
    slots: BTreeSet<BlockCategory>,
}

impl Template {
    /// Parse template source, checking that every guard is closed.
    ///
    /// A slot may only sit inside guards for its own category, so a slot is
    /// emitted whenever its category is selected.
    pub fn parse(id: &str, source: &str) -> Result<Self> {
        let mut lines = Vec::new();
        let mut slots = BTreeSet::new();
        let mut guards: Vec<BlockCategory> = Vec::new();

        for (number, line) in source.lines().enumerate() {
            let Some(caps) = marker_regex().captures(line) else {
                lines.push(TemplateLine::Text(line.to_string()));
                continue;
            };
            let argument = caps.get(2).map_or("", |m| m.as_str());
            match &caps[1] {
                "SLOT" => {
                    let category = marker_category(id, number, argument)?;
                    if let Some(guard) = guards.iter().find(|g| **g != category) {
                        return Err(ResumeTailorError::Configuration(format!(
                            "Template '{}' line {}: slot '{}' is inside the guard for '{}'",
                            id,
                            number + 1,
                            category,
                            guard
                        )));
                    }
                    slots.insert(category.clone());
                    lines.push(TemplateLine::Slot(category));
                }
                "IF" => {
                    let category = marker_category(id, number, argument)?;
                    guards.push(category.clone());
                    lines.push(TemplateLine::If(category));
                }
                _ => {
                    guards.pop().ok_or_else(|| {
                        ResumeTailorError::Configuration(format!(
                            "Template '{}' line {}: ENDIF without IF",
                            id,
                            number + 1
                        ))
                    })?;
                    lines.push(TemplateLine::EndIf);
                }
            }
        }

        if !guards.is_empty() {
            return Err(ResumeTailorError::Configuration(format!(
                "Template '{}' has {} unclosed IF guard(s)",
                id,
                guards.len()
            )));
        }
        if slots.is_empty() {
            return Err(ResumeTailorError::Configuration(format!(
                "Template '{}' defines no slots",
                id
            )));
        }

        Ok(Self {
            id: id.to_string(),
            lines,
            slots,
        })
    }

    pub fn lines(&self) -> &[TemplateLine] {
        &self.lines
    }

    pub fn slots(&self) -> &BTreeSet<BlockCategory> {
        &self.slots
    }

    pub fn has_slot(&self, category: &BlockCategory) -> bool {
        self.slots.contains(category)
    }
}

fn marker_category(id: &str, number: usize, argument: &str) -> Result<BlockCategory> {
    if argument.is_empty() {
        return Err(ResumeTailorError::Configuration(format!(
            "Template '{}' line {}: marker is missing a category",
            id,
            number + 1
        )));
    }
    Ok(BlockCategory::parse(argument))
}

/// Where a template comes from
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateOrigin {
    BuiltIn,
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct TemplateInfo {
    pub id: String,
    pub origin: TemplateOrigin,
}

/// Looks templates up by id: built-ins first, then `<dir>/<id>.tex`.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    dir: Option<PathBuf>,
}

impl TemplateStore {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    pub fn source(&self, id: &str) -> Result<String> {
        if let Some((_, source)) = BUILTIN_TEMPLATES.iter().find(|(name, _)| *name == id) {
            return Ok(source.to_string());
        }

        if let Some(dir) = &self.dir {
            let path = dir.join(format!("{}.tex", id));
            if path.is_file() {
                debug!("Loading template {} from {}", id, path.display());
                return Ok(std::fs::read_to_string(&path)?);
            }
        }

        Err(ResumeTailorError::Configuration(format!(
            "Unknown template '{}' (available: {})",
            id,
            self.list()
                .map(|infos| infos.into_iter().map(|i| i.id).collect::<Vec<_>>().join(", "))
                .unwrap_or_default()
        )))
    }

    pub fn load(&self, id: &str) -> Result<Template> {
        Template::parse(id, &self.source(id)?)
    }

    pub fn list(&self) -> Result<Vec<TemplateInfo>> {
        let mut infos: Vec<TemplateInfo> = BUILTIN_TEMPLATES
            .iter()
            .map(|(id, _)| TemplateInfo {
                id: id.to_string(),
                origin: TemplateOrigin::BuiltIn,
            })
            .collect();

        if let Some(dir) = self.dir.as_deref().filter(|d| d.is_dir()) {
            let mut custom = custom_templates(dir)?;
            custom.retain(|info| !infos.iter().any(|b| b.id == info.id));
            infos.extend(custom);
        }

        Ok(infos)
    }
}

fn custom_templates(dir: &Path) -> Result<Vec<TemplateInfo>> {
    let mut infos = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("tex") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            infos.push(TemplateInfo {
                id: stem.to_string(),
                origin: TemplateOrigin::File(path.clone()),
            });
        }
    }
    infos.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(infos)
}

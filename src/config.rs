//! Configuration management for the resume tailor

use crate::error::{Result, ResumeTailorError};
use crate::processing::document::{BlockCategory, PageBudget};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable consulted when `llm.api_key_env` is unset.
pub const FALLBACK_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub selection: SelectionConfig,
    pub render: RenderConfig,
    pub feedback: FeedbackConfig,
    pub template: TemplateConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Model used for page-image critique; falls back to `model`.
    pub vision_model: Option<String>,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    pub max_blocks: Option<usize>,
    pub max_chars: Option<usize>,
    pub pinned_categories: Vec<BlockCategory>,
    /// Ask the LLM for a one-page rank cutoff after ranking.
    pub llm_threshold: bool,
    pub default_threshold: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub engine: String,
    pub engine_args: Vec<String>,
    pub passes: u32,
    pub rasterizer: String,
    pub dpi: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackConfig {
    pub enabled: bool,
    pub max_iterations: u32,
    pub max_pages: usize,
    pub min_font_size_pt: f64,
    pub max_font_size_pt: f64,
    pub min_margin_in: f64,
    pub max_margin_in: f64,
    pub min_item_sep_pt: f64,
    pub max_item_sep_pt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub default_template: String,
    pub templates_dir: Option<PathBuf>,
    pub font_size_pt: f64,
    pub margin_in: f64,
    pub item_sep_pt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    pub color_output: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Console,
    Json,
    Markdown,
    Html,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                vision_model: None,
                api_key_env: "RESUME_TAILOR_API_KEY".to_string(),
                timeout_secs: 120,
                temperature: 0.2,
                max_tokens: None,
            },
            selection: SelectionConfig {
                max_blocks: Some(10),
                max_chars: Some(4500),
                pinned_categories: vec![
                    BlockCategory::ContactInformation,
                    BlockCategory::ProfessionalSummary,
                    BlockCategory::Education,
                    BlockCategory::Skills,
                ],
                llm_threshold: true,
                default_threshold: 2,
            },
            render: RenderConfig {
                engine: "pdflatex".to_string(),
                engine_args: vec![
                    "-interaction=nonstopmode".to_string(),
                    "-halt-on-error".to_string(),
                ],
                passes: 2,
                rasterizer: "pdftoppm".to_string(),
                dpi: 150,
            },
            feedback: FeedbackConfig {
                enabled: true,
                max_iterations: 3,
                max_pages: 1,
                min_font_size_pt: 9.0,
                max_font_size_pt: 12.0,
                min_margin_in: 0.4,
                max_margin_in: 1.0,
                min_item_sep_pt: 0.0,
                max_item_sep_pt: 4.0,
            },
            template: TemplateConfig {
                default_template: "classic".to_string(),
                templates_dir: None,
                font_size_pt: 11.0,
                margin_in: 0.6,
                item_sep_pt: 1.0,
            },
            output: OutputConfig {
                output_dir: PathBuf::from("tailored"),
                format: OutputFormat::Console,
                color_output: true,
            },
        }
    }
}

impl Config {
    /// Load the user config, writing defaults on first use.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| ResumeTailorError::Configuration(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ResumeTailorError::Configuration(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
            .join("resume-tailor")
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.render.passes == 0 {
            return Err(ResumeTailorError::Configuration(
                "render.passes must be at least 1".to_string(),
            ));
        }
        if self.feedback.max_pages == 0 {
            return Err(ResumeTailorError::Configuration(
                "feedback.max_pages must be at least 1".to_string(),
            ));
        }
        let fb = &self.feedback;
        let bounds = [
            fb.min_font_size_pt,
            fb.max_font_size_pt,
            fb.min_margin_in,
            fb.max_margin_in,
            fb.min_item_sep_pt,
            fb.max_item_sep_pt,
        ];
        let layout = [
            self.template.font_size_pt,
            self.template.margin_in,
            self.template.item_sep_pt,
        ];
        if bounds.iter().chain(layout.iter()).any(|v| !v.is_finite()) {
            return Err(ResumeTailorError::Configuration(
                "layout sizes and feedback bounds must be finite numbers".to_string(),
            ));
        }
        if fb.min_font_size_pt > fb.max_font_size_pt
            || fb.min_margin_in > fb.max_margin_in
            || fb.min_item_sep_pt > fb.max_item_sep_pt
        {
            return Err(ResumeTailorError::Configuration(
                "feedback layout bounds have min greater than max".to_string(),
            ));
        }
        Ok(())
    }

    /// Read the LLM credential from the environment.
    pub fn api_key(&self) -> Result<String> {
        [self.llm.api_key_env.as_str(), FALLBACK_API_KEY_ENV]
            .iter()
            .find_map(|name| std::env::var(name).ok().filter(|v| !v.trim().is_empty()))
            .ok_or_else(|| {
                ResumeTailorError::Configuration(format!(
                    "No LLM API key found; set {} (or {})",
                    self.llm.api_key_env, FALLBACK_API_KEY_ENV
                ))
            })
    }

    pub fn page_budget(&self) -> PageBudget {
        PageBudget {
            max_blocks: self.selection.max_blocks,
            max_chars: self.selection.max_chars,
        }
    }

    pub fn vision_model(&self) -> &str {
        self.llm.vision_model.as_deref().unwrap_or(&self.llm.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::default();
        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();

        assert_eq!(loaded.llm.model, config.llm.model);
        assert_eq!(loaded.selection.pinned_categories, config.selection.pinned_categories);
        assert_eq!(loaded.output.format, OutputFormat::Console);
    }

    #[test]
    fn test_invalid_bounds_are_rejected() {
        let mut config = Config::default();
        config.feedback.min_margin_in = 2.0;
        assert!(matches!(config.validate(), Err(ResumeTailorError::Configuration(_))));
    }

    #[test]
    fn test_nan_bounds_are_rejected() {
        let mut config = Config::default();
        config.feedback.max_font_size_pt = f64::NAN;
        assert!(matches!(config.validate(), Err(ResumeTailorError::Configuration(_))));

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let content = toml::to_string_pretty(&Config::default())
            .unwrap()
            .replace("min_margin_in = 0.4", "min_margin_in = nan");
        std::fs::write(&path, content).unwrap();
        assert!(matches!(Config::load_from(&path), Err(ResumeTailorError::Configuration(_))));
    }

    #[test]
    fn test_malformed_file_is_configuration_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "llm = 3").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ResumeTailorError::Configuration(_))));
    }

    #[test]
    fn test_vision_model_falls_back_to_model() {
        let mut config = Config::default();
        assert_eq!(config.vision_model(), config.llm.model);
        config.llm.vision_model = Some("vision-large".to_string());
        assert_eq!(config.vision_model(), "vision-large");
    }
}

//! End-to-end tailoring run: parse, analyze, rank, build, render, refine

use crate::config::Config;
use crate::error::Result;
use crate::llm::LlmClient;
use crate::processing::coverage::{skill_coverage, CoverageReport};
use crate::processing::document::{JobRequirement, PageBudget, RankedSelection, ResumeBlock};
use crate::processing::feedback::{FeedbackOutcome, FeedbackPass, VisualFeedbackLoop};
use crate::processing::{ContentRanker, JobAnalyzer, RankerSettings, ResumeParser};
use crate::typeset::{LayoutSettings, RenderedDocument, ResumeBuilder, TemplateStore, Typesetter};
use chrono::{DateTime, Local};
use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Pipeline step, reported to the caller as each one starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Parse,
    Analyze,
    Rank,
    Build,
    Render,
    Feedback,
    Write,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Stage::Parse => "Parsing resume into blocks",
            Stage::Analyze => "Analyzing job description",
            Stage::Rank => "Ranking blocks against requirements",
            Stage::Build => "Assembling LaTeX document",
            Stage::Render => "Typesetting",
            Stage::Feedback => "Reviewing layout",
            Stage::Write => "Writing results",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone)]
pub struct TailorOptions {
    pub template: String,
    pub output_dir: PathBuf,
    pub feedback: bool,
    pub max_iterations: u32,
    pub budget: PageBudget,
}

impl TailorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            template: config.template.default_template.clone(),
            output_dir: config.output.output_dir.clone(),
            feedback: config.feedback.enabled,
            max_iterations: config.feedback.max_iterations,
            budget: config.page_budget(),
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct TailorRun {
    pub template: String,
    pub blocks: Vec<ResumeBlock>,
    pub requirements: Vec<JobRequirement>,
    pub selection: RankedSelection,
    pub coverage: CoverageReport,
    /// Layout before any feedback adjustments
    pub initial_layout: LayoutSettings,
    pub layout: LayoutSettings,
    pub document: RenderedDocument,
    pub feedback_outcome: FeedbackOutcome,
    pub feedback_passes: Vec<FeedbackPass>,
    pub tex_path: PathBuf,
    pub pdf_path: PathBuf,
    pub artifacts: Vec<PathBuf>,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}

pub struct Pipeline<'a, L: LlmClient, T: Typesetter> {
    llm: &'a L,
    typesetter: &'a T,
    config: &'a Config,
    templates: TemplateStore,
}

impl<'a, L: LlmClient, T: Typesetter> Pipeline<'a, L, T> {
    pub fn new(llm: &'a L, typesetter: &'a T, config: &'a Config) -> Self {
        Self {
            llm,
            typesetter,
            config,
            templates: TemplateStore::new(config.template.templates_dir.clone()),
        }
    }

    pub async fn run<F>(
        &self,
        resume_text: &str,
        job_text: &str,
        options: &TailorOptions,
        mut on_stage: F,
    ) -> Result<TailorRun>
    where
        F: FnMut(Stage),
    {
        let started_at = Local::now();
        let timer = Instant::now();
        let builder = ResumeBuilder::new(self.templates.load(&options.template)?);
        let mut artifacts = ArtifactWriter::create(&options.output_dir)?;

        on_stage(Stage::Parse);
        let blocks = ResumeParser::new(self.llm).parse(resume_text).await?;
        artifacts.json("1_parsed_resume.json", &blocks)?;

        on_stage(Stage::Analyze);
        let requirements = JobAnalyzer::new(self.llm).analyze(job_text).await?;
        artifacts.json("2_job_requirements.json", &requirements)?;

        on_stage(Stage::Rank);
        let mut settings = RankerSettings::from_config(&self.config.selection);
        settings.budget = options.budget;
        let selection = ContentRanker::new(self.llm, settings)
            .rank(&blocks, &requirements)
            .await?;
        artifacts.json("3_selection.json", &selection)?;

        on_stage(Stage::Build);
        let layout = LayoutSettings::from_config(&self.config.template).clamped(&self.config.feedback);
        let source = builder.build(&selection, &layout)?;
        artifacts.text("4_resume.tex", &source)?;

        on_stage(Stage::Render);
        let document = self.typesetter.compile(&source).await?;

        on_stage(Stage::Feedback);
        let mut feedback_settings = self.config.feedback.clone();
        feedback_settings.enabled = options.feedback;
        feedback_settings.max_iterations = options.max_iterations;
        let feedback = VisualFeedbackLoop::new(self.llm, self.typesetter, &builder, feedback_settings)
            .with_vision_model(self.config.vision_model());
        let refined = feedback.run(selection, layout, document).await?;
        for pass in &refined.passes {
            artifacts.json(&format!("feedback_{}.json", pass.iteration), pass)?;
        }

        on_stage(Stage::Write);
        artifacts.json("5_final_selection.json", &refined.selection)?;
        let coverage = skill_coverage(&requirements, refined.selection.blocks())?;
        let stamp = started_at.format("%Y%m%d_%H%M%S");
        let tex_path = artifacts.text(&format!("tailored_resume_{}.tex", stamp), &refined.document.source)?;
        let pdf_path = artifacts.bytes(&format!("tailored_resume_{}.pdf", stamp), &refined.document.pdf)?;

        info!(
            "Tailored resume: {} blocks, {} page(s), {}",
            refined.selection.len(),
            refined.document.page_count,
            refined.outcome
        );

        Ok(TailorRun {
            template: options.template.clone(),
            blocks,
            requirements,
            selection: refined.selection,
            coverage,
            initial_layout: layout,
            layout: refined.layout,
            document: refined.document,
            feedback_outcome: refined.outcome,
            feedback_passes: refined.passes,
            tex_path,
            pdf_path,
            artifacts: artifacts.into_written(),
            started_at,
            elapsed: timer.elapsed(),
        })
    }
}

/// Writes run artifacts into one output directory and remembers their paths.
pub struct ArtifactWriter {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl ArtifactWriter {
    pub fn create(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            written: Vec::new(),
        })
    }

    pub fn json<S: Serialize + ?Sized>(&mut self, name: &str, value: &S) -> Result<PathBuf> {
        self.bytes(name, serde_json::to_string_pretty(value)?.as_bytes())
    }

    pub fn text(&mut self, name: &str, text: &str) -> Result<PathBuf> {
        self.bytes(name, text.as_bytes())
    }

    pub fn bytes(&mut self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(name);
        std::fs::write(&path, bytes)?;
        debug!("Wrote {}", path.display());
        self.written.push(path.clone());
        Ok(path)
    }

    pub fn into_written(self) -> Vec<PathBuf> {
        self.written
    }
}

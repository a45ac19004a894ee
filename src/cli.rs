//! CLI interface for the resume tailor

use crate::config::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "resume-tailor")]
#[command(version, about = "Tailor a master resume to a job description with an LLM")]
#[command(long_about = "Split a master resume into blocks, rank them against a job posting, typeset the best ones \
into a one-page LaTeX resume and refine the layout from a visual critique of the rendered pages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline and write a tailored resume
    Tailor {
        /// Path to the master resume (TEX, TXT, MD, PDF)
        #[arg(short, long)]
        resume: PathBuf,

        /// Path to the job description (TXT, MD, PDF)
        #[arg(short, long)]
        job: PathBuf,

        /// Template id (built-in or from the templates directory)
        #[arg(short, long)]
        template: Option<String>,

        /// Directory for the resume and intermediate files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Maximum layout feedback passes
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Skip the layout feedback loop
        #[arg(long)]
        no_feedback: bool,

        /// Maximum number of blocks on the page
        #[arg(long)]
        max_blocks: Option<usize>,

        /// Report format: console, json, markdown, html
        #[arg(short, long)]
        format: Option<String>,

        /// Save the report to a file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Split a resume into labeled blocks
    Parse {
        #[arg(short, long)]
        resume: PathBuf,

        /// Write blocks as JSON to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Extract requirements from a job description
    Analyze {
        #[arg(short, long)]
        job: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Rank parsed blocks against extracted requirements
    Rank {
        /// Blocks JSON from `parse`
        #[arg(long)]
        blocks: PathBuf,

        /// Requirements JSON from `analyze`
        #[arg(long)]
        requirements: PathBuf,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Assemble LaTeX from a selection
    Build {
        /// Selection JSON from `rank`
        #[arg(long)]
        selection: PathBuf,

        #[arg(short, long)]
        template: Option<String>,

        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Compile LaTeX source to PDF
    Render {
        #[arg(long)]
        source: PathBuf,

        /// PDF path (defaults to the source path with a .pdf extension)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Template management commands
    Templates {
        #[command(subcommand)]
        action: TemplateAction,
    },

    /// Show configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand)]
pub enum TemplateAction {
    /// List available templates
    List,

    /// Print a template's source
    Show {
        /// Template id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Reset configuration to defaults
    Reset,

    /// Print the configuration file path
    Path,
}

/// Parse and validate output format
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    match format.to_lowercase().as_str() {
        "console" => Ok(OutputFormat::Console),
        "json" => Ok(OutputFormat::Json),
        "markdown" | "md" => Ok(OutputFormat::Markdown),
        "html" => Ok(OutputFormat::Html),
        _ => Err(format!(
            "Invalid output format: {}. Supported: console, json, markdown, html",
            format
        )),
    }
}

//! Compiling LaTeX source with an external engine

use crate::config::RenderConfig;
use crate::error::{Result, ResumeTailorError};
use crate::typeset::raster;
use log::{debug, info};
use regex::Regex;
use serde::Serialize;
use std::io;
use std::path::Path;
use std::process::{Output, Stdio};
use std::sync::OnceLock;
use tokio::process::Command;

const SOURCE_NAME: &str = "document.tex";
const MAX_DIAGNOSTIC_LINES: usize = 40;

/// Typesetting source and its compiled output
#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderedDocument {
    pub source: String,
    #[serde(skip)]
    pub pdf: Vec<u8>,
    pub page_count: usize,
    #[serde(skip)]
    pub page_images: Vec<Vec<u8>>,
}

/// Turns LaTeX source into a PDF and PDF pages into images.
pub trait Typesetter {
    fn compile(&self, source: &str) -> impl std::future::Future<Output = Result<RenderedDocument>> + Send;

    /// One PNG per page, in page order.
    fn rasterize(&self, pdf: &[u8]) -> impl std::future::Future<Output = Result<Vec<Vec<u8>>>> + Send;
}

#[derive(Debug, Clone)]
pub struct LatexTypesetter {
    engine: String,
    engine_args: Vec<String>,
    passes: u32,
    rasterizer: String,
    dpi: u32,
}

impl LatexTypesetter {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            engine: config.engine.clone(),
            engine_args: config.engine_args.clone(),
            passes: config.passes.max(1),
            rasterizer: config.rasterizer.clone(),
            dpi: config.dpi,
        }
    }

    async fn run_engine(&self, dir: &Path) -> Result<Output> {
        Command::new(&self.engine)
            .args(&self.engine_args)
            .arg(SOURCE_NAME)
            .current_dir(dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| spawn_error(&self.engine, e))
    }
}

impl Typesetter for LatexTypesetter {
    async fn compile(&self, source: &str) -> Result<RenderedDocument> {
        let dir = tempfile::Builder::new().prefix("resume-tailor-").tempdir()?;
        tokio::fs::write(dir.path().join(SOURCE_NAME), source).await?;
        let log_path = dir.path().join("document.log");

        for pass in 1..=self.passes {
            debug!("{} pass {}/{}", self.engine, pass, self.passes);
            let output = self.run_engine(dir.path()).await?;
            if !output.status.success() {
                let log = read_lossy(&log_path).await;
                return Err(ResumeTailorError::CompileError(diagnostic(&log, &output)));
            }
        }

        let pdf = match tokio::fs::read(dir.path().join("document.pdf")).await {
            Ok(pdf) => pdf,
            Err(_) => {
                let log = read_lossy(&log_path).await;
                return Err(ResumeTailorError::CompileError(format!(
                    "{} produced no PDF\n{}",
                    self.engine,
                    log_errors(&log).unwrap_or_default()
                )));
            }
        };

        let log = read_lossy(&log_path).await;
        let page_count = page_count_from_log(&log)
            .or_else(|| page_count_from_pdf(&pdf))
            .ok_or_else(|| {
                ResumeTailorError::CompileError("Could not determine the page count".to_string())
            })?;

        info!("Compiled {} page(s), {} bytes", page_count, pdf.len());
        Ok(RenderedDocument {
            source: source.to_string(),
            pdf,
            page_count,
            page_images: Vec::new(),
        })
    }

    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<Vec<u8>>> {
        raster::rasterize_pdf(&self.rasterizer, self.dpi, pdf).await
    }
}

/// Map a spawn failure; a missing executable means the toolchain is unavailable.
pub(crate) fn spawn_error(program: &str, error: io::Error) -> ResumeTailorError {
    if error.kind() == io::ErrorKind::NotFound {
        ResumeTailorError::ServiceUnavailable(format!("'{}' was not found on PATH", program))
    } else {
        ResumeTailorError::ServiceUnavailable(format!("Failed to run '{}': {}", program, error))
    }
}

async fn read_lossy(path: &Path) -> String {
    tokio::fs::read(path)
        .await
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Error lines from the log, else the tail of the engine's own output.
fn diagnostic(log: &str, output: &Output) -> String {
    if let Some(errors) = log_errors(log) {
        return errors;
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() { stdout } else { stderr };
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(MAX_DIAGNOSTIC_LINES);
    lines[start..].join("\n")
}

/// `!` error lines from a TeX log together with the two lines that follow.
fn log_errors(log: &str) -> Option<String> {
    let lines: Vec<&str> = log.lines().collect();
    let mut picked = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if line.starts_with('!') {
            picked.extend(lines[i..lines.len().min(i + 3)].iter().copied());
        }
    }
    if picked.is_empty() {
        return None;
    }
    picked.truncate(MAX_DIAGNOSTIC_LINES);
    Some(picked.join("\n"))
}

/// Reads `Output written on document.pdf (2 pages, 51234 bytes).`
pub fn page_count_from_log(log: &str) -> Option<usize> {
    static PAGES: OnceLock<Regex> = OnceLock::new();
    let re = PAGES.get_or_init(|| {
        Regex::new(r"(?s)Output written on .*?\((\d+)\s+pages?").expect("valid page count regex")
    });
    re.captures(log).and_then(|c| c[1].parse().ok())
}

fn page_count_from_pdf(pdf: &[u8]) -> Option<usize> {
    static PAGE_OBJECT: OnceLock<regex::bytes::Regex> = OnceLock::new();
    let re = PAGE_OBJECT.get_or_init(|| {
        regex::bytes::Regex::new(r"/Type\s*/Page\b").expect("valid page object regex")
    });
    let count = re.find_iter(pdf).count();
    (count > 0).then_some(count)
}

//! Route input files to the matching text extractor

use crate::error::{Result, ResumeTailorError};
use crate::input::file_detector::FileType;
use crate::input::text_extractor::{MarkdownExtractor, PdfExtractor, PlainTextExtractor, TextExtractor};
use log::info;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct InputLoader;

impl InputLoader {
    pub fn new() -> Self {
        Self
    }

    pub async fn load(&self, path: &Path) -> Result<String> {
        if !path.is_file() {
            return Err(ResumeTailorError::InvalidInput(format!(
                "File does not exist: {}",
                path.display()
            )));
        }

        let text = match FileType::from_path(path) {
            FileType::Pdf => {
                info!("Extracting text from PDF: {}", path.display());
                PdfExtractor.extract(path).await?
            }
            FileType::Latex | FileType::Text => {
                info!("Reading text file: {}", path.display());
                PlainTextExtractor.extract(path).await?
            }
            FileType::Markdown => {
                info!("Processing markdown file: {}", path.display());
                MarkdownExtractor.extract(path).await?
            }
            FileType::Unknown => {
                return Err(ResumeTailorError::UnsupportedFormat(format!(
                    "Unsupported file type for: {} (expected .tex, .txt, .md or .pdf)",
                    path.display()
                )));
            }
        };

        if text.trim().is_empty() {
            return Err(ResumeTailorError::InvalidInput(format!(
                "No text found in {}",
                path.display()
            )));
        }
        Ok(text)
    }
}

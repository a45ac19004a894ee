//! Integration tests for loading resume and job files

use resume_tailor::input::{FileType, InputLoader};
use resume_tailor::ResumeTailorError;
use std::path::Path;

#[tokio::test]
async fn test_text_extraction_from_txt() {
    let loader = InputLoader::new();
    let path = Path::new("tests/fixtures/sample_resume.txt");

    let text = loader.load(path).await.unwrap();
    assert!(text.contains("John Doe"));
    assert!(text.contains("Software Engineer"));
    assert!(text.contains("React"));
    assert!(text.contains("Node.js"));
}

#[tokio::test]
async fn test_text_extraction_from_markdown() {
    let loader = InputLoader::new();
    let path = Path::new("tests/fixtures/sample_resume.md");

    let text = loader.load(path).await.unwrap();
    assert!(text.contains("John Doe"));
    assert!(text.contains("Software Engineer"));
    assert!(text.contains("React"));
    assert!(text.contains("Node.js"));
    // Should not contain markdown formatting
    assert!(!text.contains("**"));
    assert!(!text.contains("##"));
    // Bullets survive as block-parser friendly lines
    assert!(text.contains("- Led migration"));
}

#[tokio::test]
async fn test_latex_source_is_read_verbatim() {
    let loader = InputLoader::new();
    let path = Path::new("tests/fixtures/sample_resume.tex");
    assert_eq!(FileType::from_path(path), FileType::Latex);

    let text = loader.load(path).await.unwrap();
    assert!(text.contains(r"\section*{Experience}"));
    assert!(text.contains("Node.js"));
}

#[tokio::test]
async fn test_unsupported_file_type() {
    let loader = InputLoader::new();
    let path = Path::new("tests/fixtures/unsupported.xyz");

    let result = loader.load(path).await;
    assert!(matches!(result, Err(ResumeTailorError::UnsupportedFormat(_))));
}

#[tokio::test]
async fn test_nonexistent_file() {
    let loader = InputLoader::new();
    let path = Path::new("tests/fixtures/nonexistent.txt");

    let result = loader.load(path).await;
    assert!(matches!(result, Err(ResumeTailorError::InvalidInput(_))));
}

#[tokio::test]
async fn test_blank_file_is_rejected() {
    let loader = InputLoader::new();
    let path = Path::new("tests/fixtures/blank.txt");

    let result = loader.load(path).await;
    assert!(matches!(result, Err(ResumeTailorError::InvalidInput(_))));
}

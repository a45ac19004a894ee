//! Error handling for the resume tailor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResumeTailorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Malformed LLM response: {0}")]
    MalformedResponse(String),

    #[error("Template '{template}' has no slot for block category '{category}'")]
    TemplateMismatch { template: String, category: String },

    #[error("Typesetting failed:\n{0}")]
    CompileError(String),

    #[error("PDF extraction error: {0}")]
    PdfExtraction(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("File format not supported: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Output formatting error: {0}")]
    OutputFormatting(String),
}

impl ResumeTailorError {
    /// Whether a single re-request of the same prompt is allowed for this error.
    pub fn is_retryable_parse(&self) -> bool {
        matches!(self, ResumeTailorError::MalformedResponse(_))
    }
}

pub type Result<T> = std::result::Result<T, ResumeTailorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_mismatch_message() {
        let err = ResumeTailorError::TemplateMismatch {
            template: "classic".to_string(),
            category: "publication".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Template 'classic' has no slot for block category 'publication'"
        );
    }

    #[test]
    fn test_only_malformed_responses_are_retryable() {
        assert!(ResumeTailorError::MalformedResponse("x".into()).is_retryable_parse());
        assert!(!ResumeTailorError::ServiceUnavailable("x".into()).is_retryable_parse());
        assert!(!ResumeTailorError::CompileError("x".into()).is_retryable_parse());
    }
}

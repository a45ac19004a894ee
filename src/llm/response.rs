//! Pulling structured data out of free-text LLM replies

use crate::error::{Result, ResumeTailorError};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"```(?:json|JSON)?\s*([\s\S]*?)\s*```").expect("valid fence regex")
    })
}

fn integer_regex() -> &'static Regex {
    static INTEGER: OnceLock<Regex> = OnceLock::new();
    INTEGER.get_or_init(|| Regex::new(r"\b(\d+)\b").expect("valid integer regex"))
}

/// Extract a JSON value from a reply.
///
/// Accepts a bare JSON document, JSON inside a markdown code fence, or the
/// outermost `{...}` / `[...]` span embedded in prose.
pub fn extract_json(text: &str) -> Result<Value> {
    let trimmed = text.trim();
    if let Ok(value) = serde_json::from_str(trimmed) {
        return Ok(value);
    }

    for capture in fence_regex().captures_iter(trimmed) {
        if let Ok(value) = serde_json::from_str(&capture[1]) {
            return Ok(value);
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let (Some(start), Some(end)) = (trimmed.find(open), trimmed.rfind(close)) {
            if start < end {
                if let Ok(value) = serde_json::from_str(&trimmed[start..=end]) {
                    return Ok(value);
                }
            }
        }
    }

    Err(ResumeTailorError::MalformedResponse(format!(
        "No JSON found in response: {}",
        preview(trimmed, 200)
    )))
}

/// Extract a positive integer from a reply such as `"3"` or `"Threshold: 3"`.
pub fn extract_integer(text: &str) -> Option<usize> {
    let trimmed = text.trim();
    trimmed.parse().ok().or_else(|| {
        integer_regex()
            .captures(trimmed)
            .and_then(|c| c[1].parse().ok())
    })
}

/// Shorten text for error messages without splitting a character.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

//! Check that extracted text only uses words present in its source

use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// Lowercased word set of a source document
pub struct SourceVocabulary {
    words: HashSet<String>,
}

impl SourceVocabulary {
    pub fn new(source: &str) -> Self {
        Self {
            words: words(source).collect(),
        }
    }

    /// Words of `text` that never occur in the source, in first-seen order.
    pub fn unknown_words(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        words(text)
            .filter(|w| !self.words.contains(w))
            .filter(|w| seen.insert(w.clone()))
            .collect()
    }

    pub fn covers(&self, text: &str) -> bool {
        words(text).all(|w| self.words.contains(&w))
    }
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.unicode_words().map(|w| w.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markup_does_not_hide_words() {
        let vocab = SourceVocabulary::new(r"\textbf{Senior Engineer} at \emph{Acme} -- Rust, Node.js");
        assert!(vocab.covers("Senior engineer at ACME: Rust, Node.js"));
        assert!(vocab.covers("- Rust"));
    }

    #[test]
    fn test_reports_invented_words_once() {
        let vocab = SourceVocabulary::new("Built a compiler in Rust");
        let unknown = vocab.unknown_words("Built a blazing fast compiler, blazing fast");
        assert_eq!(unknown, vec!["blazing".to_string(), "fast".to_string()]);
    }

    #[test]
    fn test_punctuation_only_text_is_covered() {
        let vocab = SourceVocabulary::new("anything");
        assert!(vocab.covers("- -- , ."));
    }
}

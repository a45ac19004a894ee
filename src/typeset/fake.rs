//! Typesetter double for tests
//!
//! Estimates the page count from the number of headings and list items in
//! the source, so layout feedback can be exercised without a TeX install.

use crate::error::Result;
use crate::typeset::latex::{RenderedDocument, Typesetter};
use std::sync::Mutex;

pub struct FakeTypesetter {
    lines_per_page: usize,
    compiled: Mutex<Vec<String>>,
}

impl FakeTypesetter {
    pub fn new(lines_per_page: usize) -> Self {
        Self {
            lines_per_page: lines_per_page.max(1),
            compiled: Mutex::new(Vec::new()),
        }
    }

    /// Sources passed to `compile`, oldest first.
    pub fn compiled(&self) -> Vec<String> {
        self.compiled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn estimate_pages(&self, source: &str) -> usize {
        let lines = source
            .lines()
            .map(str::trim_start)
            .filter(|l| l.starts_with("\\item") || l.starts_with("\\blockheading"))
            .count();
        lines.div_ceil(self.lines_per_page).max(1)
    }
}

impl Typesetter for FakeTypesetter {
    async fn compile(&self, source: &str) -> Result<RenderedDocument> {
        self.compiled
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(source.to_string());
        Ok(RenderedDocument {
            source: source.to_string(),
            pdf: b"%PDF-1.4 fake".to_vec(),
            page_count: self.estimate_pages(source),
            page_images: Vec::new(),
        })
    }

    async fn rasterize(&self, pdf: &[u8]) -> Result<Vec<Vec<u8>>> {
        Ok(vec![pdf.to_vec()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pages_grow_with_items() {
        let fake = FakeTypesetter::new(2);
        let short = fake.compile("\\blockheading{A}\n  \\item one\n").await.unwrap();
        let long = fake.compile("\\item a\n\\item b\n\\item c\n").await.unwrap();
        assert_eq!(short.page_count, 1);
        assert_eq!(long.page_count, 2);
        assert_eq!(fake.compiled().len(), 2);
    }
}

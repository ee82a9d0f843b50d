//! Rendering result with statistics.

use serde::{Deserialize, Serialize};

/// Result of rendering a case, including content and statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResult {
    /// The rendered content (XML, HTML or text)
    pub content: String,

    /// Rendering statistics
    pub stats: RenderStats,
}

impl RenderResult {
    /// Create a new render result.
    pub fn new(content: String, stats: RenderStats) -> Self {
        Self { content, stats }
    }

    /// Get the content length in bytes.
    pub fn content_len(&self) -> usize {
        self.content.len()
    }
}

/// Statistics collected while rendering a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    /// Number of paragraphs written (footnote paragraphs included)
    pub paragraph_count: u32,

    /// Number of footnotes written
    pub footnote_count: u32,

    /// Number of inline markers written (footnote marks, bracket numbers)
    pub marker_count: u32,

    /// Number of page-number markers inserted
    pub page_label_count: u32,

    /// Number of illustrations written
    pub illustration_count: u32,

    /// Blocks, paragraphs and footnotes left out in redacted mode
    pub skipped_count: u32,

    /// Approximate word count (whitespace-separated tokens)
    pub word_count: u32,
}

impl RenderStats {
    /// Create new empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment paragraph count.
    pub fn add_paragraph(&mut self) {
        self.paragraph_count += 1;
    }

    /// Increment footnote count.
    pub fn add_footnote(&mut self) {
        self.footnote_count += 1;
    }

    /// Increment marker count.
    pub fn add_marker(&mut self) {
        self.marker_count += 1;
    }

    /// Increment page-number marker count.
    pub fn add_page_label(&mut self) {
        self.page_label_count += 1;
    }

    /// Increment illustration count.
    pub fn add_illustration(&mut self) {
        self.illustration_count += 1;
    }

    /// Increment skipped count.
    pub fn add_skipped(&mut self) {
        self.skipped_count += 1;
    }

    /// Add word count from text.
    pub fn count_text(&mut self, text: &str) {
        self.word_count += text.split_whitespace().count() as u32;
    }

    /// Merge another stats instance into this one.
    pub fn merge(&mut self, other: &RenderStats) {
        self.paragraph_count += other.paragraph_count;
        self.footnote_count += other.footnote_count;
        self.marker_count += other.marker_count;
        self.page_label_count += other.page_label_count;
        self.illustration_count += other.illustration_count;
        self.skipped_count += other.skipped_count;
        self.word_count += other.word_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_stats_count_text() {
        let mut stats = RenderStats::new();
        stats.count_text("The court held, as below.");
        assert_eq!(stats.word_count, 5);
    }

    #[test]
    fn test_render_stats_merge() {
        let mut stats1 = RenderStats::new();
        stats1.paragraph_count = 5;
        stats1.footnote_count = 2;

        let stats2 = RenderStats {
            paragraph_count: 3,
            footnote_count: 1,
            skipped_count: 4,
            ..Default::default()
        };

        stats1.merge(&stats2);

        assert_eq!(stats1.paragraph_count, 8);
        assert_eq!(stats1.footnote_count, 3);
        assert_eq!(stats1.skipped_count, 4);
    }
}

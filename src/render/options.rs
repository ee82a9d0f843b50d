//! Rendering configuration.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::model::{FontRegistry, VolumeIndex};

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Format {
    /// Byte-exact OCR layout document
    #[default]
    OriginalLayout,
    /// Canonical case document (metadata, casebody, blockmap)
    OriginalCanonical,
    /// Casebody with emphasis and page-number markers
    EnrichedCanonical,
    /// HTML casebody
    Html,
    /// Plain text
    Text,
}

impl Format {
    /// Check if this is a case-level markup format.
    pub fn is_markup(self) -> bool {
        !matches!(self, Format::OriginalLayout)
    }

    /// Check if emphasis and page labels are rendered.
    pub fn is_enriched(self) -> bool {
        matches!(self, Format::EnrichedCanonical | Format::Html)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Format::OriginalLayout => "layout",
            Format::OriginalCanonical => "xml",
            Format::EnrichedCanonical => "enriched",
            Format::Html => "html",
            Format::Text => "text",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "layout" | "alto" => Ok(Format::OriginalLayout),
            "xml" | "canonical" => Ok(Format::OriginalCanonical),
            "enriched" => Ok(Format::EnrichedCanonical),
            "html" => Ok(Format::Html),
            "text" | "txt" => Ok(Format::Text),
            other => Err(format!("Unknown format: {}", other)),
        }
    }
}

/// Immutable configuration of one render call.
///
/// All lookups a renderer needs go through the borrowed index and registry;
/// a config can be shared freely between threads.
#[derive(Debug, Clone, Copy)]
pub struct RenderConfig<'a> {
    /// Block and page-label lookup
    pub index: &'a VolumeIndex<'a>,

    /// Volume font registry
    pub fonts: &'a FontRegistry,

    /// Omit redacted blocks, spans, paragraphs and footnotes
    pub redacted: bool,

    /// Output format
    pub format: Format,
}

impl<'a> RenderConfig<'a> {
    /// Create a config for unredacted layout output.
    pub fn new(index: &'a VolumeIndex<'a>, fonts: &'a FontRegistry) -> Self {
        Self {
            index,
            fonts,
            redacted: false,
            format: Format::default(),
        }
    }

    /// Set the output format.
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable redacted output.
    pub fn with_redacted(mut self, redacted: bool) -> Self {
        self.redacted = redacted;
        self
    }
}

/// Page selection by physical page order.
#[derive(Debug, Clone, Default)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive)
    Range(RangeInclusive<u32>),
    /// Specific pages
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page should be included.
    pub fn includes(&self, order: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&order),
            PageSelection::Pages(pages) => pages.contains(&order),
        }
    }

    /// Parse a selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid start page")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid end page")?;
                return Ok(PageSelection::Range(start..=end));
            }
        }

        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid page number")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid page number")?;
                pages.extend(start..=end);
            } else {
                pages.push(part.parse().map_err(|_| "Invalid page number")?);
            }
        }

        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Page;

    #[test]
    fn test_render_config_builder() {
        let pages: Vec<Page> = Vec::new();
        let index = VolumeIndex::new(&pages).unwrap();
        let fonts = FontRegistry::new();

        let config = RenderConfig::new(&index, &fonts)
            .with_format(Format::Html)
            .with_redacted(true);
        assert_eq!(config.format, Format::Html);
        assert!(config.redacted);
        assert!(config.format.is_enriched());
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("HTML".parse::<Format>().unwrap(), Format::Html);
        assert_eq!("xml".parse::<Format>().unwrap(), Format::OriginalCanonical);
        assert_eq!(Format::EnrichedCanonical.to_string(), "enriched");
        assert!("pdf".parse::<Format>().is_err());
        assert!(!Format::OriginalLayout.is_markup());
    }

    #[test]
    fn test_page_selection() {
        let range = PageSelection::parse("5-10").unwrap();
        assert!(!range.includes(4));
        assert!(range.includes(10));

        match PageSelection::parse("1,3,5-7,3").unwrap() {
            PageSelection::Pages(pages) => assert_eq!(pages, vec![1, 3, 5, 6, 7]),
            other => panic!("Expected Pages variant, got {:?}", other),
        }
        assert!(matches!(PageSelection::parse("all").unwrap(), PageSelection::All));
    }
}

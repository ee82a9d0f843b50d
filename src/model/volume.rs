//! Volume container and block index.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{Block, Case, FontRegistry, Page};
use crate::error::{Error, Result};
use crate::render::{self, Format, RenderConfig};

/// Volume-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeMetadata {
    /// Volume barcode, unique across the collection
    pub barcode: String,

    /// Reporter name (e.g., "Illinois Reports")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reporter: Option<String>,

    /// Volume number within the reporter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_number: Option<String>,
}

impl VolumeMetadata {
    /// Create metadata for a barcode.
    pub fn new(barcode: impl Into<String>) -> Self {
        Self {
            barcode: barcode.into(),
            ..Default::default()
        }
    }
}

/// A processed volume: pages, cases and the font registry they share.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Volume {
    pub metadata: VolumeMetadata,
    pub pages: Vec<Page>,
    pub cases: Vec<Case>,
    pub fonts: FontRegistry,
}

impl Volume {
    /// Create an empty volume.
    pub fn new(metadata: VolumeMetadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    /// Build the block index over this volume's pages.
    pub fn index(&self) -> Result<VolumeIndex<'_>> {
        VolumeIndex::new(&self.pages)
    }

    /// Look up a page by id.
    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    /// Look up a case by id.
    pub fn case(&self, id: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == id)
    }

    /// Render every case in `format`, optionally in parallel.
    ///
    /// Output order follows case order regardless of `parallel`.
    pub fn render_cases(&self, format: Format, redacted: bool, parallel: bool) -> Result<Vec<String>> {
        let index = self.index()?;
        let config = RenderConfig::new(&index, &self.fonts)
            .with_format(format)
            .with_redacted(redacted);

        log::debug!(
            "Rendering {} cases of volume {} as {:?}",
            self.cases.len(),
            self.metadata.barcode,
            format
        );

        if parallel {
            self.cases
                .par_iter()
                .map(|case| render::render_case(case, &config))
                .collect()
        } else {
            self.cases
                .iter()
                .map(|case| render::render_case(case, &config))
                .collect()
        }
    }

    /// Check every page against its source layout document.
    ///
    /// `sources[i]` is the raw layout of `pages[i]`. The first mismatch in page
    /// order is returned.
    pub fn validate_pages(&self, sources: &[&str], parallel: bool) -> Result<()> {
        if sources.len() != self.pages.len() {
            return Err(Error::ValidationMismatch(format!(
                "{} sources for {} pages",
                sources.len(),
                self.pages.len()
            )));
        }

        let index = self.index()?;
        let config = RenderConfig::new(&index, &self.fonts);

        let results: Vec<Result<()>> = if parallel {
            self.pages
                .par_iter()
                .zip(sources.par_iter())
                .map(|(page, source)| render::validate_page(page, source, &config))
                .collect()
        } else {
            self.pages
                .iter()
                .zip(sources.iter())
                .map(|(page, source)| render::validate_page(page, source, &config))
                .collect()
        };

        results.into_iter().collect()
    }
}

/// Lookup tables from block id to block and to page label.
///
/// Borrowed from a page slice; rebuilt by the caller whenever the pages change.
#[derive(Debug, Clone)]
pub struct VolumeIndex<'a> {
    blocks: HashMap<&'a str, &'a Block>,
    labels: HashMap<&'a str, &'a str>,
}

impl<'a> VolumeIndex<'a> {
    /// Index the blocks of `pages`, rejecting duplicate block ids.
    pub fn new(pages: &'a [Page]) -> Result<Self> {
        let mut blocks = HashMap::new();
        let mut labels = HashMap::new();

        for page in pages {
            for block in &page.blocks {
                if blocks.insert(block.id.as_str(), block).is_some() {
                    return Err(Error::Malformed(format!(
                        "duplicate block id {} on page {}",
                        block.id, page.id
                    )));
                }
                labels.insert(block.id.as_str(), page.label.as_str());
            }
        }

        Ok(Self { blocks, labels })
    }

    /// Look up a block.
    pub fn get(&self, id: &str) -> Option<&'a Block> {
        self.blocks.get(id).copied()
    }

    /// Look up a block, failing with [`Error::MissingReference`].
    pub fn resolve(&self, id: &str) -> Result<&'a Block> {
        self.get(id)
            .ok_or_else(|| Error::MissingReference(format!("block {}", id)))
    }

    /// Printed label of the page holding a block.
    pub fn page_label(&self, id: &str) -> Option<&'a str> {
        self.labels.get(id).copied()
    }

    /// Number of indexed blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Check if the index is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

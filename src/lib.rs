//! # casestream
//!
//! Token-stream model, byte-exact renderer and text synchronizer for OCR'd
//! legal volumes.
//!
//! A volume arrives as one OCR layout document per page and one canonical
//! document per case. This crate extracts both into a single token model,
//! renders the model back into the original layout documents and into derived
//! formats, and propagates corrections of the canonical text into the OCR
//! tokens.
//!
//! ## Quick Start
//!
//! ```no_run
//! use casestream::{render, Format, RenderConfig, VolumeBuilder, VolumeMetadata};
//!
//! fn main() -> casestream::Result<()> {
//!     let mut builder = VolumeBuilder::new(VolumeMetadata::new("32044057891234"));
//!     builder.add_page(&std::fs::read_to_string("page_0012.xml")?)?;
//!     builder.add_case(&std::fs::read_to_string("case_0001.xml")?, "case_0001")?;
//!     let volume = builder.build()?;
//!
//!     let index = volume.index()?;
//!     let config = RenderConfig::new(&index, &volume.fonts).with_format(Format::Html);
//!     println!("{}", render::render_case(&volume.cases[0], &config)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Byte-exact layout output**: pages render back to their source documents
//! - **Derived formats**: canonical XML, enriched XML, HTML, plain text
//! - **Synchronizer**: character-level diffs recorded as edit spans
//! - **Redaction**: spans omitted from redacted output and sealed with AES-256-GCM
//! - **Parallel rendering**: Uses Rayon for finished volumes

pub mod archive;
pub mod detect;
pub mod error;
pub mod extract;
pub mod model;
pub mod redact;
pub mod render;
pub mod sync;

mod xml;

// Re-export commonly used types
pub use archive::{load_archive, read_archive, save_archive, write_archive};
pub use detect::{detect_format_from_bytes, detect_format_from_path, DocumentKind};
pub use error::{Error, Result};
pub use extract::{ExtractOptions, Extractor};
pub use model::{
    Block, Case, Font, FontId, FontRegistry, MarkKind, Opinion, OpinionKind, Page, Paragraph,
    ParagraphKind, Token, Volume, VolumeIndex, VolumeMetadata,
};
pub use redact::{RedactedText, RedactionKey, RedactionTarget};
pub use render::{Format, RenderConfig, RenderResult};
pub use sync::{ParagraphContent, SyncReport};

/// Builder running the extraction flow of one volume.
///
/// Pages must be added before the cases that reference them. Work within a
/// volume is sequential; [`build`](Self::build) optionally validates every
/// page against its source, in parallel when the options allow it.
///
/// # Example
///
/// ```no_run
/// use casestream::{ExtractOptions, VolumeBuilder, VolumeMetadata};
///
/// let mut builder = VolumeBuilder::new(VolumeMetadata::new("32044057891234"))
///     .with_options(ExtractOptions::new().with_validation(true));
/// builder.add_page(&std::fs::read_to_string("page_0012.xml")?)?;
/// let volume = builder.build()?;
/// # Ok::<(), casestream::Error>(())
/// ```
pub struct VolumeBuilder {
    volume: Volume,
    options: ExtractOptions,
    sources: Vec<String>,
}

impl VolumeBuilder {
    /// Create a builder for a new volume.
    pub fn new(metadata: VolumeMetadata) -> Self {
        Self {
            volume: Volume::new(metadata),
            options: ExtractOptions::default(),
            sources: Vec::new(),
        }
    }

    /// Set the extraction options.
    pub fn with_options(mut self, options: ExtractOptions) -> Self {
        self.options = options;
        self
    }

    /// Extract a page from its layout document and append it.
    ///
    /// Page validation is deferred to [`build`](Self::build).
    pub fn add_page(&mut self, raw_layout: &str) -> Result<&Page> {
        let options = self.options.clone().with_validation(false);
        let page = Extractor::new(&mut self.volume.fonts, options).extract_page(raw_layout)?;
        if self.options.validate {
            self.sources.push(raw_layout.to_string());
        }
        self.volume.pages.push(page);
        Ok(&self.volume.pages[self.volume.pages.len() - 1])
    }

    /// Extract a case from its canonical document and reconcile it into the
    /// pages added so far.
    ///
    /// A rejected case leaves the pages as they were, so the builder stays
    /// usable.
    pub fn add_case(&mut self, raw_canonical: &str, case_id: &str) -> Result<&Case> {
        let case = Extractor::new(&mut self.volume.fonts, self.options.clone()).extract_case(
            raw_canonical,
            case_id,
            &mut self.volume.pages,
        )?;
        self.volume.cases.push(case);
        Ok(&self.volume.cases[self.volume.cases.len() - 1])
    }

    /// Number of pages added.
    pub fn page_count(&self) -> usize {
        self.volume.pages.len()
    }

    /// Number of cases added.
    pub fn case_count(&self) -> usize {
        self.volume.cases.len()
    }

    /// Finish the volume.
    pub fn build(self) -> Result<Volume> {
        if self.options.validate {
            let sources: Vec<&str> = self.sources.iter().map(String::as_str).collect();
            self.volume.validate_pages(&sources, self.options.parallel)?;
        }

        log::info!(
            "Built volume {}: {} pages, {} cases, {} fonts",
            self.volume.metadata.barcode,
            self.volume.pages.len(),
            self.volume.cases.len(),
            self.volume.fonts.len()
        );
        Ok(self.volume)
    }
}

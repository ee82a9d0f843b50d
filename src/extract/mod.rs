//! Extraction of the token model from layout and canonical documents.
//!
//! Extraction is one-directional: source documents are parsed once, and every
//! later output is rendered from the model.

mod canonical;
mod layout;
mod options;

pub use options::ExtractOptions;

use crate::error::Result;
use crate::model::{Case, FontRegistry, Page, VolumeIndex};
use crate::render::{self, Format, RenderConfig};
use crate::xml;

/// Builds pages and cases of one volume.
///
/// The extractor borrows the volume's [`FontRegistry`] mutably for its whole
/// lifetime; every style it meets is interned there.
pub struct Extractor<'r> {
    fonts: &'r mut FontRegistry,
    options: ExtractOptions,
}

impl<'r> Extractor<'r> {
    /// Create an extractor writing into `fonts`.
    pub fn new(fonts: &'r mut FontRegistry, options: ExtractOptions) -> Self {
        Self { fonts, options }
    }

    /// Options in use.
    pub fn options(&self) -> &ExtractOptions {
        &self.options
    }

    /// Extract one page from a layout document.
    pub fn extract_page(&mut self, raw_layout: &str) -> Result<Page> {
        let root = xml::parse(raw_layout)?;
        let page = layout::extract_page(&root, self.fonts)?;

        if self.options.validate {
            let pages = std::slice::from_ref(&page);
            let index = VolumeIndex::new(pages)?;
            let config = RenderConfig::new(&index, self.fonts);
            render::validate_page(&page, raw_layout, &config)?;
        }

        Ok(page)
    }

    /// Extract one case from a canonical document.
    ///
    /// The case's paragraph content is reconciled into the text blocks of
    /// `pages`: corrections become edit spans and inline markers become mark
    /// spans. On error `pages` is left as it was.
    pub fn extract_case(
        &mut self,
        raw_canonical: &str,
        case_id: &str,
        pages: &mut [Page],
    ) -> Result<Case> {
        let root = xml::parse(raw_canonical)?;
        let (case, snapshot) = canonical::extract_case(&root, case_id, pages)?;

        if self.options.validate {
            let fonts: &FontRegistry = self.fonts;
            let checked = VolumeIndex::new(pages).and_then(|index| {
                let config = RenderConfig::new(&index, fonts).with_format(Format::OriginalCanonical);
                render::validate_case(&case, raw_canonical, &config)
            });
            if let Err(e) = checked {
                snapshot.restore(pages);
                return Err(e);
            }
        }

        Ok(case)
    }
}

//! Rendering of pages and cases to layout, canonical, enriched, HTML and text
//! output.
//!
//! Every format is produced directly from the token model; no output is ever
//! derived from another rendering.

mod layout;
mod markup;
mod options;
mod result;
mod strip;
mod validate;

pub use layout::{to_layout, LayoutRenderer};
pub use markup::{to_markup, to_markup_with_stats, MarkupRenderer};
pub use options::{Format, PageSelection, RenderConfig};
pub use result::{RenderResult, RenderStats};
pub use strip::paragraph_texts;
pub use validate::{validate_case, validate_page};

use crate::error::{Error, Result};
use crate::model::{Case, Page};

/// Render a page as its layout document.
pub fn render_page(page: &Page, config: &RenderConfig<'_>) -> Result<String> {
    if config.format != Format::OriginalLayout {
        return Err(Error::Render(format!(
            "pages render only as layout, not {}",
            config.format
        )));
    }
    to_layout(page, config)
}

/// Render a case in one of the markup formats.
pub fn render_case(case: &Case, config: &RenderConfig<'_>) -> Result<String> {
    to_markup(case, config)
}

/// Render a case with statistics.
pub fn render_case_with_stats(case: &Case, config: &RenderConfig<'_>) -> Result<RenderResult> {
    to_markup_with_stats(case, config)
}

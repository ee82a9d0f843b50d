//! Layout document rendering.

use quick_xml::escape::partial_escape;
use std::borrow::Cow;
use std::fmt::Write as _;

use super::RenderConfig;
use crate::error::{Error, Result};
use crate::model::{Block, FontId, OcrSpan, Page, Rect, Token};

const ALTO_NAMESPACE: &str = "http://www.loc.gov/standards/alto/ns-v3#";

/// Render a page as a layout document.
pub fn to_layout(page: &Page, config: &RenderConfig<'_>) -> Result<String> {
    LayoutRenderer::new(*config).render(page)
}

/// Renders one page back into its layout document.
///
/// String contents are rebuilt from the tokens with every edit reverted to the
/// original OCR text; the page confidence summary is recomputed from the
/// strings actually written.
pub struct LayoutRenderer<'a> {
    config: RenderConfig<'a>,
    confidences: Vec<f64>,
}

struct OcrString<'t> {
    span: &'t OcrSpan,
    font: Option<FontId>,
    content: String,
    redacted: bool,
}

struct Line<'t> {
    rect: Rect,
    strings: Vec<OcrString<'t>>,
}

impl<'a> LayoutRenderer<'a> {
    /// Create a new layout renderer.
    pub fn new(config: RenderConfig<'a>) -> Self {
        Self {
            config,
            confidences: Vec::new(),
        }
    }

    /// Render a page.
    pub fn render(mut self, page: &Page) -> Result<String> {
        let visible: Vec<&Block> = page
            .blocks
            .iter()
            .filter(|b| !(self.config.redacted && b.redacted))
            .collect();

        let mut body = String::new();
        for (space, rect) in page.spaces.iter().enumerate() {
            let blocks: Vec<&Block> = visible.iter().copied().filter(|b| b.space == space).collect();
            if blocks.is_empty() {
                let _ = writeln!(body, "      <PrintSpace {}/>", rect_attrs(rect));
                continue;
            }
            let _ = writeln!(body, "      <PrintSpace {}>", rect_attrs(rect));
            for block in blocks {
                self.render_block(&mut body, page, block)?;
            }
            body.push_str("      </PrintSpace>\n");
        }

        let mut out = String::new();
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = writeln!(out, "<alto xmlns=\"{}\">", ALTO_NAMESPACE);
        out.push_str("  <Description>\n    <sourceImageInformation>\n");
        if page.image_ref.is_empty() {
            out.push_str("      <fileName/>\n");
        } else {
            let _ = writeln!(out, "      <fileName>{}</fileName>", partial_escape(&page.image_ref));
        }
        out.push_str("    </sourceImageInformation>\n  </Description>\n");

        self.render_styles(&mut out, page)?;

        if visible.is_empty() {
            out.push_str("  <Tags/>\n");
        } else {
            out.push_str("  <Tags>\n");
            for block in &visible {
                let _ = writeln!(
                    out,
                    "    <StructureTag ID=\"{}\" TYPE=\"structural\" LABEL=\"{}\"/>",
                    escape_attr(&block.id),
                    escape_attr(&block.class)
                );
            }
            out.push_str("  </Tags>\n");
        }

        out.push_str("  <Layout>\n");
        let _ = write!(
            out,
            "    <Page ID=\"{}\" PHYSICAL_IMG_NR=\"{}\" PRINTED_IMG_NR=\"{}\" WIDTH=\"{}\" HEIGHT=\"{}\" DESKEW=\"{:.2}\" PC=\"{}\"",
            escape_attr(&page.id),
            page.order,
            escape_attr(&page.label),
            page.width,
            page.height,
            page.deskew,
            self.page_confidence()
        );
        if page.spaces.is_empty() {
            out.push_str("/>\n");
        } else {
            out.push_str(">\n");
            out.push_str(&body);
            out.push_str("    </Page>\n");
        }
        out.push_str("  </Layout>\n</alto>\n");

        Ok(out)
    }

    fn page_confidence(&self) -> String {
        if self.confidences.is_empty() {
            return "1.00".to_string();
        }
        let mean = self.confidences.iter().sum::<f64>() / self.confidences.len() as f64;
        format!("{:.2}", mean)
    }

    fn render_styles(&self, out: &mut String, page: &Page) -> Result<()> {
        if page.styles.is_empty() {
            out.push_str("  <Styles/>\n");
            return Ok(());
        }
        out.push_str("  <Styles>\n");
        for style in &page.styles {
            let font = self.config.fonts.resolve(style.font)?;
            let _ = write!(
                out,
                "    <TextStyle ID=\"{}\" FONTFAMILY=\"{}\" FONTSIZE=\"{}\"",
                escape_attr(&style.id),
                escape_attr(&font.family),
                escape_attr(&font.size)
            );
            for (name, value) in [
                ("FONTSTYLE", &font.style),
                ("FONTTYPE", &font.kind),
                ("FONTWIDTH", &font.width),
            ] {
                if !value.is_empty() {
                    let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
                }
            }
            out.push_str("/>\n");
        }
        out.push_str("  </Styles>\n");
        Ok(())
    }

    fn render_block(&mut self, out: &mut String, page: &Page, block: &Block) -> Result<()> {
        let Some(tokens) = block.tokens.as_deref() else {
            let _ = writeln!(
                out,
                "        <Illustration ID=\"{}\" {} TAGREFS=\"{}\"/>",
                escape_attr(&block.id),
                rect_attrs(&block.rect),
                escape_attr(&block.id)
            );
            return Ok(());
        };

        let lines = collect_lines(tokens, &block.id)?;
        let head = format!(
            "        <TextBlock ID=\"{}\" {} TAGREFS=\"{}\"",
            escape_attr(&block.id),
            rect_attrs(&block.rect),
            escape_attr(&block.id)
        );
        if lines.is_empty() {
            out.push_str(&head);
            out.push_str("/>\n");
            return Ok(());
        }

        out.push_str(&head);
        out.push_str(">\n");
        for line in lines {
            let strings: Vec<OcrString<'_>> = line
                .strings
                .into_iter()
                .filter(|s| !(self.config.redacted && s.redacted))
                .collect();
            if strings.is_empty() {
                let _ = writeln!(out, "          <TextLine {}/>", rect_attrs(&line.rect));
                continue;
            }
            let _ = writeln!(out, "          <TextLine {}>", rect_attrs(&line.rect));
            for string in strings {
                self.render_string(out, page, &string)?;
            }
            out.push_str("          </TextLine>\n");
        }
        out.push_str("        </TextBlock>\n");
        Ok(())
    }

    fn render_string(&mut self, out: &mut String, page: &Page, string: &OcrString<'_>) -> Result<()> {
        let span = string.span;
        let _ = write!(
            out,
            "            <String {} CONTENT=\"{}\" WC=\"{:.2}\" CC=\"{}\"",
            rect_attrs(&span.rect),
            escape_attr(&string.content),
            span.word_confidence,
            escape_attr(span.char_confidence.as_deref().unwrap_or("0"))
        );
        if let Some(font) = string.font {
            let style = page.style_id(font).ok_or_else(|| {
                Error::MissingReference(format!("style for font {} on page {}", font, page.id))
            })?;
            let _ = write!(out, " STYLEREFS=\"{}\"", escape_attr(style));
        }
        out.push_str("/>\n");
        self.confidences.push(span.word_confidence);
        Ok(())
    }
}

/// Escape an attribute value the way layout documents are written: `&`, `<`,
/// `>` and `"` only. Apostrophes stay literal.
fn escape_attr(value: &str) -> Cow<'_, str> {
    if !value.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(value);
    }
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn rect_attrs(rect: &Rect) -> String {
    format!(
        "HPOS=\"{}\" VPOS=\"{}\" WIDTH=\"{}\" HEIGHT=\"{}\"",
        rect.hpos, rect.vpos, rect.width, rect.height
    )
}

/// Group a block's tokens into lines of OCR strings.
fn collect_lines<'t>(tokens: &'t [Token], block_id: &str) -> Result<Vec<Line<'t>>> {
    let mut lines = Vec::new();
    let mut line: Option<Line<'t>> = None;
    let mut string: Option<OcrString<'t>> = None;
    let mut fonts: Vec<FontId> = Vec::new();
    let mut redact_depth = 0usize;
    let mut edit_depth = 0usize;

    for token in tokens {
        match token {
            Token::LineStart(rect) => {
                line = Some(Line {
                    rect: *rect,
                    strings: Vec::new(),
                })
            }
            Token::LineEnd => lines.extend(line.take()),
            Token::FontStart(id) => fonts.push(*id),
            Token::FontEnd => {
                fonts.pop();
            }
            Token::OcrStart(span) => {
                string = Some(OcrString {
                    span,
                    font: fonts.last().copied(),
                    content: String::new(),
                    redacted: redact_depth > 0,
                })
            }
            Token::OcrEnd => {
                if let Some(done) = string.take() {
                    let current = line.as_mut().ok_or_else(|| {
                        Error::Render(format!("OCR string outside a line in block {}", block_id))
                    })?;
                    current.strings.push(done);
                }
            }
            Token::RedactStart => {
                redact_depth += 1;
                if let Some(s) = string.as_mut() {
                    s.redacted = true;
                }
            }
            Token::RedactEnd => redact_depth = redact_depth.saturating_sub(1),
            Token::EditStart { original } => {
                if edit_depth == 0 {
                    if let Some(s) = string.as_mut() {
                        s.content.push_str(original);
                    }
                }
                edit_depth += 1;
            }
            Token::EditEnd => edit_depth = edit_depth.saturating_sub(1),
            Token::Text(text) => {
                if edit_depth == 0 {
                    if let Some(s) = string.as_mut() {
                        s.content.push_str(text);
                    }
                }
            }
            Token::MarkStart(_) | Token::MarkEnd => {}
        }
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Font, FontRegistry, StyleRef, VolumeIndex};

    fn sample_page(fonts: &mut FontRegistry) -> Page {
        let font = fonts.intern(Font::new("Times", "9.00"));
        let rect = Rect::new(1, 2, 3, 4);
        let mut page = Page::new("page_1", 1, "5").with_size(100, 200);
        page.image_ref = "img.tif".to_string();
        page.spaces.push(Rect::new(0, 0, 100, 200));
        page.styles.push(StyleRef {
            id: "Style_1".to_string(),
            font,
        });
        let tokens = vec![
            Token::LineStart(rect),
            Token::FontStart(font),
            Token::OcrStart(OcrSpan::new(rect, 0.5).with_char_confidence("0090")),
            Token::text("T"),
            Token::edit("b"),
            Token::text("h"),
            Token::EditEnd,
            Token::text("e"),
            Token::OcrEnd,
            Token::text(" "),
            Token::OcrStart(OcrSpan::new(rect, 1.0)),
            Token::RedactStart,
            Token::text("secret"),
            Token::RedactEnd,
            Token::OcrEnd,
            Token::FontEnd,
            Token::LineEnd,
        ];
        page.add_block(Block::text_block("BL_1.1", rect, "p", tokens).unwrap());
        page
    }

    #[test]
    fn test_layout_reverts_edits() {
        let mut fonts = FontRegistry::new();
        let page = sample_page(&mut fonts);
        let pages = vec![page];
        let index = VolumeIndex::new(&pages).unwrap();
        let config = RenderConfig::new(&index, &fonts);

        let out = to_layout(&pages[0], &config).unwrap();
        assert!(out.contains("CONTENT=\"Tbe\" WC=\"0.50\" CC=\"0090\" STYLEREFS=\"Style_1\""));
        assert!(out.contains("CONTENT=\"secret\" WC=\"1.00\" CC=\"0\""));
        assert!(out.contains("PC=\"0.75\""));
        assert!(out.contains("<fileName>img.tif</fileName>"));
        assert!(out.contains("<StructureTag ID=\"BL_1.1\" TYPE=\"structural\" LABEL=\"p\"/>"));
    }

    #[test]
    fn test_layout_redacted_skips_strings() {
        let mut fonts = FontRegistry::new();
        let page = sample_page(&mut fonts);
        let pages = vec![page];
        let index = VolumeIndex::new(&pages).unwrap();
        let config = RenderConfig::new(&index, &fonts).with_redacted(true);

        let out = to_layout(&pages[0], &config).unwrap();
        assert!(!out.contains("secret"));
        assert!(out.contains("PC=\"0.50\""));
    }

    #[test]
    fn test_layout_redacted_block() {
        let mut fonts = FontRegistry::new();
        let mut page = sample_page(&mut fonts);
        page.blocks[0].redacted = true;
        let pages = vec![page];
        let index = VolumeIndex::new(&pages).unwrap();
        let config = RenderConfig::new(&index, &fonts).with_redacted(true);

        let out = to_layout(&pages[0], &config).unwrap();
        assert!(!out.contains("TextBlock"));
        assert!(out.contains("<Tags/>"));
        assert!(out.contains("PC=\"1.00\""));
    }

    #[test]
    fn test_escape_attr_keeps_apostrophes() {
        assert_eq!(escape_attr("court's"), "court's");
        assert!(matches!(escape_attr("plain"), Cow::Borrowed(_)));
        assert_eq!(escape_attr("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d'");
    }

    #[test]
    fn test_apostrophe_in_content() {
        let mut fonts = FontRegistry::new();
        let mut page = sample_page(&mut fonts);
        if let Some(tokens) = page.blocks[0].tokens.as_mut() {
            tokens[12] = Token::text("court's");
        }
        let pages = vec![page];
        let index = VolumeIndex::new(&pages).unwrap();
        let config = RenderConfig::new(&index, &fonts);

        let out = to_layout(&pages[0], &config).unwrap();
        assert!(out.contains("CONTENT=\"court's\""));
        assert!(!out.contains("&apos;"));
    }

    #[test]
    fn test_missing_style_for_font() {
        let mut fonts = FontRegistry::new();
        let mut page = sample_page(&mut fonts);
        page.styles.clear();
        let pages = vec![page];
        let index = VolumeIndex::new(&pages).unwrap();
        let config = RenderConfig::new(&index, &fonts);
        assert!(matches!(
            to_layout(&pages[0], &config),
            Err(Error::MissingReference(_))
        ));
    }
}

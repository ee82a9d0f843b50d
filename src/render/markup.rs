//! Case rendering: canonical XML, enriched XML, HTML and plain text.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use quick_xml::escape::{escape, partial_escape};
use std::collections::HashSet;
use std::fmt::Write as _;

use super::{Format, RenderConfig, RenderResult, RenderStats};
use crate::error::{Error, Result};
use crate::model::{Block, Case, CaseMetadata, FontId, Footnote, MarkKind, Opinion, Paragraph, Token};

/// Render a case in a markup format.
pub fn to_markup(case: &Case, config: &RenderConfig<'_>) -> Result<String> {
    MarkupRenderer::new(*config).render(case)
}

/// Render a case in a markup format with statistics.
pub fn to_markup_with_stats(case: &Case, config: &RenderConfig<'_>) -> Result<RenderResult> {
    MarkupRenderer::new(*config).render_with_stats(case)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Em,
    Strong,
    SmallCaps,
}

/// Style keyword prefix → emphasis, in nesting order.
const EMPHASIS_TABLE: &[(&str, Emphasis)] = &[
    ("italic", Emphasis::Em),
    ("bold", Emphasis::Strong),
    ("smallcaps", Emphasis::SmallCaps),
];

impl Emphasis {
    fn open(self, format: Format) -> &'static str {
        match (self, format) {
            (Emphasis::Em, _) => "<em>",
            (Emphasis::Strong, _) => "<strong>",
            (Emphasis::SmallCaps, Format::Html) => "<span class=\"smallcaps\">",
            (Emphasis::SmallCaps, _) => "<sc>",
        }
    }

    fn close(self, format: Format) -> &'static str {
        match (self, format) {
            (Emphasis::Em, _) => "</em>",
            (Emphasis::Strong, _) => "</strong>",
            (Emphasis::SmallCaps, Format::Html) => "</span>",
            (Emphasis::SmallCaps, _) => "</sc>",
        }
    }
}

/// An inline marker being collected.
struct OpenMark {
    kind: MarkKind,
    out: String,
    plain: String,
}

/// Per-paragraph inline output state.
#[derive(Default)]
struct Inline {
    out: String,
    plain: String,
    emphasis: Vec<Emphasis>,
    mark: Option<OpenMark>,
    // The open mark saw its end token; a directly following start of the
    // same kind continues it.
    mark_ended: bool,
    nested_marks: usize,
}

impl Inline {
    fn push(&mut self, s: &str) {
        match self.mark.as_mut() {
            Some(mark) => mark.out.push_str(s),
            None => self.out.push_str(s),
        }
    }

    fn push_plain(&mut self, s: &str) {
        if let Some(mark) = self.mark.as_mut() {
            mark.plain.push_str(s);
        }
        self.plain.push_str(s);
    }

    fn set_emphasis(&mut self, wanted: &[Emphasis], format: Format) {
        let common = self
            .emphasis
            .iter()
            .zip(wanted)
            .take_while(|(a, b)| a == b)
            .count();
        while self.emphasis.len() > common {
            if let Some(e) = self.emphasis.pop() {
                self.push(e.close(format));
            }
        }
        for e in &wanted[common..] {
            self.push(e.open(format));
            self.emphasis.push(*e);
        }
    }
}

/// Renders one case into a markup format.
///
/// Page-label state and footnote reference state live for one call only; the
/// renderer is consumed by [`render`](Self::render).
pub struct MarkupRenderer<'a> {
    config: RenderConfig<'a>,
    stats: RenderStats,
    last_label: Option<&'a str>,
    citation_index: usize,
    referenced: HashSet<String>,
    blockmap: Vec<(String, String)>,
}

impl<'a> MarkupRenderer<'a> {
    /// Create a new markup renderer.
    pub fn new(config: RenderConfig<'a>) -> Self {
        Self {
            config,
            stats: RenderStats::new(),
            last_label: None,
            citation_index: 0,
            referenced: HashSet::new(),
            blockmap: Vec::new(),
        }
    }

    /// Render a case.
    pub fn render(mut self, case: &Case) -> Result<String> {
        self.render_internal(case)
    }

    /// Render a case with statistics.
    pub fn render_with_stats(mut self, case: &Case) -> Result<RenderResult> {
        let content = self.render_internal(case)?;
        Ok(RenderResult::new(content, self.stats))
    }

    fn format(&self) -> Format {
        self.config.format
    }

    fn render_internal(&mut self, case: &Case) -> Result<String> {
        let mut out = String::new();
        match self.format() {
            Format::OriginalLayout => {
                return Err(Error::Render(
                    "layout output is rendered per page, not per case".to_string(),
                ))
            }
            Format::OriginalCanonical => {
                out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<case>\n");
                write_metadata(&mut out, &case.metadata);
                self.xml_casebody(&mut out, case, 1)?;
                self.write_blockmap(&mut out);
                out.push_str("</case>\n");
            }
            Format::EnrichedCanonical => self.xml_casebody(&mut out, case, 0)?,
            Format::Html => self.html_casebody(&mut out, case)?,
            Format::Text => self.text_case(&mut out, case)?,
        }

        log::debug!(
            "Rendered case {} as {}: {} paragraphs, {} skipped",
            case.id,
            self.format(),
            self.stats.paragraph_count,
            self.stats.skipped_count
        );
        Ok(out)
    }

    // ------------------------------------------------------------------
    // XML
    // ------------------------------------------------------------------

    fn xml_casebody(&mut self, out: &mut String, case: &Case, depth: usize) -> Result<()> {
        let mut body = String::new();
        for opinion in &case.opinions {
            if opinion.kind.is_head_matter() {
                self.xml_opinion_children(&mut body, opinion, depth + 1)?;
                continue;
            }
            let mut children = String::new();
            self.xml_opinion_children(&mut children, opinion, depth + 2)?;
            let pad = indent(depth + 1);
            if children.is_empty() {
                let _ = writeln!(body, "{}<opinion type=\"{}\"/>", pad, opinion.kind.tag());
            } else {
                let _ = writeln!(body, "{}<opinion type=\"{}\">", pad, opinion.kind.tag());
                body.push_str(&children);
                let _ = writeln!(body, "{}</opinion>", pad);
            }
        }

        let pad = indent(depth);
        let _ = write!(
            out,
            "{}<casebody firstpage=\"{}\" lastpage=\"{}\"",
            pad,
            escape(&case.first_page),
            escape(&case.last_page)
        );
        if body.is_empty() {
            out.push_str("/>\n");
        } else {
            out.push_str(">\n");
            out.push_str(&body);
            let _ = writeln!(out, "{}</casebody>", pad);
        }
        Ok(())
    }

    fn xml_opinion_children(&mut self, out: &mut String, opinion: &Opinion, depth: usize) -> Result<()> {
        for paragraph in &opinion.paragraphs {
            self.xml_paragraph(out, paragraph, &opinion.footnotes, depth)?;
        }

        for footnote in &opinion.footnotes {
            if self.config.redacted && footnote.redacted {
                self.stats.add_skipped();
                continue;
            }
            let mut inner = String::new();
            for paragraph in &footnote.paragraphs {
                self.xml_paragraph(&mut inner, paragraph, &opinion.footnotes, depth + 1)?;
            }

            let pad = indent(depth);
            let _ = write!(out, "{}<footnote", pad);
            if let Some(label) = &footnote.label {
                let _ = write!(out, " label=\"{}\"", escape(label));
            }
            if footnote.orphan {
                out.push_str(" orphan=\"true\"");
            }
            if footnote.redacted {
                out.push_str(" redact=\"true\"");
            }
            if inner.is_empty() {
                out.push_str("/>\n");
            } else {
                out.push_str(">\n");
                out.push_str(&inner);
                let _ = writeln!(out, "{}</footnote>", pad);
            }
            self.stats.add_footnote();
        }
        Ok(())
    }

    fn xml_paragraph(
        &mut self,
        out: &mut String,
        paragraph: &Paragraph,
        footnotes: &[Footnote],
        depth: usize,
    ) -> Result<()> {
        let Some(inline) = self.paragraph_inline(paragraph, footnotes)? else {
            return Ok(());
        };
        let tag = paragraph.kind.tag();
        let _ = write!(out, "{}<{} id=\"{}\"", indent(depth), tag, escape(&paragraph.id));
        if paragraph.redacted {
            out.push_str(" redact=\"true\"");
        }
        let _ = writeln!(out, ">{}</{}>", inline.out, tag);

        self.blockmap
            .push((paragraph.id.clone(), paragraph.block_ids.join(" ")));
        Ok(())
    }

    fn write_blockmap(&self, out: &mut String) {
        if self.blockmap.is_empty() {
            out.push_str("  <blockmap/>\n");
            return;
        }
        out.push_str("  <blockmap>\n");
        for (id, blocks) in &self.blockmap {
            let _ = writeln!(
                out,
                "    <par id=\"{}\" blocks=\"{}\"/>",
                escape(id),
                escape(blocks)
            );
        }
        out.push_str("  </blockmap>\n");
    }

    // ------------------------------------------------------------------
    // HTML
    // ------------------------------------------------------------------

    fn html_casebody(&mut self, out: &mut String, case: &Case) -> Result<()> {
        let _ = writeln!(
            out,
            "<section class=\"casebody\" data-case-id=\"{}\" data-firstpage=\"{}\" data-lastpage=\"{}\">",
            escape(&case.id),
            escape(&case.first_page),
            escape(&case.last_page)
        );
        for opinion in &case.opinions {
            let mut children = String::new();
            self.html_opinion_children(&mut children, opinion)?;
            if opinion.kind.is_head_matter() {
                if !children.is_empty() {
                    out.push_str("  <section class=\"head-matter\">\n");
                    out.push_str(&children);
                    out.push_str("  </section>\n");
                }
            } else {
                let _ = writeln!(
                    out,
                    "  <article class=\"opinion\" data-type=\"{}\">",
                    opinion.kind.tag()
                );
                out.push_str(&children);
                out.push_str("  </article>\n");
            }
        }
        out.push_str("</section>\n");
        Ok(())
    }

    fn html_opinion_children(&mut self, out: &mut String, opinion: &Opinion) -> Result<()> {
        for paragraph in &opinion.paragraphs {
            self.html_paragraph(out, paragraph, &opinion.footnotes, 2)?;
        }

        for footnote in &opinion.footnotes {
            if self.config.redacted && footnote.redacted {
                self.stats.add_skipped();
                continue;
            }
            let _ = write!(out, "    <aside class=\"footnote\" id=\"{}\"", escape(&footnote.id));
            if let Some(label) = &footnote.label {
                let _ = write!(out, " data-label=\"{}\"", escape(label));
            }
            if footnote.orphan {
                out.push_str(" data-orphan=\"true\"");
            }
            out.push_str(">\n");
            for paragraph in &footnote.paragraphs {
                self.html_paragraph(out, paragraph, &opinion.footnotes, 3)?;
            }
            out.push_str("    </aside>\n");
            self.stats.add_footnote();
        }
        Ok(())
    }

    fn html_paragraph(
        &mut self,
        out: &mut String,
        paragraph: &Paragraph,
        footnotes: &[Footnote],
        depth: usize,
    ) -> Result<()> {
        let Some(inline) = self.paragraph_inline(paragraph, footnotes)? else {
            return Ok(());
        };
        let tag = paragraph.kind.html_tag();
        let _ = write!(out, "{}<{}", indent(depth), tag);
        if let Some(class) = paragraph.kind.html_class() {
            let _ = write!(out, " class=\"{}\"", class);
        }
        let _ = writeln!(out, " id=\"{}\">{}</{}>", escape(&paragraph.id), inline.out, tag);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    fn text_case(&mut self, out: &mut String, case: &Case) -> Result<()> {
        let mut sections = Vec::new();
        for opinion in &case.opinions {
            let mut lines = Vec::new();
            for paragraph in &opinion.paragraphs {
                self.text_paragraph(&mut lines, paragraph, &opinion.footnotes)?;
            }
            for footnote in &opinion.footnotes {
                if self.config.redacted && footnote.redacted {
                    self.stats.add_skipped();
                    continue;
                }
                for paragraph in &footnote.paragraphs {
                    self.text_paragraph(&mut lines, paragraph, &opinion.footnotes)?;
                }
                self.stats.add_footnote();
            }
            if !lines.is_empty() {
                sections.push(lines.join("\n"));
            }
        }

        out.push_str(&sections.join("\n\n"));
        if !out.is_empty() {
            out.push('\n');
        }
        Ok(())
    }

    fn text_paragraph(
        &mut self,
        lines: &mut Vec<String>,
        paragraph: &Paragraph,
        footnotes: &[Footnote],
    ) -> Result<()> {
        if let Some(inline) = self.paragraph_inline(paragraph, footnotes)? {
            let line = inline.plain.split_whitespace().collect::<Vec<_>>().join(" ");
            if !line.is_empty() {
                lines.push(line);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Paragraph content
    // ------------------------------------------------------------------

    /// Render the inline content of a paragraph, or `None` when it is left
    /// out in redacted mode.
    fn paragraph_inline(&mut self, paragraph: &Paragraph, footnotes: &[Footnote]) -> Result<Option<Inline>> {
        if self.config.redacted && paragraph.redacted {
            self.stats.add_skipped();
            return Ok(None);
        }

        let mut inline = Inline::default();
        for block_id in &paragraph.block_ids {
            let block = self.config.index.resolve(block_id)?;
            if self.config.redacted && block.redacted {
                self.stats.add_skipped();
                continue;
            }
            self.page_marker(&mut inline, block_id, footnotes);
            if block.is_illustration() {
                self.illustration(&mut inline, block, footnotes);
            } else {
                self.block_content(&mut inline, block, footnotes)?;
            }
        }
        self.finish_mark(&mut inline, footnotes);
        inline.set_emphasis(&[], self.format());

        self.stats.add_paragraph();
        self.stats.count_text(&inline.plain);
        Ok(Some(inline))
    }

    fn page_marker(&mut self, inline: &mut Inline, block_id: &str, footnotes: &[Footnote]) {
        let Some(label) = self.config.index.page_label(block_id) else {
            return;
        };
        let previous = self.last_label.replace(label);
        if !self.format().is_enriched() || previous.map_or(true, |p| p == label) {
            return;
        }

        self.flush_mark(inline, footnotes);
        inline.set_emphasis(&[], self.format());
        self.citation_index += 1;
        let marker = if self.format() == Format::Html {
            format!(
                "<a class=\"page-label\" data-citation-index=\"{}\" data-label=\"{}\">*{}</a> ",
                self.citation_index,
                escape(label),
                partial_escape(label)
            )
        } else {
            format!(
                "<page-number citation-index=\"{}\" label=\"{}\">*{}</page-number> ",
                self.citation_index,
                escape(label),
                partial_escape(label)
            )
        };
        inline.push(&marker);
        inline.push_plain(&format!("*{} ", label));
        self.stats.add_page_label();
    }

    fn illustration(&mut self, inline: &mut Inline, block: &Block, footnotes: &[Footnote]) {
        self.flush_mark(inline, footnotes);
        inline.set_emphasis(&[], self.format());
        match self.format() {
            Format::Html => {
                let tag = match (&block.image_data, block.image_mime_type()) {
                    (Some(data), mime) => format!(
                        "<img class=\"illustration\" src=\"data:{};base64,{}\"/>",
                        mime.unwrap_or("application/octet-stream"),
                        STANDARD.encode(data)
                    ),
                    (None, _) => format!(
                        "<img class=\"illustration\" data-block=\"{}\"/>",
                        escape(&block.id)
                    ),
                };
                inline.push(&tag);
            }
            Format::Text => {
                if !inline.plain.is_empty() && !inline.plain.ends_with(char::is_whitespace) {
                    inline.push_plain(" ");
                }
                inline.push_plain("[[Image here]]");
            }
            _ => inline.push(&format!("<img block=\"{}\"/>", escape(&block.id))),
        }
        self.stats.add_illustration();
    }

    fn block_content(&mut self, inline: &mut Inline, block: &Block, footnotes: &[Footnote]) -> Result<()> {
        let mut fonts: Vec<FontId> = Vec::new();
        let mut redact_depth = 0usize;

        for token in block.tokens() {
            match token {
                Token::FontStart(id) => fonts.push(*id),
                Token::FontEnd => {
                    fonts.pop();
                }
                Token::RedactStart => redact_depth += 1,
                Token::RedactEnd => redact_depth = redact_depth.saturating_sub(1),
                Token::MarkStart(kind) => self.open_mark(inline, *kind, footnotes),
                Token::MarkEnd => self.end_mark(inline),
                Token::Text(text) => {
                    if text.is_empty() || (self.config.redacted && redact_depth > 0) {
                        continue;
                    }
                    let emphasis = match fonts.last() {
                        Some(id) if self.format().is_enriched() => self.emphasis(*id)?,
                        _ => Vec::new(),
                    };
                    self.flush_mark(inline, footnotes);
                    inline.set_emphasis(&emphasis, self.format());
                    if self.format() != Format::Text {
                        inline.push(&partial_escape(text));
                    }
                    inline.push_plain(text);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn emphasis(&self, id: FontId) -> Result<Vec<Emphasis>> {
        let font = self.config.fonts.resolve(id)?;
        Ok(EMPHASIS_TABLE
            .iter()
            .filter(|(prefix, _)| font.style_keywords().any(|k| k.starts_with(prefix)))
            .map(|(_, e)| *e)
            .collect())
    }

    // ------------------------------------------------------------------
    // Inline markers
    // ------------------------------------------------------------------

    fn open_mark(&mut self, inline: &mut Inline, kind: MarkKind, footnotes: &[Footnote]) {
        if let Some(mark) = &inline.mark {
            if !inline.mark_ended {
                inline.nested_marks += 1;
                return;
            }
            if mark.kind == kind {
                inline.mark_ended = false;
                return;
            }
            self.flush_mark(inline, footnotes);
        }
        inline.set_emphasis(&[], self.format());
        inline.mark = Some(OpenMark {
            kind,
            out: String::new(),
            plain: String::new(),
        });
    }

    fn end_mark(&mut self, inline: &mut Inline) {
        if inline.nested_marks > 0 {
            inline.nested_marks -= 1;
            return;
        }
        if inline.mark.is_some() {
            inline.set_emphasis(&[], self.format());
            inline.mark_ended = true;
        }
    }

    /// Write out a marker whose end was seen; an open marker keeps collecting.
    fn flush_mark(&mut self, inline: &mut Inline, footnotes: &[Footnote]) {
        if inline.mark_ended {
            self.finish_mark(inline, footnotes);
        }
    }

    fn finish_mark(&mut self, inline: &mut Inline, footnotes: &[Footnote]) {
        if inline.mark.is_some() {
            inline.set_emphasis(&[], self.format());
        }
        let Some(mark) = inline.mark.take() else {
            return;
        };
        inline.mark_ended = false;
        inline.nested_marks = 0;

        let rendered = match (self.format(), mark.kind) {
            (Format::Text, _) => String::new(),
            (Format::Html, MarkKind::FootnoteMark) => {
                match self.footnote_target(footnotes, mark.plain.trim()) {
                    Some(id) => {
                        let anchor = if self.referenced.insert(id.to_string()) {
                            format!(" id=\"ref_{}\"", escape(id))
                        } else {
                            String::new()
                        };
                        format!(
                            "<sup class=\"footnotemark\"><a href=\"#{}\"{}>{}</a></sup>",
                            escape(id),
                            anchor,
                            mark.out
                        )
                    }
                    None => format!("<sup class=\"footnotemark\">{}</sup>", mark.out),
                }
            }
            (Format::Html, MarkKind::BracketNum) => {
                format!("<span class=\"bracketnum\">{}</span>", mark.out)
            }
            (_, kind) => format!("<{0}>{1}</{0}>", kind.tag(), mark.out),
        };
        inline.out.push_str(&rendered);
        self.stats.add_marker();
    }

    fn footnote_target<'f>(&self, footnotes: &'f [Footnote], label: &str) -> Option<&'f str> {
        footnotes
            .iter()
            .filter(|f| !(self.config.redacted && f.redacted))
            .find(|f| f.label.as_deref() == Some(label))
            .map(|f| f.id.as_str())
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

fn write_metadata(out: &mut String, meta: &CaseMetadata) {
    if !meta.court.name.is_empty() || meta.court.abbreviation.is_some() {
        out.push_str("  <court");
        if let Some(abbr) = &meta.court.abbreviation {
            let _ = write!(out, " abbreviation=\"{}\"", escape(abbr));
        }
        let _ = writeln!(out, ">{}</court>", partial_escape(&meta.court.name));
    }
    if let Some(district) = &meta.district {
        let _ = writeln!(out, "  <district>{}</district>", partial_escape(district));
    }
    if !meta.name.is_empty() || meta.name_abbreviation.is_some() {
        out.push_str("  <name");
        if let Some(abbr) = &meta.name_abbreviation {
            let _ = write!(out, " abbreviation=\"{}\"", escape(abbr));
        }
        let _ = writeln!(out, ">{}</name>", partial_escape(&meta.name));
    }
    for docket in &meta.docket_numbers {
        let _ = writeln!(out, "  <docketnumber>{}</docketnumber>", partial_escape(docket));
    }
    for citation in &meta.citations {
        out.push_str("  <citation");
        if let Some(category) = &citation.category {
            let _ = write!(out, " category=\"{}\"", escape(category));
        }
        if let Some(kind) = &citation.kind {
            let _ = write!(out, " type=\"{}\"", escape(kind));
        }
        let _ = writeln!(out, ">{}</citation>", partial_escape(&citation.text));
    }
    if let Some(date) = &meta.decision_date {
        let _ = writeln!(out, "  <decisiondate>{}</decisiondate>", partial_escape(date));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Font, FontRegistry, OpinionKind, Page, ParagraphKind, Rect, VolumeIndex};

    fn words(block: &str, font: FontId, words: &[&str]) -> Block {
        let rect = Rect::new(0, 0, 10, 10);
        let mut tokens = vec![Token::LineStart(rect), Token::FontStart(font)];
        for (i, word) in words.iter().enumerate() {
            if i > 0 {
                tokens.push(Token::text(" "));
            }
            tokens.push(Token::text(*word));
        }
        tokens.push(Token::FontEnd);
        tokens.push(Token::LineEnd);
        Block::text_block(block, rect, "p", tokens).unwrap()
    }

    fn volume(fonts: &mut FontRegistry) -> (Vec<Page>, Case) {
        let roman = fonts.intern(Font::new("Times", "9.00"));
        let italic = fonts.intern(Font::new("Times", "9.00").with_style("italics"));

        let mut first = Page::new("page_1", 1, "12");
        first.add_block(words("BL_1.1", roman, &["Doe", "v.", "Roe"]));
        let mut marked = words("BL_1.2", roman, &["It", "is", "so.1"]);
        if let Some(tokens) = marked.tokens.as_mut() {
            let end = tokens.len() - 2;
            tokens[end - 1] = Token::text("so.");
            tokens.insert(end, Token::MarkEnd);
            tokens.insert(end, Token::text("1"));
            tokens.insert(end, Token::MarkStart(MarkKind::FootnoteMark));
        }
        first.add_block(marked);

        let mut second = Page::new("page_2", 2, "13");
        second.add_block(words("BL_2.1", italic, &["Affirmed."]));
        second.add_block(words("BL_2.2", roman, &["A", "note."]));

        let mut case = Case::new("case_1");
        case.first_page = "12".to_string();
        case.last_page = "13".to_string();
        case.opinions[0]
            .paragraphs
            .push(Paragraph::new("b12-1", ParagraphKind::Parties, vec!["BL_1.1".to_string()]));
        let mut majority = Opinion::new(OpinionKind::Majority);
        majority.paragraphs.push(Paragraph::new(
            "b12-2",
            ParagraphKind::P,
            vec!["BL_1.2".to_string(), "BL_2.1".to_string()],
        ));
        majority.footnotes.push(Footnote {
            id: Footnote::make_id(1, 1),
            label: Some("1".to_string()),
            orphan: false,
            redacted: false,
            paragraphs: vec![Paragraph::new("b13-1", ParagraphKind::P, vec!["BL_2.2".to_string()])],
        });
        case.opinions.push(majority);

        (vec![first, second], case)
    }

    fn render(format: Format, redacted: bool, pages: &[Page], case: &Case, fonts: &FontRegistry) -> String {
        let index = VolumeIndex::new(pages).unwrap();
        let config = RenderConfig::new(&index, fonts)
            .with_format(format)
            .with_redacted(redacted);
        to_markup(case, &config).unwrap()
    }

    #[test]
    fn test_canonical_has_no_emphasis_or_page_numbers() {
        let mut fonts = FontRegistry::new();
        let (pages, case) = volume(&mut fonts);
        let out = render(Format::OriginalCanonical, false, &pages, &case, &fonts);

        assert!(out.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<case>\n"));
        assert!(out.contains("<p id=\"b12-2\">It is so.<footnotemark>1</footnotemark>Affirmed.</p>"));
        assert!(out.contains("<par id=\"b12-2\" blocks=\"BL_1.2 BL_2.1\"/>"));
        assert!(!out.contains("<em>"));
        assert!(!out.contains("page-number"));
    }

    #[test]
    fn test_enriched_page_numbers_and_emphasis() {
        let mut fonts = FontRegistry::new();
        let (pages, case) = volume(&mut fonts);
        let out = render(Format::EnrichedCanonical, false, &pages, &case, &fonts);

        assert!(out.starts_with("<casebody firstpage=\"12\" lastpage=\"13\">"));
        assert!(out.contains(
            "<page-number citation-index=\"1\" label=\"13\">*13</page-number> <em>Affirmed.</em>"
        ));
        // The footnote block is on the same page as the previous block
        assert_eq!(out.matches("page-number citation-index").count(), 1);
    }

    #[test]
    fn test_html_footnote_links() {
        let mut fonts = FontRegistry::new();
        let (pages, case) = volume(&mut fonts);
        let out = render(Format::Html, false, &pages, &case, &fonts);

        assert!(out.contains(
            "<sup class=\"footnotemark\"><a href=\"#footnote_1_1\" id=\"ref_footnote_1_1\">1</a></sup>"
        ));
        assert!(out.contains("<aside class=\"footnote\" id=\"footnote_1_1\" data-label=\"1\">"));
        assert!(out.contains("<p class=\"parties\" id=\"b12-1\">Doe v. Roe</p>"));
        assert!(out.contains("<a class=\"page-label\" data-citation-index=\"1\" data-label=\"13\">*13</a> "));
    }

    #[test]
    fn test_text_output() {
        let mut fonts = FontRegistry::new();
        let (pages, case) = volume(&mut fonts);
        let out = render(Format::Text, false, &pages, &case, &fonts);
        assert_eq!(out, "Doe v. Roe\n\nIt is so.1Affirmed.\nA note.\n");
    }

    #[test]
    fn test_redacted_paragraph_is_skipped() {
        let mut fonts = FontRegistry::new();
        let (pages, mut case) = volume(&mut fonts);
        case.opinions[0].paragraphs[0].redacted = true;

        let index = VolumeIndex::new(&pages).unwrap();
        let config = RenderConfig::new(&index, &fonts)
            .with_format(Format::Html)
            .with_redacted(true);
        let result = to_markup_with_stats(&case, &config).unwrap();
        assert!(!result.content.contains("Doe v. Roe"));
        assert!(!result.content.contains("head-matter"));
        assert_eq!(result.stats.skipped_count, 1);
        assert_eq!(result.stats.paragraph_count, 2);
    }

    #[test]
    fn test_layout_format_is_rejected() {
        let mut fonts = FontRegistry::new();
        let (pages, case) = volume(&mut fonts);
        let index = VolumeIndex::new(&pages).unwrap();
        let config = RenderConfig::new(&index, &fonts);
        assert!(matches!(to_markup(&case, &config), Err(Error::Render(_))));
    }
}

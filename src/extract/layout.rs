//! Layout document → [`Page`].

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::model::{Block, Font, FontId, FontRegistry, OcrSpan, Page, Rect, StyleRef, Token};
use crate::xml::Element;

pub(super) fn extract_page(root: &Element, fonts: &mut FontRegistry) -> Result<Page> {
    if root.name != "alto" {
        return Err(Error::Malformed(format!(
            "expected <alto> root, found <{}>",
            root.name
        )));
    }

    let page_el = root
        .child("Layout")
        .and_then(|layout| layout.child("Page"))
        .ok_or_else(|| Error::Malformed("layout document has no <Page>".to_string()))?;

    let mut page = Page::new(
        page_el.require("ID")?,
        page_el.parse_attr("PHYSICAL_IMG_NR")?,
        page_el.require("PRINTED_IMG_NR")?,
    )
    .with_size(page_el.parse_attr("WIDTH")?, page_el.parse_attr("HEIGHT")?);

    if page_el.attr("DESKEW").is_some() {
        page.deskew = page_el.parse_attr("DESKEW")?;
    }
    if let Some(file_name) = root.find("fileName") {
        page.image_ref = file_name.text().trim().to_string();
    }

    let styles = read_styles(root, fonts, &mut page)?;
    let tags = read_tags(root)?;

    for (space, space_el) in page_el.children_named("PrintSpace").enumerate() {
        page.spaces.push(rect_of(space_el)?);
        for el in space_el.elements() {
            let block = match el.name.as_str() {
                "TextBlock" => text_block(el, &styles, &tags)?,
                "Illustration" => {
                    Block::illustration(el.require("ID")?, rect_of(el)?, class_of(el, &tags)?)
                }
                other => {
                    return Err(Error::Malformed(format!(
                        "unexpected <{}> in print space of page {}",
                        other, page.id
                    )))
                }
            };
            page.add_block(block.with_space(space));
        }
    }

    log::debug!(
        "Extracted page {} (label {}): {} blocks, {} styles",
        page.id,
        page.label,
        page.blocks.len(),
        page.styles.len()
    );

    Ok(page)
}

fn read_styles(
    root: &Element,
    fonts: &mut FontRegistry,
    page: &mut Page,
) -> Result<HashMap<String, FontId>> {
    let mut styles = HashMap::new();
    let Some(styles_el) = root.child("Styles") else {
        return Ok(styles);
    };

    for style in styles_el.children_named("TextStyle") {
        let id = style.require("ID")?.to_string();
        let font = Font::new(style.require("FONTFAMILY")?, style.require("FONTSIZE")?)
            .with_style(style.attr("FONTSTYLE").unwrap_or_default())
            .with_kind(style.attr("FONTTYPE").unwrap_or_default())
            .with_width(style.attr("FONTWIDTH").unwrap_or_default());
        let font_id = fonts.intern(font);

        if let Some(existing) = page.style_id(font_id) {
            return Err(Error::Malformed(format!(
                "style {} duplicates style {} on page {}",
                id, existing, page.id
            )));
        }
        if styles.insert(id.clone(), font_id).is_some() {
            return Err(Error::Malformed(format!("duplicate style id {}", id)));
        }
        page.styles.push(StyleRef { id, font: font_id });
    }

    Ok(styles)
}

fn read_tags(root: &Element) -> Result<HashMap<String, String>> {
    let mut tags = HashMap::new();
    if let Some(tags_el) = root.child("Tags") {
        for tag in tags_el.children_named("StructureTag") {
            tags.insert(
                tag.require("ID")?.to_string(),
                tag.require("LABEL")?.to_string(),
            );
        }
    }
    Ok(tags)
}

fn rect_of(el: &Element) -> Result<Rect> {
    Ok(Rect::new(
        el.parse_attr("HPOS")?,
        el.parse_attr("VPOS")?,
        el.parse_attr("WIDTH")?,
        el.parse_attr("HEIGHT")?,
    ))
}

fn class_of(el: &Element, tags: &HashMap<String, String>) -> Result<String> {
    let tag_ref = el.require("TAGREFS")?;
    tags.get(tag_ref)
        .cloned()
        .ok_or_else(|| Error::MissingReference(format!("structure tag {}", tag_ref)))
}

fn text_block(
    el: &Element,
    styles: &HashMap<String, FontId>,
    tags: &HashMap<String, String>,
) -> Result<Block> {
    let mut tokens = Vec::new();
    let mut joined = true;

    for line in el.elements() {
        if line.name != "TextLine" {
            return Err(Error::Malformed(format!(
                "unexpected <{}> in text block {}",
                line.name,
                el.attr("ID").unwrap_or("?")
            )));
        }
        if !joined {
            tokens.push(Token::text(" "));
        }
        joined = line_tokens(line, styles, &mut tokens)?;
    }

    Block::text_block(el.require("ID")?, rect_of(el)?, class_of(el, tags)?, tokens)
}

/// Append the tokens of one line. Returns true when the line ends in a hyphen,
/// in which case no separator follows it.
fn line_tokens(
    line: &Element,
    styles: &HashMap<String, FontId>,
    tokens: &mut Vec<Token>,
) -> Result<bool> {
    tokens.push(Token::LineStart(rect_of(line)?));

    let mut current: Option<FontId> = None;
    let mut first = true;
    let mut last_content = String::new();

    for string in line.elements() {
        if string.name != "String" {
            return Err(Error::Malformed(format!(
                "unexpected <{}> in text line",
                string.name
            )));
        }

        let font = match string.attr("STYLEREFS") {
            Some(style) => Some(
                *styles
                    .get(style)
                    .ok_or_else(|| Error::MissingReference(format!("style {}", style)))?,
            ),
            None => None,
        };

        if first || font != current {
            if current.is_some() {
                tokens.push(Token::FontEnd);
            }
            if !first {
                tokens.push(Token::text(" "));
            }
            if let Some(id) = font {
                tokens.push(Token::FontStart(id));
            }
            current = font;
        } else {
            tokens.push(Token::text(" "));
        }
        first = false;

        let mut span = OcrSpan::new(rect_of(string)?, string.parse_attr("WC")?);
        if let Some(cc) = string.attr("CC") {
            span = span.with_char_confidence(cc);
        }
        let content = string.require("CONTENT")?;

        tokens.push(Token::OcrStart(span));
        tokens.push(Token::text(content));
        tokens.push(Token::OcrEnd);
        last_content = content.to_string();
    }

    if current.is_some() {
        tokens.push(Token::FontEnd);
    }
    tokens.push(Token::LineEnd);

    Ok(last_content.ends_with('-'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::current_text;
    use crate::xml;

    const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<alto xmlns="http://www.loc.gov/standards/alto/ns-v3#">
  <Description>
    <sourceImageInformation>
      <fileName>32044057891608_0012.tif</fileName>
    </sourceImageInformation>
  </Description>
  <Styles>
    <TextStyle ID="Style_1" FONTFAMILY="Times" FONTSIZE="9.00" FONTTYPE="serif"/>
    <TextStyle ID="Style_2" FONTFAMILY="Times" FONTSIZE="9.00" FONTSTYLE="italics" FONTTYPE="serif"/>
  </Styles>
  <Tags>
    <StructureTag ID="BL_12.1" TYPE="structural" LABEL="p"/>
  </Tags>
  <Layout>
    <Page ID="page_12" PHYSICAL_IMG_NR="12" PRINTED_IMG_NR="7" WIDTH="2000" HEIGHT="3000" DESKEW="0.00" PC="0.90">
      <PrintSpace HPOS="0" VPOS="0" WIDTH="2000" HEIGHT="3000">
        <TextBlock ID="BL_12.1" HPOS="10" VPOS="10" WIDTH="500" HEIGHT="60" TAGREFS="BL_12.1">
          <TextLine HPOS="10" VPOS="10" WIDTH="500" HEIGHT="30">
            <String HPOS="10" VPOS="10" WIDTH="50" HEIGHT="30" CONTENT="The" WC="1.00" CC="000" STYLEREFS="Style_1"/>
            <String HPOS="70" VPOS="10" WIDTH="50" HEIGHT="30" CONTENT="court" WC="0.80" CC="00500" STYLEREFS="Style_1"/>
            <String HPOS="130" VPOS="10" WIDTH="90" HEIGHT="30" CONTENT="pro-" WC="0.90" CC="0000" STYLEREFS="Style_2"/>
          </TextLine>
          <TextLine HPOS="10" VPOS="40" WIDTH="500" HEIGHT="30">
            <String HPOS="10" VPOS="40" WIDTH="50" HEIGHT="30" CONTENT="ceeded." WC="0.90" CC="0000000"/>
          </TextLine>
        </TextBlock>
      </PrintSpace>
    </Page>
  </Layout>
</alto>
"#;

    #[test]
    fn test_extract_page_structure() {
        let mut fonts = FontRegistry::new();
        let root = xml::parse(PAGE).unwrap();
        let page = extract_page(&root, &mut fonts).unwrap();

        assert_eq!(page.id, "page_12");
        assert_eq!(page.order, 12);
        assert_eq!(page.label, "7");
        assert_eq!(page.image_ref, "32044057891608_0012.tif");
        assert_eq!(page.spaces.len(), 1);
        assert_eq!(page.styles.len(), 2);
        assert_eq!(fonts.len(), 2);

        let block = &page.blocks[0];
        assert_eq!(block.class, "p");
        assert_eq!(current_text(block.tokens()), "The court pro-ceeded.");
    }

    #[test]
    fn test_font_grouping_and_separators() {
        let mut fonts = FontRegistry::new();
        let root = xml::parse(PAGE).unwrap();
        let page = extract_page(&root, &mut fonts).unwrap();
        let tokens = page.blocks[0].tokens();

        let font_starts = tokens
            .iter()
            .filter(|t| matches!(t, Token::FontStart(_)))
            .count();
        assert_eq!(font_starts, 2);

        // The hyphenated line is not followed by a separator
        let line_end = tokens.iter().position(|t| *t == Token::LineEnd).unwrap();
        assert!(matches!(tokens[line_end + 1], Token::LineStart(_)));
    }

    #[test]
    fn test_char_confidence_kept_verbatim() {
        let mut fonts = FontRegistry::new();
        let root = xml::parse(PAGE).unwrap();
        let page = extract_page(&root, &mut fonts).unwrap();

        let spans: Vec<&OcrSpan> = page.blocks[0]
            .tokens()
            .iter()
            .filter_map(|t| match t {
                Token::OcrStart(span) => Some(span),
                _ => None,
            })
            .collect();
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[1].char_confidence.as_deref(), Some("00500"));
        assert!((spans[1].word_confidence - 0.8).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unknown_style_reference() {
        let raw = PAGE.replace("STYLEREFS=\"Style_2\"", "STYLEREFS=\"Style_9\"");
        let mut fonts = FontRegistry::new();
        let root = xml::parse(&raw).unwrap();
        assert!(matches!(
            extract_page(&root, &mut fonts),
            Err(Error::MissingReference(_))
        ));
    }

    #[test]
    fn test_unknown_structure_tag() {
        let raw = PAGE.replace("TAGREFS=\"BL_12.1\"", "TAGREFS=\"TAG_9\"");
        let mut fonts = FontRegistry::new();
        let root = xml::parse(&raw).unwrap();
        assert!(matches!(
            extract_page(&root, &mut fonts),
            Err(Error::MissingReference(_))
        ));
    }

    #[test]
    fn test_duplicate_style_descriptor() {
        let raw = PAGE.replace(" FONTSTYLE=\"italics\"", "");
        let mut fonts = FontRegistry::new();
        let root = xml::parse(&raw).unwrap();
        assert!(matches!(
            extract_page(&root, &mut fonts),
            Err(Error::Malformed(_))
        ));
    }
}

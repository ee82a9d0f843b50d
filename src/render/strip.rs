//! Paragraph text extraction from rendered output.

use super::Format;
use crate::error::{Error, Result};
use crate::model::ParagraphKind;
use crate::xml::{self, Element, Node};

/// Extract the ordered, whitespace-normalized paragraph texts of a rendering.
///
/// Markup is stripped; page-number markers and footnote marks keep their text.
/// Enriched XML and HTML renderings of the same case yield identical lists.
pub fn paragraph_texts(rendered: &str, format: Format) -> Result<Vec<String>> {
    match format {
        Format::OriginalLayout => Err(Error::Render(
            "layout output has no paragraphs".to_string(),
        )),
        Format::Text => Ok(rendered
            .lines()
            .map(normalize)
            .filter(|line| !line.is_empty())
            .collect()),
        Format::OriginalCanonical | Format::EnrichedCanonical => {
            let root = xml::parse(rendered)?;
            let scope = if root.name == "casebody" {
                &root
            } else {
                root.find("casebody").unwrap_or(&root)
            };
            let mut texts = Vec::new();
            collect(scope, &|name| ParagraphKind::from_tag(name).is_some(), &mut texts);
            Ok(texts)
        }
        Format::Html => {
            let root = xml::parse(rendered)?;
            let mut texts = Vec::new();
            collect(&root, &|name| name == "p" || name == "blockquote", &mut texts);
            Ok(texts)
        }
    }
}

fn collect(el: &Element, is_paragraph: &dyn Fn(&str) -> bool, out: &mut Vec<String>) {
    for node in &el.children {
        if let Node::Element(child) = node {
            if is_paragraph(&child.name) {
                out.push(normalize(&child.text()));
            } else {
                collect(child, is_paragraph, out);
            }
        }
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

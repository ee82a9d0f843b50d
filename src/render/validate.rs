//! Round-trip validation of renderings against their source documents.

use regex::Regex;

use super::layout::to_layout;
use super::markup::to_markup;
use super::{Format, RenderConfig};
use crate::error::{Error, Result};
use crate::model::{Case, Page};
use crate::xml::{self, Element, Node};

/// Check that a page renders back to its source layout document.
///
/// Two normalisations are applied to the source first: a word confidence of
/// `1` or `1.0` is written `1.00`, and an empty character confidence is
/// written `0`.
pub fn validate_page(page: &Page, source: &str, config: &RenderConfig<'_>) -> Result<()> {
    let rendered = to_layout(page, &config.with_format(Format::OriginalLayout))?;
    let expected = normalize_layout(source)?;

    let mut expected_lines = expected.lines();
    let mut rendered_lines = rendered.lines();
    let mut line = 0;
    loop {
        line += 1;
        match (expected_lines.next(), rendered_lines.next()) {
            (None, None) => break,
            (a, b) if a == b => continue,
            (a, b) => {
                return Err(Error::ValidationMismatch(format!(
                    "page {} line {}: expected {:?}, rendered {:?}",
                    page.id,
                    line,
                    a.map(str::trim).unwrap_or("<end of document>"),
                    b.map(str::trim).unwrap_or("<end of document>")
                )))
            }
        }
    }

    log::debug!("Validated page {} ({} lines)", page.id, line - 1);
    Ok(())
}

fn normalize_layout(source: &str) -> Result<String> {
    let wc = Regex::new(r#"WC="1(?:\.0)?""#).map_err(|e| Error::Render(e.to_string()))?;
    let cc = Regex::new(r#"CC="""#).map_err(|e| Error::Render(e.to_string()))?;
    let source = wc.replace_all(source, r#"WC="1.00""#);
    Ok(cc.replace_all(&source, r#"CC="0""#).into_owned())
}

/// Check that a case renders back to its source canonical document.
///
/// Element trees are compared ignoring whitespace-only text and attribute
/// order.
pub fn validate_case(case: &Case, source: &str, config: &RenderConfig<'_>) -> Result<()> {
    let rendered = to_markup(case, &config.with_format(Format::OriginalCanonical))?;
    let expected = xml::parse(source)?;
    let actual = xml::parse(&rendered)?;

    compare(&expected, &actual, &expected.name)
        .map_err(|msg| Error::ValidationMismatch(format!("case {}: {}", case.id, msg)))?;

    log::debug!("Validated case {}", case.id);
    Ok(())
}

fn compare(expected: &Element, actual: &Element, path: &str) -> std::result::Result<(), String> {
    if expected.name != actual.name {
        return Err(format!(
            "{}: expected <{}>, rendered <{}>",
            path, expected.name, actual.name
        ));
    }

    let mut a = expected.attrs.clone();
    let mut b = actual.attrs.clone();
    a.sort();
    b.sort();
    if a != b {
        return Err(format!("{}: attributes {:?} rendered as {:?}", path, a, b));
    }

    let left: Vec<&Node> = expected.children.iter().filter(|n| !n.is_blank()).collect();
    let right: Vec<&Node> = actual.children.iter().filter(|n| !n.is_blank()).collect();

    for (i, pair) in left.iter().zip(&right).enumerate() {
        match pair {
            (Node::Element(x), Node::Element(y)) => {
                compare(x, y, &format!("{}/{}[{}]", path, x.name, i + 1))?
            }
            (Node::Text(x), Node::Text(y)) if x == y => {}
            (x, y) => {
                return Err(format!(
                    "{} child {}: expected {}, rendered {}",
                    path,
                    i + 1,
                    describe(x),
                    describe(y)
                ))
            }
        }
    }

    if left.len() != right.len() {
        return Err(format!(
            "{}: expected {} children, rendered {}",
            path,
            left.len(),
            right.len()
        ));
    }
    Ok(())
}

fn describe(node: &Node) -> String {
    match node {
        Node::Element(el) => format!("<{}>", el.name),
        Node::Text(text) => format!("{:?}", text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_layout() {
        let source = r#"<String CONTENT="a" WC="1" CC=""/><String CONTENT="b" WC="1.0" CC="9"/><String WC="0.95" CC=""/>"#;
        let normalized = normalize_layout(source).unwrap();
        assert_eq!(
            normalized,
            r#"<String CONTENT="a" WC="1.00" CC="0"/><String CONTENT="b" WC="1.00" CC="9"/><String WC="0.95" CC="0"/>"#
        );
    }

    #[test]
    fn test_compare_ignores_whitespace_and_attribute_order() {
        let a = xml::parse("<a x=\"1\" y=\"2\">\n  <b>t</b>\n</a>").unwrap();
        let b = xml::parse("<a y=\"2\" x=\"1\"><b>t</b></a>").unwrap();
        assert!(compare(&a, &b, "a").is_ok());
    }

    #[test]
    fn test_compare_reports_path() {
        let a = xml::parse("<a><b>one</b><c><d/></c></a>").unwrap();
        let b = xml::parse("<a><b>one</b><c><e/></c></a>").unwrap();
        let err = compare(&a, &b, "a").unwrap_err();
        assert!(err.starts_with("a/c[2]"), "{}", err);
    }
}

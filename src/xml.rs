//! Minimal owned XML tree on top of `quick-xml`.
//!
//! Text nodes are kept verbatim, including whitespace-only runs; callers that
//! walk structure skip the latter with [`Node::is_blank`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};

/// An element with its attributes (in source order) and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
}

impl Node {
    /// Whitespace-only text node.
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = utf8(start.name().as_ref())?.to_string();
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr?;
            let key = utf8(attr.key.as_ref())?.to_string();
            let value = attr.unescape_value()?.into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
        })
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, failing with [`Error::Malformed`] when absent.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.attr(name).ok_or_else(|| {
            Error::Malformed(format!("<{}> is missing attribute {}", self.name, name))
        })
    }

    /// Attribute parsed as a number.
    pub fn parse_attr<T: std::str::FromStr>(&self, name: &str) -> Result<T> {
        let raw = self.require(name)?;
        raw.trim().parse().map_err(|_| {
            Error::Malformed(format!(
                "<{}> attribute {}={:?} is not a number",
                self.name, name, raw
            ))
        })
    }

    /// Child elements, in order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First child element with the given name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    /// Concatenated text of all descendants.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Depth-first search for the first descendant (or self) named `name`.
    pub fn find(&self, name: &str) -> Option<&Element> {
        if self.name == name {
            return Some(self);
        }
        self.elements().find_map(|e| e.find(name))
    }
}

/// Parse a document and return its root element.
pub(crate) fn parse(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(Element::from_start(&start)?),
            Event::Empty(start) => {
                let element = Element::from_start(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(end) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Malformed("unexpected closing tag".to_string()))?;
                if element.name.as_bytes() != end.name().as_ref() {
                    return Err(Error::Malformed(format!(
                        "<{}> closed by </{}>",
                        element.name,
                        String::from_utf8_lossy(end.name().as_ref())
                    )));
                }
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                let text = text.unescape()?.into_owned();
                push_text(&mut stack, text);
            }
            Event::CData(data) => {
                let text = utf8(&data)?.to_string();
                push_text(&mut stack, text);
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Malformed(format!("<{}> is never closed", open.name)));
    }
    root.ok_or_else(|| Error::Malformed("document has no root element".to_string()))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(Node::Element(element));
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(Error::Malformed("multiple root elements".to_string())),
    }
}

fn push_text(stack: &mut [Element], text: String) {
    // text outside the root element is whitespace in any well-formed document
    let Some(parent) = stack.last_mut() else {
        return;
    };
    if let Some(Node::Text(prev)) = parent.children.last_mut() {
        prev.push_str(&text);
    } else {
        parent.children.push(Node::Text(text));
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| Error::Malformed(format!("invalid UTF-8: {}", e)))
}

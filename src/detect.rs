//! Source document detection.

use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Kind of source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Per-page OCR layout document (`<alto>` root)
    Layout,
    /// Per-case canonical document (`<case>` root)
    Canonical,
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Layout => f.write_str("layout"),
            DocumentKind::Canonical => f.write_str("canonical"),
        }
    }
}

/// Bytes read from a file to find its root element.
const HEAD_LEN: u64 = 64 * 1024;

/// Detect the document kind of a file.
///
/// # Example
/// ```no_run
/// use casestream::detect::detect_format_from_path;
///
/// let kind = detect_format_from_path("page_0001.xml").unwrap();
/// println!("{}", kind);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<DocumentKind> {
    let file = File::open(path)?;
    let mut head = Vec::new();
    BufReader::new(file).take(HEAD_LEN).read_to_end(&mut head)?;
    detect_format_from_bytes(&head)
}

/// Detect the document kind from the start of a document.
///
/// Only the root element name is inspected; the rest of the data may be
/// truncated.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<DocumentKind> {
    let text = String::from_utf8_lossy(data);
    let mut reader = Reader::from_str(&text);

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) | Ok(Event::Empty(start)) => {
                let name = start.local_name();
                return match name.as_ref() {
                    b"alto" => Ok(DocumentKind::Layout),
                    b"case" => Ok(DocumentKind::Canonical),
                    _ => Err(Error::UnknownFormat),
                };
            }
            Ok(Event::Eof) | Err(_) => return Err(Error::UnknownFormat),
            // declaration, comments, doctype, whitespace
            Ok(_) => {}
        }
    }
}

/// Check if a file is a layout document.
pub fn is_layout<P: AsRef<Path>>(path: P) -> bool {
    matches!(detect_format_from_path(path), Ok(DocumentKind::Layout))
}

/// Check if a file is a canonical case document.
pub fn is_canonical<P: AsRef<Path>>(path: P) -> bool {
    matches!(detect_format_from_path(path), Ok(DocumentKind::Canonical))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_layout() {
        let data = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<alto xmlns=\"http://www.loc.gov/standards/alto/ns-v3#\">";
        assert_eq!(detect_format_from_bytes(data).unwrap(), DocumentKind::Layout);
    }

    #[test]
    fn test_detect_canonical() {
        let data = b"<!-- volume 1 -->\n<case>\n  <court>";
        assert_eq!(detect_format_from_bytes(data).unwrap(), DocumentKind::Canonical);
    }

    #[test]
    fn test_detect_unknown() {
        assert!(matches!(
            detect_format_from_bytes(b"<!DOCTYPE html><html>"),
            Err(Error::UnknownFormat)
        ));
        assert!(matches!(
            detect_format_from_bytes(b"%PDF-1.7"),
            Err(Error::UnknownFormat)
        ));
    }

    #[test]
    fn test_detect_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("case.xml");
        std::fs::write(&path, "<case/>").unwrap();
        assert!(is_canonical(&path));
        assert!(!is_layout(&path));
        assert!(!is_layout(dir.path().join("missing.xml")));
    }
}

//! Volume-scoped font registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

/// Opaque font identifier, unique within one volume.
///
/// Ids are dense and start at 1 in interning order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FontId(pub u32);

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A style descriptor as it appears in a layout document.
///
/// Every field is kept verbatim (e.g. a size of `"9.00"` stays a string) so
/// layout output can reproduce the source attribute values exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Font {
    /// Font family (e.g., "Times New Roman")
    pub family: String,

    /// Font size as written in the source
    pub size: String,

    /// Space-separated style keywords (e.g., "italics bold")
    pub style: String,

    /// Font type (e.g., "serif")
    pub kind: String,

    /// Font width (e.g., "proportional")
    pub width: String,
}

impl Font {
    /// Create a font with the given family and size.
    pub fn new(family: impl Into<String>, size: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            size: size.into(),
            ..Default::default()
        }
    }

    /// Set the style keywords.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Set the font type.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the font width.
    pub fn with_width(mut self, width: impl Into<String>) -> Self {
        self.width = width.into();
        self
    }

    /// Iterate over the individual style keywords.
    pub fn style_keywords(&self) -> impl Iterator<Item = &str> {
        self.style.split_whitespace()
    }

    /// Check if the font is italic.
    pub fn is_italic(&self) -> bool {
        self.style_keywords().any(|k| k.starts_with("italic"))
    }

    /// Check if the font is bold.
    pub fn is_bold(&self) -> bool {
        self.style_keywords().any(|k| k == "bold")
    }
}

/// Deduplicating table of fonts shared by every page of one volume.
///
/// The registry is an explicit value threaded through extraction by `&mut`;
/// two volumes never share one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "Vec<FontRecord>", try_from = "Vec<FontRecord>")]
pub struct FontRegistry {
    fonts: Vec<Font>,
    index: HashMap<Font, FontId>,
}

impl FontRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of `font`, allocating a new one if the exact descriptor
    /// has not been seen before.
    pub fn intern(&mut self, font: Font) -> FontId {
        if let Some(id) = self.index.get(&font) {
            return *id;
        }
        let id = FontId(self.fonts.len() as u32 + 1);
        self.fonts.push(font.clone());
        self.index.insert(font, id);
        id
    }

    /// Look up a font by id.
    pub fn get(&self, id: FontId) -> Option<&Font> {
        let slot = (id.0 as usize).checked_sub(1)?;
        self.fonts.get(slot)
    }

    /// Look up a font by id, failing with [`Error::MissingReference`].
    pub fn resolve(&self, id: FontId) -> Result<&Font> {
        self.get(id)
            .ok_or_else(|| Error::MissingReference(format!("font {}", id)))
    }

    /// Look up the id of an already interned descriptor.
    pub fn find(&self, font: &Font) -> Option<FontId> {
        self.index.get(font).copied()
    }

    /// Number of distinct fonts.
    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    /// Iterate over `(id, font)` pairs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (FontId, &Font)> {
        self.fonts
            .iter()
            .enumerate()
            .map(|(i, font)| (FontId(i as u32 + 1), font))
    }
}

/// Serialized form of one registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FontRecord {
    id: FontId,
    #[serde(flatten)]
    font: Font,
}

impl From<FontRegistry> for Vec<FontRecord> {
    fn from(registry: FontRegistry) -> Self {
        registry
            .fonts
            .into_iter()
            .enumerate()
            .map(|(i, font)| FontRecord {
                id: FontId(i as u32 + 1),
                font,
            })
            .collect()
    }
}

impl TryFrom<Vec<FontRecord>> for FontRegistry {
    type Error = String;

    fn try_from(records: Vec<FontRecord>) -> std::result::Result<Self, Self::Error> {
        let mut registry = FontRegistry::new();
        for record in records {
            let id = registry.intern(record.font);
            if id != record.id {
                return Err(format!(
                    "font record {} is out of order or duplicated (expected {})",
                    record.id, id
                ));
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(style: &str) -> Font {
        Font::new("Times New Roman", "9.00")
            .with_style(style)
            .with_kind("serif")
            .with_width("proportional")
    }

    #[test]
    fn test_intern_deduplicates() {
        let mut registry = FontRegistry::new();
        let a = registry.intern(times(""));
        let b = registry.intern(times("italics"));
        let c = registry.intern(times(""));

        assert_eq!(a, FontId(1));
        assert_eq!(b, FontId(2));
        assert_eq!(a, c);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_get_and_resolve() {
        let mut registry = FontRegistry::new();
        let id = registry.intern(times("bold"));

        assert!(registry.get(id).unwrap().is_bold());
        assert!(registry.get(FontId(0)).is_none());
        assert!(matches!(
            registry.resolve(FontId(9)),
            Err(Error::MissingReference(_))
        ));
    }

    #[test]
    fn test_style_keywords() {
        let font = times("italics bold");
        assert!(font.is_italic());
        assert!(font.is_bold());
        assert!(!times("smallcaps").is_italic());
    }

    #[test]
    fn test_serde_round_trip() {
        let mut registry = FontRegistry::new();
        registry.intern(times(""));
        registry.intern(times("italics"));

        let json = serde_json::to_string(&registry).unwrap();
        assert!(json.starts_with("[{\"id\":1"));

        let restored: FontRegistry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.find(&times("italics")), Some(FontId(2)));
    }

    #[test]
    fn test_deserialize_rejects_gaps() {
        let json = r#"[{"id":2,"family":"A","size":"1","style":"","kind":"","width":""}]"#;
        assert!(serde_json::from_str::<FontRegistry>(json).is_err());
    }
}

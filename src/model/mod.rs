//! Token-stream document model.
//!
//! A volume is held as two parallel trees that never own each other:
//! [`Page`]s own their [`Block`]s (and the blocks own their [`Token`]s), while
//! [`Case`]s refer to blocks by id only. All cross-tree lookups go through a
//! [`VolumeIndex`] built on demand by the caller.

mod case;
mod font;
mod page;
mod token;
mod volume;

pub use case::{
    Case, CaseMetadata, Citation, Court, Footnote, Opinion, OpinionKind, Paragraph, ParagraphKind,
};
pub use font::{Font, FontId, FontRegistry};
pub use page::{Block, Page, Rect, SealedPayload, StyleRef};
pub use token::{current_text, validate_tokens, MarkKind, OcrSpan, SpanKind, Token};
pub use volume::{Volume, VolumeIndex, VolumeMetadata};

/// Serde helpers storing binary fields as base64 strings.
pub(crate) mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            bytes: &Option<Vec<u8>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match bytes {
                Some(b) => serializer.serialize_some(&STANDARD.encode(b)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Vec<u8>>, D::Error> {
            let encoded: Option<String> = Option::deserialize(deserializer)?;
            encoded
                .map(|e| STANDARD.decode(e).map_err(serde::de::Error::custom))
                .transpose()
        }
    }
}

pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

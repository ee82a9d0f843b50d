//! Page-level types.

use serde::{Deserialize, Serialize};

use super::token::{current_text, validate_tokens};
use super::{base64_bytes, is_false, FontId, Token};
use crate::error::Result;

/// An axis-aligned rectangle in page pixel coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    /// Horizontal position of the left edge
    pub hpos: u32,
    /// Vertical position of the top edge
    pub vpos: u32,
    /// Width
    pub width: u32,
    /// Height
    pub height: u32,
}

impl Rect {
    /// Create a rectangle.
    pub fn new(hpos: u32, vpos: u32, width: u32, height: u32) -> Self {
        Self {
            hpos,
            vpos,
            width,
            height,
        }
    }

    /// Check if `other` lies entirely inside this rectangle.
    pub fn contains(&self, other: &Rect) -> bool {
        other.hpos >= self.hpos
            && other.vpos >= self.vpos
            && other.hpos + other.width <= self.hpos + self.width
            && other.vpos + other.height <= self.vpos + self.height
    }
}

/// Page-local style identifier bound to a volume font.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleRef {
    /// Identifier used by the layout document (e.g., "Style_3")
    pub id: String,
    /// Interned font
    pub font: FontId,
}

/// Encrypted redaction payload of one page: nonce, ciphertext and tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload(#[serde(with = "base64_bytes")] pub Vec<u8>);

impl SealedPayload {
    /// Raw bytes of the payload.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A single scanned page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Page identifier (e.g., "page_12")
    pub id: String,

    /// Physical sequence number within the volume
    pub order: u32,

    /// Printed page number; may differ from `order`
    pub label: String,

    /// Page width in pixels
    pub width: u32,

    /// Page height in pixels
    pub height: u32,

    /// Reference to the scanned image file
    pub image_ref: String,

    /// Deskew angle applied to the scan, in degrees
    pub deskew: f64,

    /// Print-space regions, in document order
    pub spaces: Vec<Rect>,

    /// Page-local style table
    pub styles: Vec<StyleRef>,

    /// Content blocks, in document order
    pub blocks: Vec<Block>,

    /// Encrypted redaction payload, present once a page with redactions is sealed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sealed: Option<SealedPayload>,
}

impl Page {
    /// Create an empty page.
    pub fn new(id: impl Into<String>, order: u32, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            order,
            label: label.into(),
            width: 0,
            height: 0,
            image_ref: String::new(),
            deskew: 0.0,
            spaces: Vec::new(),
            styles: Vec::new(),
            blocks: Vec::new(),
            sealed: None,
        }
    }

    /// Set the page dimensions.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Add a block to the page.
    pub fn add_block(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Get a block by id.
    pub fn block(&self, id: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.id == id)
    }

    /// Get a mutable block by id.
    pub fn block_mut(&mut self, id: &str) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    /// Blocks belonging to print space `space`, in page order.
    pub fn blocks_in_space(&self, space: usize) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(move |b| b.space == space)
    }

    /// Layout style identifier for a font, if the page declares one.
    pub fn style_id(&self, font: FontId) -> Option<&str> {
        self.styles
            .iter()
            .find(|s| s.font == font)
            .map(|s| s.id.as_str())
    }

    /// Check if any block or span on the page is redacted.
    pub fn has_redactions(&self) -> bool {
        self.blocks.iter().any(|b| b.redacted || b.has_redacted_spans())
    }

    /// Current text of every text block, one block per line.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .filter(|b| !b.is_illustration())
            .map(Block::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The unit addressed by both OCR and canonical text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Volume-unique block identifier (e.g., "BL_12.3")
    pub id: String,

    /// Bounding box
    pub rect: Rect,

    /// Structural class label (e.g., "p", "footnote", "Illustration")
    pub class: String,

    /// Index of the print space containing the block
    #[serde(default)]
    pub space: usize,

    /// Whether the whole block is redacted
    #[serde(default, skip_serializing_if = "is_false")]
    pub redacted: bool,

    /// Token stream; `None` for illustration blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens: Option<Vec<Token>>,

    /// Raster data of an illustration
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "base64_bytes::option"
    )]
    pub image_data: Option<Vec<u8>>,
}

impl Block {
    /// Create a text block, checking that its token stream is balanced.
    pub fn text_block(
        id: impl Into<String>,
        rect: Rect,
        class: impl Into<String>,
        tokens: Vec<Token>,
    ) -> Result<Self> {
        validate_tokens(&tokens)?;
        Ok(Self {
            id: id.into(),
            rect,
            class: class.into(),
            space: 0,
            redacted: false,
            tokens: Some(tokens),
            image_data: None,
        })
    }

    /// Create an illustration block.
    pub fn illustration(id: impl Into<String>, rect: Rect, class: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rect,
            class: class.into(),
            space: 0,
            redacted: false,
            tokens: None,
            image_data: None,
        }
    }

    /// Assign the block to a print space.
    pub fn with_space(mut self, space: usize) -> Self {
        self.space = space;
        self
    }

    /// Attach raster data to an illustration block.
    pub fn attach_image(&mut self, data: Vec<u8>) {
        self.image_data = Some(data);
    }

    /// Check if this is an illustration block.
    pub fn is_illustration(&self) -> bool {
        self.tokens.is_none()
    }

    /// Token stream, empty for illustrations.
    pub fn tokens(&self) -> &[Token] {
        self.tokens.as_deref().unwrap_or(&[])
    }

    /// Current text of the block.
    pub fn text(&self) -> String {
        current_text(self.tokens())
    }

    /// Check if the block contains partial redaction spans.
    pub fn has_redacted_spans(&self) -> bool {
        self.tokens().iter().any(|t| matches!(t, Token::RedactStart))
    }

    /// MIME type of the attached image, detected from magic bytes.
    pub fn image_mime_type(&self) -> Option<&'static str> {
        let data = self.image_data.as_deref()?;

        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some("image/jpeg");
        }
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some("image/png");
        }
        if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            return Some("image/gif");
        }
        // TIFF: little-endian or big-endian
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some("image/tiff");
        }
        if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some("image/webp");
        }
        None
    }
}

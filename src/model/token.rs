//! Flat token stream carried by every text block.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{FontId, Rect};
use crate::error::{Error, Result};

/// One atomic unit of a block's content stream.
///
/// The representation is flat: text runs interleaved with
/// start/end markers. A well-formed stream is balanced (every start has a
/// matching end of the same kind, properly nested); see [`validate_tokens`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Token {
    /// A run of text
    Text(String),

    /// Start of an OCR text line
    LineStart(Rect),
    /// End of an OCR text line
    LineEnd,

    /// Start of a run set in one font
    FontStart(FontId),
    /// End of a font run
    FontEnd,

    /// Start of one OCR word with its confidence data
    OcrStart(OcrSpan),
    /// End of an OCR word
    OcrEnd,

    /// Start of a redacted span
    RedactStart,
    /// End of a redacted span
    RedactEnd,

    /// Start of a corrected span; `original` is the OCR text it replaced
    EditStart {
        /// Text removed by the correction
        original: String,
    },
    /// End of a corrected span
    EditEnd,

    /// Start of a canonical-only inline marker
    MarkStart(MarkKind),
    /// End of an inline marker
    MarkEnd,
}

impl Token {
    /// Create a text token.
    pub fn text(text: impl Into<String>) -> Self {
        Token::Text(text.into())
    }

    /// Create an edit start token.
    pub fn edit(original: impl Into<String>) -> Self {
        Token::EditStart {
            original: original.into(),
        }
    }

    /// The span kind this token opens, if any.
    pub fn opens(&self) -> Option<SpanKind> {
        match self {
            Token::LineStart(_) => Some(SpanKind::Line),
            Token::FontStart(_) => Some(SpanKind::Font),
            Token::OcrStart(_) => Some(SpanKind::Ocr),
            Token::RedactStart => Some(SpanKind::Redact),
            Token::EditStart { .. } => Some(SpanKind::Edit),
            Token::MarkStart(_) => Some(SpanKind::Mark),
            _ => None,
        }
    }

    /// The span kind this token closes, if any.
    pub fn closes(&self) -> Option<SpanKind> {
        match self {
            Token::LineEnd => Some(SpanKind::Line),
            Token::FontEnd => Some(SpanKind::Font),
            Token::OcrEnd => Some(SpanKind::Ocr),
            Token::RedactEnd => Some(SpanKind::Redact),
            Token::EditEnd => Some(SpanKind::Edit),
            Token::MarkEnd => Some(SpanKind::Mark),
            _ => None,
        }
    }

    /// Text content if this is a text token.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Token::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Check if this is a text token.
    pub fn is_text(&self) -> bool {
        matches!(self, Token::Text(_))
    }
}

/// Kinds of start/end spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanKind {
    Line,
    Font,
    Ocr,
    Redact,
    Edit,
    Mark,
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpanKind::Line => "line",
            SpanKind::Font => "font",
            SpanKind::Ocr => "ocr",
            SpanKind::Redact => "redact",
            SpanKind::Edit => "edit",
            SpanKind::Mark => "mark",
        };
        f.write_str(name)
    }
}

/// Geometry and confidence of one OCR word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSpan {
    /// Bounding box of the word
    pub rect: Rect,

    /// Word confidence in `0.0..=1.0`
    #[serde(rename = "wc")]
    pub word_confidence: f64,

    /// Per-character confidence digits; `None` when every character is fully confident
    #[serde(rename = "cc", default, skip_serializing_if = "Option::is_none")]
    pub char_confidence: Option<String>,
}

impl OcrSpan {
    /// Create a span with full character confidence.
    pub fn new(rect: Rect, word_confidence: f64) -> Self {
        Self {
            rect,
            word_confidence,
            char_confidence: None,
        }
    }

    /// Set the per-character confidence digits.
    pub fn with_char_confidence(mut self, digits: impl Into<String>) -> Self {
        let digits = digits.into();
        self.char_confidence = if digits.is_empty() { None } else { Some(digits) };
        self
    }
}

/// Canonical-only inline markers that the OCR evidence never carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkKind {
    /// Reference to a footnote (`<footnotemark>`)
    FootnoteMark,
    /// Bracketed paragraph number (`<bracketnum>`)
    BracketNum,
}

impl MarkKind {
    /// Element name in canonical markup.
    pub fn tag(self) -> &'static str {
        match self {
            MarkKind::FootnoteMark => "footnotemark",
            MarkKind::BracketNum => "bracketnum",
        }
    }

    /// Parse a canonical element name.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "footnotemark" => Some(MarkKind::FootnoteMark),
            "bracketnum" => Some(MarkKind::BracketNum),
            _ => None,
        }
    }
}

/// Check that a token sequence is balanced and properly nested.
pub fn validate_tokens(tokens: &[Token]) -> Result<()> {
    let mut stack: Vec<(SpanKind, usize)> = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if let Some(kind) = token.opens() {
            stack.push((kind, i));
        } else if let Some(kind) = token.closes() {
            match stack.pop() {
                Some((open, _)) if open == kind => {}
                Some((open, at)) => {
                    return Err(Error::UnbalancedTokens(format!(
                        "{} end at token {} closes {} opened at token {}",
                        kind, i, open, at
                    )))
                }
                None => {
                    return Err(Error::UnbalancedTokens(format!(
                        "{} end at token {} has no start",
                        kind, i
                    )))
                }
            }
        }
    }
    match stack.pop() {
        Some((open, at)) => Err(Error::UnbalancedTokens(format!(
            "{} opened at token {} is never closed",
            open, at
        ))),
        None => Ok(()),
    }
}

/// Concatenate the current text of a token stream.
///
/// Replacement text inside edit spans is included; the original text carried
/// by `EditStart` is not.
pub fn current_text(tokens: &[Token]) -> String {
    tokens.iter().filter_map(Token::as_text).collect()
}

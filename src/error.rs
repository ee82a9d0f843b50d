//! Error types for the casestream engine.

use std::io;
use thiserror::Error;

/// Result type alias for casestream operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while extracting, rendering, synchronizing or
/// redacting a volume.
///
/// None of these are retried inside the engine. A fatal error aborts the
/// volume being processed; retry policy belongs to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The input is neither a layout nor a canonical document.
    #[error("Unknown document format")]
    UnknownFormat,

    /// A source document is not well-formed or does not follow the expected structure.
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// A rendered document does not match its source.
    #[error("Validation mismatch: {0}")]
    ValidationMismatch(String),

    /// The corrected text cannot be expressed as in-place replacement.
    #[error("Unsupported edit: {0}")]
    UnsupportedEdit(String),

    /// A block, font, style or paragraph reference could not be resolved.
    #[error("Missing reference: {0}")]
    MissingReference(String),

    /// A token sequence has unmatched start/end tokens.
    #[error("Unbalanced token stream: {0}")]
    UnbalancedTokens(String),

    /// Wrong key, or the sealed payload was corrupted or tampered with.
    #[error("Decryption failed")]
    DecryptionFailure,

    /// Sealing a redaction payload failed.
    #[error("Encryption error: {0}")]
    Encryption(String),

    /// Error during rendering.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Error reading or writing a token-stream archive.
    #[error("Archive error: {0}")]
    Archive(String),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Malformed(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Malformed(err.to_string())
    }
}

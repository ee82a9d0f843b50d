//! Extraction options.

/// Options for extracting pages and cases from source documents.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Re-render every extracted document and compare it with its source
    pub validate: bool,

    /// Whether volume-level rendering and validation may use parallel processing
    pub parallel: bool,
}

impl ExtractOptions {
    /// Create new extract options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable round-trip validation.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            validate: false,
            parallel: true,
        }
    }
}

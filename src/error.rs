//! Error handling for Spectreq
//!
//! Filter-design errors are split into three families: configuration errors
//! (raised once, at construction), shape errors and numeric-domain errors
//! (raised per call, never poisoning the component). The I/O variants are only
//! produced by the WAV and config-file helpers.

use thiserror::Error;

/// Result type alias for Spectreq operations
pub type Result<T> = std::result::Result<T, EqError>;

/// Main error type for Spectreq operations
#[derive(Error, Debug)]
pub enum EqError {
    // Construction Errors
    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    // Per-call Errors
    #[error("Shape mismatch for {what}: expected {expected}, got {actual}")]
    Shape {
        what: String,
        expected: String,
        actual: String,
    },

    #[error("Numeric domain error: {reason}")]
    NumericDomain { reason: String },

    // Audio File Errors
    #[error("Failed to read audio file: {path}")]
    AudioRead {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Failed to write audio file: {path}")]
    AudioWrite {
        path: String,
        #[source]
        source: hound::Error,
    },

    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EqError {
    /// Build a configuration error from anything printable
    pub fn config(reason: impl Into<String>) -> Self {
        EqError::Configuration {
            reason: reason.into(),
        }
    }

    /// Build a shape error
    ///
    /// # Arguments
    /// * `what` - Name of the offending array (e.g. `"log_gains"`)
    /// * `expected` - Expected shape, rendered for humans
    /// * `actual` - Observed shape, rendered for humans
    pub fn shape(what: impl Into<String>, expected: impl ToString, actual: impl ToString) -> Self {
        EqError::Shape {
            what: what.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Build a numeric-domain error
    pub fn numeric(reason: impl Into<String>) -> Self {
        EqError::NumericDomain {
            reason: reason.into(),
        }
    }

    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            EqError::Configuration { .. } => "CONFIGURATION_ERROR",
            EqError::Shape { .. } => "SHAPE_ERROR",
            EqError::NumericDomain { .. } => "NUMERIC_DOMAIN_ERROR",
            EqError::AudioRead { .. } => "AUDIO_READ_ERROR",
            EqError::AudioWrite { .. } => "AUDIO_WRITE_ERROR",
            EqError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            EqError::Io(_) => "IO_ERROR",
            EqError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the component that raised this error is still usable
    ///
    /// Per-call errors leave the equalizer intact; a configuration error means
    /// the component was never built.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EqError::Configuration { .. })
    }

    /// Returns a suggested recovery action for this error
    pub fn recovery_hint(&self) -> &'static str {
        match self {
            EqError::Configuration { .. } => {
                "Fix the equalizer options and construct the equalizer again"
            }
            EqError::Shape { .. } => {
                "Query parameter_size() and pass parameters with the reported shape"
            }
            EqError::NumericDomain { .. } => "Keep parameters finite and within a sane gain range",
            EqError::AudioRead { .. } => "Check that the file exists and is a valid WAV file",
            EqError::UnsupportedFormat { .. } => "Convert to 16/24-bit integer or 32-bit float WAV",
            _ => "Check the error details and try again",
        }
    }
}

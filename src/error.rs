//! Error types for gpgreport.
//!
//! Analysis itself never fails: every operation yields an
//! [`AnalysisReport`](crate::analysis::AnalysisReport). These errors belong to
//! the surfaces around it that can genuinely fail, such as parsing
//! fingerprints, building keys, persisting key snapshots, loading
//! configuration and validating key-edit intents.

use thiserror::Error;

/// Result type alias for gpgreport operations.
pub type Result<T> = std::result::Result<T, GpgReportError>;

/// Main error type for gpgreport.
#[derive(Error, Debug)]
pub enum GpgReportError {
    /// Key model construction or invariant violations
    #[error("Key error: {0}")]
    Key(String),

    /// Malformed fingerprint or key ID
    #[error("Fingerprint error: {0}")]
    Fingerprint(String),

    /// Keyring management errors
    #[error("Keyring error: {0}")]
    Keyring(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected key-edit intents
    #[error("Intent error: {0}")]
    Intent(String),

    /// Invalid input or arguments
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl GpgReportError {
    /// Creates a new key error.
    pub fn key<T: ToString>(msg: T) -> Self {
        Self::Key(msg.to_string())
    }

    /// Creates a new fingerprint error.
    pub fn fingerprint<T: ToString>(msg: T) -> Self {
        Self::Fingerprint(msg.to_string())
    }

    /// Creates a new keyring error.
    pub fn keyring<T: ToString>(msg: T) -> Self {
        Self::Keyring(msg.to_string())
    }

    /// Creates a new serialization error.
    pub fn serialization<T: ToString>(msg: T) -> Self {
        Self::Serialization(msg.to_string())
    }

    /// Creates a new configuration error.
    pub fn config<T: ToString>(msg: T) -> Self {
        Self::Config(msg.to_string())
    }

    /// Creates a new intent error.
    pub fn intent<T: ToString>(msg: T) -> Self {
        Self::Intent(msg.to_string())
    }

    /// Creates a new invalid input error.
    pub fn invalid_input<T: ToString>(msg: T) -> Self {
        Self::InvalidInput(msg.to_string())
    }

    /// Creates a new validation error.
    pub fn validation<T: ToString>(msg: T) -> Self {
        Self::Validation(msg.to_string())
    }
}

impl From<serde_json::Error> for GpgReportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

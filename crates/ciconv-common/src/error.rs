//! Unified error types for the ciconv workspace.
//!
//! Only fatal conditions live here. Policy fallbacks (cycles, missing ports,
//! unsupported Compose features) are recorded as warnings by the engine and
//! never surface as an error.

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CiconvError {
    /// The input document is not well-formed.
    #[error("failed to parse compose document: {message}")]
    Parse {
        /// Message reported by the underlying parser.
        message: String,
    },

    /// The document parsed but is structurally unusable.
    #[error("invalid compose document: {}", .errors.join("; "))]
    Validation {
        /// Every structural problem found, in document order.
        errors: Vec<String>,
    },

    /// A required target field was absent or empty.
    #[error("missing required target field: {field}")]
    MissingTarget {
        /// Wire name of the missing field.
        field: &'static str,
    },

    /// A target field carried a value outside its domain.
    #[error("invalid target configuration: {message}")]
    InvalidTarget {
        /// Description of the invalid value.
        message: String,
    },

    /// JSON (de)serialization failed.
    #[error("serialization error: {source}")]
    Json {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },

    /// YAML serialization failed.
    #[error("document serialization error: {source}")]
    Yaml {
        /// Underlying serialization error.
        #[from]
        source: serde_yaml::Error,
    },
}

impl CiconvError {
    /// Returns the individual structural errors for a validation failure,
    /// or the single rendered message for every other variant.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Validation { errors } => errors.clone(),
            other => vec![other.to_string()],
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CiconvError>;

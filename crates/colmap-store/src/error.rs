//! Storage error types.
//!
//! Every store operation returns a structured error carrying the operation
//! and path involved, plus a user-facing message.

use std::path::PathBuf;

use colmap_model::{DatasetId, SessionId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stored document could not be decoded.
    #[error("Failed to parse {path}")]
    Deserialization {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A document could not be encoded.
    #[error("Failed to serialize {what}")]
    Serialization {
        what: String,
        #[source]
        source: serde_json::Error,
    },

    /// Temp file could not be renamed over the target.
    #[error("Failed to complete write of {target_path}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Dataset not found: {0}")]
    DatasetNotFound(DatasetId),

    #[error("Mapping session not found: {0}")]
    SessionNotFound(SessionId),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Get a user-friendly message for this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::Io {
                operation, path, ..
            } => format!("Could not {} the file at {}", operation, path.display()),
            Self::Deserialization { path, .. } => format!(
                "The file at {} is not a valid document. It may be corrupted.",
                path.display()
            ),
            Self::Serialization { what, .. } => {
                format!("An error occurred while encoding {what}.")
            }
            Self::AtomicWriteFailed { target_path, .. } => format!(
                "Could not save the file to {}. Please check disk space and permissions.",
                target_path.display()
            ),
            Self::DatasetNotFound(id) => format!("Dataset '{id}' does not exist."),
            Self::SessionNotFound(id) => format!("Mapping session '{id}' does not exist."),
            Self::LockPoisoned => "The store is in an inconsistent state.".to_string(),
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

//! Error types for the mapping engine.

use colmap_model::{DatasetId, FrameworkId};
use colmap_store::StoreError;
use thiserror::Error;

/// Errors that end a generation run before or outside group processing.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Dataset or framework not found (dataset '{dataset_id}', framework '{framework_id}')")]
    NotFound {
        dataset_id: DatasetId,
        framework_id: FrameworkId,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    /// A background task failed to complete.
    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Generation cancelled after {completed} of {total} groups")]
    Cancelled { completed: usize, total: usize },

    /// The event receiver went away; nothing is left to report to.
    #[error("Event receiver dropped after {completed} of {total} groups")]
    Disconnected { completed: usize, total: usize },

    /// The dispatcher stopped before delivering every group.
    #[error("Dispatcher stopped after {completed} of {total} groups")]
    Incomplete { completed: usize, total: usize },
}

impl EngineError {
    /// Message suitable for an `error` event.
    pub fn user_message(&self) -> String {
        match self {
            Self::NotFound { .. } => "Dataset or Framework not found".to_string(),
            Self::Store(error) => error.user_message(),
            Self::Task(_)
            | Self::Incomplete { .. }
            | Self::Cancelled { .. }
            | Self::Disconnected { .. } => self.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::Task(error.to_string())
    }
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid dataset id: {0:?}")]
    InvalidDatasetId(String),
    #[error("invalid framework id: {0:?}")]
    InvalidFrameworkId(String),
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

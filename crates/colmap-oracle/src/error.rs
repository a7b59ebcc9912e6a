//! Error types for oracle calls.

use thiserror::Error;

/// Errors that can occur while configuring or calling the oracle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OracleError {
    /// Required configuration value is missing.
    #[error("missing configuration: {0}")]
    MissingConfig(&'static str),

    /// Configuration value could not be parsed.
    #[error("invalid value for {key}: {value}")]
    InvalidConfig {
        /// Environment key that was read.
        key: &'static str,
        /// Raw value found.
        value: String,
    },

    /// Network request failed.
    #[error("network error: {0}")]
    Network(String),

    /// The request did not finish before the deadline.
    #[error("oracle request timed out after {0} seconds")]
    Timeout(u64),

    /// The oracle answered with a non-success status.
    #[error("oracle returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("oracle rate limit exceeded, retry after {retry_after} seconds")]
    RateLimited {
        /// Seconds until the limit resets.
        retry_after: u64,
    },

    /// The response body did not have the expected shape.
    #[error("invalid oracle response: {0}")]
    InvalidResponse(String),

    /// The oracle returned no text.
    #[error("oracle returned an empty completion")]
    EmptyResponse,
}

impl OracleError {
    /// Returns a user-friendly error message suitable for display.
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::MissingConfig(_) | Self::InvalidConfig { .. } => {
                "The mapping assistant is not configured. Check the LLM_* settings."
            }
            Self::Network(_) => {
                "Could not reach the mapping assistant. Please check your connection."
            }
            Self::Timeout(_) => "The mapping assistant took too long to answer.",
            Self::RateLimited { .. } => "The mapping assistant is busy. Please try again later.",
            Self::Http { .. } | Self::InvalidResponse(_) | Self::EmptyResponse => {
                "The mapping assistant returned an unexpected answer."
            }
        }
    }

    /// Returns whether this error is potentially recoverable with a retry.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_)
            | Self::Timeout(_)
            | Self::RateLimited { .. }
            | Self::InvalidResponse(_)
            | Self::EmptyResponse => true,
            Self::Http { status, .. } => *status >= 500,
            Self::MissingConfig(_) | Self::InvalidConfig { .. } => false,
        }
    }
}

/// Result type alias for oracle operations.
pub type Result<T> = std::result::Result<T, OracleError>;

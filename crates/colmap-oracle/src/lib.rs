//! Text-completion oracle used by the mapping engine.
//!
//! The engine only needs one capability: send a prompt, get text back.
//! [`Oracle`] captures that, and [`ChatOracle`] implements it against any
//! OpenAI-compatible chat completion API configured through `LLM_*`
//! environment variables.

mod chat;
mod config;
mod error;

use std::future::Future;
use std::sync::Arc;

pub use chat::ChatOracle;
pub use config::{
    DEFAULT_BASE_URL, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TIMEOUT,
    ENV_API_KEY, ENV_BASE_URL, ENV_MAX_TOKENS, ENV_MODEL, ENV_TEMPERATURE, ENV_TIMEOUT_SECS,
    OracleConfig,
};
pub use error::{OracleError, Result};

/// Something that turns a prompt into free text.
///
/// Calls may run concurrently from several tasks. Dropping the returned
/// future abandons the request.
pub trait Oracle: Send + Sync {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

impl<O: Oracle> Oracle for Arc<O> {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send {
        (**self).complete(prompt)
    }
}

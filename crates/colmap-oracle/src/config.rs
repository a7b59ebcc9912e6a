//! Oracle configuration read from the environment.

use std::fmt;
use std::time::Duration;

use crate::error::{OracleError, Result};

/// Environment variable holding the API key (required).
pub const ENV_API_KEY: &str = "LLM_API_KEY";
/// Environment variable holding the API base URL.
pub const ENV_BASE_URL: &str = "LLM_BASE_URL";
/// Environment variable holding the model name.
pub const ENV_MODEL: &str = "LLM_MODEL";
/// Environment variable holding the sampling temperature.
pub const ENV_TEMPERATURE: &str = "LLM_TEMPERATURE";
/// Environment variable holding the completion token budget.
pub const ENV_MAX_TOKENS: &str = "LLM_MAX_TOKENS";
/// Environment variable holding the request timeout in seconds.
pub const ENV_TIMEOUT_SECS: &str = "LLM_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com/v1";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_TOKENS: u32 = 8192;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Settings for an OpenAI-compatible chat completion endpoint.
#[derive(Clone, PartialEq)]
pub struct OracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
    /// Ask the endpoint for a JSON object response.
    pub json_response: bool,
}

impl OracleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
            json_response: true,
        }
    }

    /// Read the configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = get(ENV_API_KEY).ok_or(OracleError::MissingConfig(ENV_API_KEY))?;
        let mut config = Self::new(api_key);

        if let Some(base_url) = get(ENV_BASE_URL) {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get(ENV_MODEL) {
            config.model = model;
        }
        if let Some(raw) = get(ENV_TEMPERATURE) {
            config.temperature = raw
                .parse::<f32>()
                .ok()
                .filter(|t| (0.0..=2.0).contains(t))
                .ok_or(OracleError::InvalidConfig {
                    key: ENV_TEMPERATURE,
                    value: raw,
                })?;
        }
        if let Some(raw) = get(ENV_MAX_TOKENS) {
            config.max_tokens = raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(OracleError::InvalidConfig {
                    key: ENV_MAX_TOKENS,
                    value: raw,
                })?;
        }
        if let Some(raw) = get(ENV_TIMEOUT_SECS) {
            let secs = raw
                .parse::<u64>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(OracleError::InvalidConfig {
                    key: ENV_TIMEOUT_SECS,
                    value: raw,
                })?;
            config.timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// URL of the chat completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OracleConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout", &self.timeout)
            .field("json_response", &self.json_response)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = OracleConfig::from_lookup(lookup(&[(ENV_API_KEY, "sk-test")])).unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(config.json_response);
        assert_eq!(
            config.completions_url(),
            "https://api.deepseek.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_missing_api_key() {
        let err = OracleConfig::from_lookup(lookup(&[(ENV_API_KEY, "  ")])).unwrap_err();
        assert_eq!(err, OracleError::MissingConfig(ENV_API_KEY));
    }

    #[test]
    fn test_overrides() {
        let config = OracleConfig::from_lookup(lookup(&[
            (ENV_API_KEY, "sk-test"),
            (ENV_BASE_URL, "http://localhost:8080/v1/"),
            (ENV_MODEL, "qwen-max"),
            (ENV_TEMPERATURE, "0"),
            (ENV_TIMEOUT_SECS, "15"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.model, "qwen-max");
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_invalid_numbers() {
        let err = OracleConfig::from_lookup(lookup(&[
            (ENV_API_KEY, "sk-test"),
            (ENV_MAX_TOKENS, "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            OracleError::InvalidConfig {
                key: ENV_MAX_TOKENS,
                ..
            }
        ));
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = OracleConfig::new("sk-secret");
        assert!(!format!("{config:?}").contains("sk-secret"));
    }
}

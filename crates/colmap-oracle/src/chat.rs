//! OpenAI-compatible chat completion client.

use serde::{Deserialize, Serialize};

use crate::Oracle;
use crate::config::OracleConfig;
use crate::error::{OracleError, Result};

/// Fallback when a 429 response carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Oracle backed by a `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct ChatOracle {
    http: reqwest::Client,
    config: OracleConfig,
}

impl ChatOracle {
    pub fn new(config: OracleConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("colmap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OracleError::Network(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    async fn send(&self, prompt: &str) -> Result<String> {
        let url = self.config.completions_url();
        let body = ChatRequest::new(&self.config, prompt);
        tracing::debug!(model = %self.config.model, %url, prompt_chars = prompt.len(), "Sending completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport_error(&e))?;
        let response = check_response(response).await?;

        let text = response
            .text()
            .await
            .map_err(|e| self.map_transport_error(&e))?;
        extract_content(&text)
    }

    fn map_transport_error(&self, error: &reqwest::Error) -> OracleError {
        if error.is_timeout() {
            OracleError::Timeout(self.config.timeout.as_secs())
        } else {
            OracleError::Network(error.to_string())
        }
    }
}

impl Oracle for ChatOracle {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.send(prompt).await
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

impl<'a> ChatRequest<'a> {
    fn new(config: &'a OracleConfig, prompt: &'a str) -> Self {
        Self {
            model: &config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            response_format: config.json_response.then_some(ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Map rate limiting and non-success statuses to errors.
async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.as_u16() == 429 {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
        return Err(OracleError::RateLimited { retry_after });
    }
    if !status.is_success() {
        return Err(OracleError::Http {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        });
    }
    Ok(response)
}

/// Pull the first choice's text out of a completion response body.
fn extract_content(body: &str) -> Result<String> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| OracleError::InvalidResponse(e.to_string()))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();
    if content.trim().is_empty() {
        return Err(OracleError::EmptyResponse);
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_shape() {
        let config = OracleConfig::new("sk-test");
        let body = serde_json::to_value(ChatRequest::new(&config, "map these")).unwrap();
        assert_eq!(body["model"], "deepseek-chat");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "map these");
        assert_eq!(body["max_tokens"], 8192);
        assert_eq!(body["response_format"]["type"], "json_object");
    }

    #[test]
    fn request_without_json_mode() {
        let mut config = OracleConfig::new("sk-test");
        config.json_response = false;
        let body = serde_json::to_value(ChatRequest::new(&config, "x")).unwrap();
        assert!(body.get("response_format").is_none());
    }

    #[test]
    fn extracts_first_choice() {
        let body = r#"{"id":"c1","choices":[{"index":0,"message":{"role":"assistant","content":"{\"mappings\":[]}"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), r#"{"mappings":[]}"#);
    }

    #[test]
    fn empty_or_missing_content_is_an_error() {
        assert_eq!(
            extract_content(r#"{"choices":[]}"#).unwrap_err(),
            OracleError::EmptyResponse
        );
        assert_eq!(
            extract_content(r#"{"choices":[{"message":{"content":"  "}}]}"#).unwrap_err(),
            OracleError::EmptyResponse
        );
    }

    #[test]
    fn garbage_body_is_invalid() {
        assert!(matches!(
            extract_content("<html>bad gateway</html>"),
            Err(OracleError::InvalidResponse(_))
        ));
    }

    #[test]
    fn client_builds_from_config() {
        let oracle = ChatOracle::new(OracleConfig::new("sk-test")).unwrap();
        assert_eq!(oracle.config().model, "deepseek-chat");
    }
}

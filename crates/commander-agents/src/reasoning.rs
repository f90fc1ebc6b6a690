//! Reasoning-service client.
//!
//! Investigators and the decision synthesizer talk to the language model
//! through [`ReasoningService`]: one system prompt, one user prompt, one text
//! reply. No streaming and no retries at this layer.

use async_trait::async_trait;
use incident_commander_core::config::{ReasoningConfig, ReasoningProvider};
use incident_commander_core::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 2048;

/// Single-shot language-model completion.
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// Call the reasoning service under a deadline. Timing out is a reasoning failure.
pub async fn complete_within(
    service: &dyn ReasoningService,
    limit: Duration,
    system_prompt: &str,
    user_prompt: &str,
) -> Result<String> {
    bounded(limit, service.complete(system_prompt, user_prompt), || {
        Error::reasoning(format!("no response within {}s", limit.as_secs()))
    })
    .await
}

/// Await `fut` for at most `limit`, mapping expiry through `on_timeout`.
pub async fn bounded<T, F, E>(limit: Duration, fut: F, on_timeout: E) -> Result<T>
where
    F: Future<Output = Result<T>>,
    E: FnOnce() -> Error,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            let err = on_timeout();
            warn!(error = %err, limit_secs = limit.as_secs(), "call timed out");
            Err(err)
        }
    }
}

/// Reasoning service that always answers with the same text.
#[derive(Debug, Clone)]
pub struct StaticReasoning {
    pub response: String,
}

impl StaticReasoning {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl ReasoningService for StaticReasoning {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}

// =============================================================================
// HTTP CLIENT
// =============================================================================

/// HTTP client for OpenAI-compatible chat completions (OpenAI, Ollama) and
/// the Anthropic messages API.
#[derive(Debug, Clone)]
pub struct HttpReasoningClient {
    client: reqwest::Client,
    config: ReasoningConfig,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl HttpReasoningClient {
    pub fn new(config: ReasoningConfig) -> Result<Self> {
        if config.provider != ReasoningProvider::Ollama && config.api_key.is_none() {
            return Err(Error::config(format!(
                "provider {} requires an API key",
                config.provider
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn provider(&self) -> ReasoningProvider {
        self.config.provider
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Endpoint the client posts to for its provider.
    pub fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match self.config.provider {
            ReasoningProvider::Ollama | ReasoningProvider::OpenAi => {
                format!("{}/v1/chat/completions", base)
            }
            ReasoningProvider::Anthropic => format!("{}/v1/messages", base),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(key) = &self.config.api_key {
            match self.config.provider {
                ReasoningProvider::Anthropic => {
                    headers.insert(
                        "x-api-key",
                        HeaderValue::from_str(key).map_err(|e| Error::config(e.to_string()))?,
                    );
                    headers.insert(
                        "anthropic-version",
                        HeaderValue::from_static(ANTHROPIC_VERSION),
                    );
                }
                _ => {
                    headers.insert(
                        AUTHORIZATION,
                        HeaderValue::from_str(&format!("Bearer {}", key))
                            .map_err(|e| Error::config(e.to_string()))?,
                    );
                }
            }
        }

        Ok(headers)
    }

    async fn post(&self, body: serde_json::Value) -> Result<String> {
        let endpoint = self.endpoint();
        debug!(endpoint = %endpoint, model = %self.config.model, "calling reasoning service");

        let response = self
            .client
            .post(&endpoint)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::reasoning(format!("request to {} failed: {}", endpoint, e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::reasoning(format!("HTTP {}: {}", status, text)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::reasoning(format!("failed to read response body: {}", e)))
    }
}

#[async_trait]
impl ReasoningService for HttpReasoningClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let user = ChatMessage {
            role: "user",
            content: user_prompt,
        };

        match self.config.provider {
            ReasoningProvider::Ollama | ReasoningProvider::OpenAi => {
                let body = serde_json::to_value(ChatRequest {
                    model: &self.config.model,
                    messages: vec![
                        ChatMessage {
                            role: "system",
                            content: system_prompt,
                        },
                        user,
                    ],
                    temperature: self.config.temperature,
                    stream: false,
                })?;
                let raw = self.post(body).await?;
                parse_chat_response(&raw)
            }
            ReasoningProvider::Anthropic => {
                let body = serde_json::to_value(MessagesRequest {
                    model: &self.config.model,
                    max_tokens: ANTHROPIC_MAX_TOKENS,
                    system: system_prompt,
                    messages: vec![user],
                    temperature: self.config.temperature,
                })?;
                let raw = self.post(body).await?;
                parse_messages_response(&raw)
            }
        }
    }
}

fn parse_chat_response(raw: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(raw)
        .map_err(|e| Error::reasoning(format!("malformed chat response: {}", e)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| Error::reasoning("chat response had no choices"))
}

fn parse_messages_response(raw: &str) -> Result<String> {
    let parsed: MessagesResponse = serde_json::from_str(raw)
        .map_err(|e| Error::reasoning(format!("malformed messages response: {}", e)))?;
    let text: Vec<String> = parsed
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect();
    if text.is_empty() {
        return Err(Error::reasoning("messages response had no text content"));
    }
    Ok(text.join(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowReasoning;

    #[async_trait]
    impl ReasoningService for SlowReasoning {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn test_static_reasoning() {
        let service = StaticReasoning::new("pool exhausted");
        assert_eq!(service.complete("s", "u").await.unwrap(), "pool exhausted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_complete_within_times_out() {
        let err = complete_within(&SlowReasoning, Duration::from_secs(5), "s", "u")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Reasoning(_)));
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_parse_chat_response() {
        let raw = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        assert_eq!(parse_chat_response(raw).unwrap(), "hello");
        assert!(parse_chat_response(r#"{"choices":[]}"#).is_err());
        assert!(parse_chat_response("not json").is_err());
    }

    #[test]
    fn test_parse_messages_response() {
        let raw = r#"{"content":[{"type":"text","text":"root "},{"type":"text","text":"cause"}]}"#;
        assert_eq!(parse_messages_response(raw).unwrap(), "root cause");
        assert!(parse_messages_response(r#"{"content":[]}"#).is_err());
    }

    #[test]
    fn test_endpoints_per_provider() {
        let ollama = HttpReasoningClient::new(ReasoningConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..ReasoningConfig::default()
        })
        .unwrap();
        assert_eq!(ollama.endpoint(), "http://localhost:11434/v1/chat/completions");

        let anthropic = HttpReasoningClient::new(ReasoningConfig {
            provider: ReasoningProvider::Anthropic,
            base_url: "https://api.anthropic.com".to_string(),
            api_key: Some("key".to_string()),
            ..ReasoningConfig::default()
        })
        .unwrap();
        assert_eq!(anthropic.endpoint(), "https://api.anthropic.com/v1/messages");
        let headers = anthropic.headers().unwrap();
        assert_eq!(headers["x-api-key"], "key");
    }

    #[test]
    fn test_hosted_provider_requires_key() {
        let result = HttpReasoningClient::new(ReasoningConfig {
            provider: ReasoningProvider::OpenAi,
            api_key: None,
            ..ReasoningConfig::default()
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }
}

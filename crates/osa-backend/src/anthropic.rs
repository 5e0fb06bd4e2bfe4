//! Anthropic messages backend

use crate::backend::{
    truncate_body, AttemptError, GenerationBackend, GenerationOutput, GenerationRequest, TokenUsage,
};
use crate::config::BackendConfig;
use crate::openai::classify_transport;
use async_trait::async_trait;
use osa_types::{ConfigError, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    system: &'a str,
    messages: [Message<'a>; 1],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

/// Anthropic messages API client
#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Build client from configuration
    ///
    /// # Errors
    /// [`ConfigError`] when validation fails or the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                field: "http_client",
                value: e.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint: format!("{}/messages", config.endpoint()),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model_name().to_string(),
        })
    }
}

#[async_trait]
impl GenerationBackend for AnthropicBackend {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationOutput, AttemptError> {
        let body = MessagesRequest {
            model: &self.model,
            system: &request.system,
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.options.max_tokens,
            temperature: request.options.temperature,
        };

        debug!(model = %self.model, kind = ?request.kind, "sending messages request");
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AttemptError::Status {
                status: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ValidationError::new(PROVIDER, format!("unexpected response body: {e}")))?;

        let content: String = parsed
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        if content.trim().is_empty() {
            return Err(ValidationError::new(PROVIDER, "response has no text content").into());
        }

        let usage = parsed.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            prompt_tokens: u.input_tokens,
            completion_tokens: u.output_tokens,
        });

        Ok(GenerationOutput {
            content,
            usage,
            finish_reason: parsed.stop_reason.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    #[test]
    fn endpoint_from_default_base() {
        let config = BackendConfig::new(ProviderKind::Anthropic).with_api_key("key");
        let backend = AnthropicBackend::new(&config).unwrap();
        assert_eq!(backend.endpoint, "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn text_blocks_are_joined() {
        let raw = r#"{"content":[{"type":"text","text":"{\"a\":"},{"type":"text","text":"1}"}],
                      "stop_reason":"end_turn","usage":{"input_tokens":5,"output_tokens":3}}"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        let joined: String = parsed.content.iter().filter_map(|b| b.text.as_deref()).collect();
        assert_eq!(joined, "{\"a\":1}");
    }
}

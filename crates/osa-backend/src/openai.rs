//! OpenAI chat-completions backend

use crate::backend::{
    truncate_body, AttemptError, GenerationBackend, GenerationOutput, GenerationRequest, TokenUsage,
};
use crate::config::BackendConfig;
use async_trait::async_trait;
use osa_types::{ConfigError, ValidationError};
use serde::{Deserialize, Serialize};
use tracing::debug;

const PROVIDER: &str = "openai";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

/// OpenAI-compatible chat-completions client
#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
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
            endpoint: format!("{}/chat/completions", config.endpoint()),
            api_key: config.api_key.clone().unwrap_or_default(),
            model: config.model_name().to_string(),
        })
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &GenerationRequest) -> Result<GenerationOutput, AttemptError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: request.options.temperature,
            max_tokens: request.options.max_tokens,
            response_format: ResponseFormat { kind: "json_object" },
        };

        debug!(model = %self.model, kind = ?request.kind, "sending chat completion");
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
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

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ValidationError::new(PROVIDER, format!("unexpected response body: {e}")))?;

        let usage = parsed.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
        });
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ValidationError::new(PROVIDER, "response has no choices"))?;
        let content = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ValidationError::new(PROVIDER, "choice has no content"))?;

        Ok(GenerationOutput {
            content,
            usage,
            finish_reason: choice.finish_reason.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

/// Map a reqwest transport error onto an attempt error
pub(crate) fn classify_transport(error: reqwest::Error) -> AttemptError {
    if error.is_timeout() {
        AttemptError::Timeout
    } else {
        AttemptError::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;

    #[test]
    fn requires_credentials() {
        assert!(matches!(
            OpenAiBackend::new(&BackendConfig::new(ProviderKind::OpenAi)),
            Err(ConfigError::MissingCredential { .. })
        ));
    }

    #[test]
    fn endpoint_and_model_from_config() {
        let config = BackendConfig::new(ProviderKind::OpenAi)
            .with_api_key("sk-test")
            .with_base_url("http://127.0.0.1:8080/v1/")
            .with_model("gpt-test");
        let backend = OpenAiBackend::new(&config).unwrap();
        assert_eq!(backend.endpoint, "http://127.0.0.1:8080/v1/chat/completions");
        assert_eq!(backend.model(), "gpt-test");
        assert_eq!(backend.provider(), "openai");
    }

    #[test]
    fn response_shape_parses() {
        let raw = r#"{"choices":[{"message":{"content":"{}"},"finish_reason":"stop"}],
                      "usage":{"prompt_tokens":10,"completion_tokens":2}}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices.len(), 1);
        assert_eq!(parsed.usage.map(|u| u.completion_tokens), Some(2));
    }
}

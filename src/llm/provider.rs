//! Chat-completion providers

use crate::config::LlmConfig;
use crate::error::{Result, SqlGuardError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A text-generation service taking a system and user prompt.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Return the model's reply to `prompt`.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;
}

/// Provider for any endpoint speaking the OpenAI chat-completions protocol.
pub struct OpenAiCompatibleProvider {
    config: LlmConfig,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    /// Create a provider. An API key is required.
    pub fn new(config: LlmConfig) -> Result<Self> {
        if config.api_key.as_deref().map_or(true, str::is_empty) {
            return Err(SqlGuardError::Config("LLM API key is required".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SqlGuardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.model, prompt_len = prompt.len(), "Sending chat completion");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.as_deref().unwrap_or(""))
            .json(&request)
            .send()
            .await
            .map_err(|e| SqlGuardError::Network(format!("LLM request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SqlGuardError::Network(format!(
                "LLM API error {}: {}",
                status, body
            )));
        }

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| SqlGuardError::Network(format!("Failed to parse LLM response: {}", e)))?;

        data.into_content()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

impl ChatResponse {
    fn into_content(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| SqlGuardError::Network("No choices in LLM response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_key(key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: key.map(String::from),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_api_key_required() {
        assert!(matches!(
            OpenAiCompatibleProvider::new(config_with_key(None)),
            Err(SqlGuardError::Config(_))
        ));
        assert!(OpenAiCompatibleProvider::new(config_with_key(Some(""))).is_err());
        assert!(OpenAiCompatibleProvider::new(config_with_key(Some("sk-test"))).is_ok());
    }

    #[test]
    fn test_endpoint_trims_slash() {
        let mut config = config_with_key(Some("k"));
        config.api_base = "http://localhost:8080/v1/".into();
        let provider = OpenAiCompatibleProvider::new(config).unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_response_content() {
        let data: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"SELECT 1"}}]}"#,
        )
        .unwrap();
        assert_eq!(data.into_content().unwrap(), "SELECT 1");
    }

    #[test]
    fn test_response_without_choices() {
        let data: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(data.into_content(), Err(SqlGuardError::Network(_))));
    }

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "m",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: 0.0,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["model"], "m");
    }
}

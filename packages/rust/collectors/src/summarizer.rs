//! Chat-completions client implementing [`TextSummarizer`].
//!
//! Works against any OpenAI-compatible endpoint. Without an API key every call
//! returns `Ok(None)` so the link summarizer falls back to an excerpt.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use press_shared::{LlmConfig, PressError, Result};

use crate::TextSummarizer;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions summarizer.
pub struct OpenAiSummarizer {
    http: Client,
    config: LlmConfig,
    api_key: Option<String>,
}

impl OpenAiSummarizer {
    /// `api_key` is usually [`press_shared::api_key`] applied to `config`.
    pub fn new(http: Client, config: LlmConfig, api_key: Option<String>) -> Self {
        Self {
            http,
            config,
            api_key,
        }
    }
}

#[async_trait]
impl TextSummarizer for OpenAiSummarizer {
    async fn summarize(&self, prompt: &str, text: &str) -> Result<Option<String>> {
        let Some(api_key) = self.api_key.as_deref() else {
            warn!(env = %self.config.api_key_env, "API key not set, skipping LLM call");
            return Ok(None);
        };

        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: prompt,
                },
                ChatMessage {
                    role: "user",
                    content: text,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        debug!(model = %self.config.model, "chat completion request");

        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| PressError::Summarize(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PressError::Summarize(format!(
                "API error ({status}): {error_text}"
            )));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| PressError::Summarize(format!("invalid response: {e}")))?;

        Ok(body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> LlmConfig {
        LlmConfig {
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  A short summary. "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summarizer =
            OpenAiSummarizer::new(Client::new(), config(&server), Some("sk-test".into()));
        let out = summarizer.summarize("be brief", "long text").await.unwrap();
        assert_eq!(out.as_deref(), Some("A short summary."));
    }

    #[tokio::test]
    async fn missing_key_skips_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let summarizer = OpenAiSummarizer::new(Client::new(), config(&server), None);
        assert_eq!(summarizer.summarize("p", "t").await.unwrap(), None);
    }

    #[tokio::test]
    async fn api_error_is_summarize_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let summarizer =
            OpenAiSummarizer::new(Client::new(), config(&server), Some("sk-test".into()));
        let err = summarizer.summarize("p", "t").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn empty_choices_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let summarizer =
            OpenAiSummarizer::new(Client::new(), config(&server), Some("sk-test".into()));
        assert_eq!(summarizer.summarize("p", "t").await.unwrap(), None);
    }
}

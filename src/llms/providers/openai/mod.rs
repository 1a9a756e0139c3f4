//! OpenAI-compatible chat completions provider.
//!
//! Talks to `POST {base_url}/chat/completions` with bearer authentication.
//! Transport errors, 429 and 5xx responses are retried with exponential
//! backoff; other client errors fail immediately.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::llms::base_llm::{BaseLLM, LLMMessage};
use crate::utilities::errors::LLMError;
use crate::utilities::string_utils::truncate_for_log;

/// Default API base URL.
pub const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat completions over HTTP.
#[derive(Debug, Clone)]
pub struct OpenAICompletion {
    api_key: Option<String>,
    base_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout: f64,
    /// Retries after the first attempt.
    pub max_retries: u32,
}

impl OpenAICompletion {
    /// Create a provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Optional API key (defaults to `OPENAI_API_KEY`).
    /// * `base_url` - Optional base URL (defaults to `https://api.openai.com/v1`).
    pub fn new(api_key: Option<String>, base_url: Option<String>) -> Self {
        let api_key = api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok());
        Self {
            api_key,
            base_url,
            timeout: 60.0,
            max_retries: 2,
        }
    }

    /// The effective API base URL.
    pub fn api_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| OPENAI_DEFAULT_BASE_URL.to_string())
    }

    /// Build the request body for the Chat Completions API.
    pub fn build_request_body(&self, messages: &[LLMMessage], model: &str, temperature: f64) -> Value {
        serde_json::json!({
            "model": model,
            "messages": messages,
            "temperature": temperature,
        })
    }

    /// Extract the trimmed text of the first choice.
    ///
    /// `status` is the HTTP status the body arrived with; an in-band
    /// `error` object is reported under it.
    pub fn parse_response(response: &Value, status: u16) -> Result<String, LLMError> {
        if let Some(err) = response.get("error") {
            let msg = err
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("Unknown API error");
            return Err(LLMError::Api {
                status,
                message: msg.to_string(),
            });
        }

        let content = response
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| LLMError::Parse("no message content in first choice".to_string()))?;

        if let Some(usage) = response.get("usage") {
            log::debug!(
                "OpenAI token usage: prompt={}, completion={}, total={}",
                usage.get("prompt_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("completion_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
                usage.get("total_tokens").and_then(|v| v.as_i64()).unwrap_or(0),
            );
        }

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(LLMError::EmptyResponse);
        }
        Ok(trimmed.to_string())
    }
}

#[async_trait]
impl BaseLLM for OpenAICompletion {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn call(
        &self,
        messages: Vec<LLMMessage>,
        model: &str,
        temperature: f64,
    ) -> Result<String, LLMError> {
        log::debug!(
            "OpenAICompletion.call: model={}, messages={}",
            model,
            messages.len()
        );

        let api_key = self.api_key.as_ref().ok_or_else(|| LLMError::MissingApiKey {
            provider: self.provider().to_string(),
        })?;

        let body = self.build_request_body(&messages, model, temperature);
        let endpoint = format!("{}/chat/completions", self.api_base_url());
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(self.timeout))
            .build()
            .map_err(|e| LLMError::Transport(e.to_string()))?;

        let mut last_error = LLMError::Transport("no attempt made".to_string());
        let mut retry_delay = Duration::from_secs(1);

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                log::warn!("OpenAI API retry attempt {} after {:?}", attempt, retry_delay);
                tokio::time::sleep(retry_delay).await;
                retry_delay *= 2;
            }

            let response = match client
                .post(&endpoint)
                .bearer_auth(api_key)
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = LLMError::Transport(e.to_string());
                    continue;
                }
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                last_error = LLMError::RateLimited("429 Too Many Requests".to_string());
                continue;
            }
            if status.is_server_error() {
                last_error = LLMError::Api {
                    status: status.as_u16(),
                    message: "server error".to_string(),
                };
                continue;
            }

            let response_text = match response.text().await {
                Ok(text) => text,
                Err(e) => {
                    last_error = LLMError::Transport(e.to_string());
                    continue;
                }
            };

            if status.is_client_error() {
                return Err(LLMError::Api {
                    status: status.as_u16(),
                    message: truncate_for_log(&response_text, 500).to_string(),
                });
            }

            let response_json: Value = serde_json::from_str(&response_text).map_err(|e| {
                LLMError::Parse(format!(
                    "{} - Body: {}",
                    e,
                    truncate_for_log(&response_text, 500)
                ))
            })?;
            return Self::parse_response(&response_json, status.as_u16());
        }

        Err(last_error)
    }
}

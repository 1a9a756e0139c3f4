//! Language-model capability.
//!
//! Persona agents reach a chat model through the [`BaseLLM`] trait only; the
//! prompt content and transport are the implementor's business.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utilities::errors::LLMError;

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Behavioral instructions (the persona prompt).
    System,
    /// End-user input.
    User,
    /// Model output.
    Assistant,
}

/// A single message in an LLM conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LLMMessage {
    pub role: MessageRole,
    pub content: String,
}

impl LLMMessage {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Chat-completion capability.
///
/// Implementations must report transport, quota and parse failures as
/// [`LLMError`] rather than returning an empty or placeholder answer.
#[async_trait]
pub trait BaseLLM: Send + Sync + fmt::Debug {
    /// Provider name used in logs.
    fn provider(&self) -> &str {
        "openai"
    }

    /// Complete `messages` with `model` at `temperature`.
    async fn call(
        &self,
        messages: Vec<LLMMessage>,
        model: &str,
        temperature: f64,
    ) -> Result<String, LLMError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_with_lowercase_role() {
        let json = serde_json::to_value(LLMMessage::system("be brief")).unwrap();
        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "be brief");
    }
}

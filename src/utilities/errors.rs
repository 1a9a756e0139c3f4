//! Error types shared across the crate.
//!
//! Tool failures are recovered locally and rendered inline; model, memory and
//! pipeline failures propagate to the caller as distinct variants.

use thiserror::Error;

/// A named external tool could not produce a result.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool did not answer within its time budget.
    #[error("tool '{tool}' timed out after {seconds} seconds")]
    Timeout { tool: String, seconds: u64 },

    /// Transport-level failure talking to the backing service.
    #[error("{tool} request failed: {message}")]
    Http { tool: String, message: String },

    /// The backing service answered with something we could not read.
    #[error("{tool} returned a malformed response: {message}")]
    Parse { tool: String, message: String },

    /// Credentials required by the tool are not configured.
    #[error("{message}")]
    Credentials { message: String },

    /// Any other tool-specific failure.
    #[error("{tool} failed: {message}")]
    Failed { tool: String, message: String },
}

impl ToolError {
    /// Convenience constructor for [`ToolError::Failed`].
    pub fn failed(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// The language-model capability could not produce a completion.
#[derive(Debug, Error)]
pub enum LLMError {
    /// No API key was supplied or found in the environment.
    #[error("API key not set for provider '{provider}'")]
    MissingApiKey { provider: String },

    /// The request never produced an HTTP response.
    #[error("LLM transport error: {0}")]
    Transport(String),

    /// Quota exhausted or rate limited after all retries.
    #[error("LLM rate limited: {0}")]
    RateLimited(String),

    /// The provider rejected the request.
    #[error("LLM API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider answered but the body could not be interpreted.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The completion contained no text.
    #[error("LLM returned an empty completion")]
    EmptyResponse,
}

/// Errors raised by a memory backend.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// A storage backend operation failed.
    #[error("memory storage error: {message}")]
    Storage { message: String },

    /// A stored record could not be decoded.
    #[error("corrupt memory record: {message}")]
    Corrupt { message: String },
}

impl From<rusqlite::Error> for MemoryError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for MemoryError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage {
            message: format!("{:#}", err),
        }
    }
}

/// A review stage failed; the whole pipeline call is aborted.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The inbound wire message could not be decoded.
    #[error("stage '{stage}' could not decode message: {source}")]
    Decode {
        stage: String,
        #[source]
        source: serde_json::Error,
    },

    /// The outbound message could not be encoded.
    #[error("stage '{stage}' could not encode message: {source}")]
    Encode {
        stage: String,
        #[source]
        source: serde_json::Error,
    },

    /// A stage policy rejected or failed on the message.
    #[error("stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    /// An extra key collides with a field the pipeline owns.
    #[error("'{key}' is a reserved pipeline message key")]
    ReservedKey { key: String },
}

/// Errors surfaced by [`crate::agents::PersonaAgent`] operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The language model failed; nothing was recorded into memory.
    #[error(transparent)]
    Model(#[from] LLMError),

    /// Episodic memory or the semantic index failed.
    #[error(transparent)]
    Memory(#[from] MemoryError),

    /// The review pipeline aborted.
    #[error(transparent)]
    Review(#[from] PipelineError),
}

//! Shared utilities: configuration, errors, storage paths and string helpers.

pub mod config;
pub mod errors;
pub mod paths;
pub mod string_utils;

pub use config::PersonaConfig;
pub use errors::{AgentError, LLMError, MemoryError, PipelineError, ToolError};

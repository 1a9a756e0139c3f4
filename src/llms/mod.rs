//! LLM capability and providers.
//!
//! - [`base_llm`] - the [`BaseLLM`] trait and message types
//! - [`providers`] - concrete HTTP providers

pub mod base_llm;
pub mod providers;

pub use base_llm::{BaseLLM, LLMMessage, MessageRole};
pub use providers::openai::OpenAICompletion;

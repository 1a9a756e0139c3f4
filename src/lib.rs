//! # persona-crew
//!
//! Personalized assistant agents with dual memory and a multi-agent review
//! pipeline.
//!
//! Each user gets a [`PersonaAgent`] holding an append-only episodic log of
//! their exchanges and a semantic profile recomputed from its tail. The
//! profile personalizes the system prompt; tools and an optional LLM produce
//! a draft answer, which the [`ManagerAgent`] can pass through critique,
//! fact-check and validation stages. Long-term memory lives in a per-user
//! [`SemanticIndex`].

pub mod agents;
pub mod llms;
pub mod memory;
pub mod rag;
pub mod session;
pub mod tools;
pub mod utilities;

// Re-exports
pub use agents::persona_agent::{AgentReply, PersonaAgent};
pub use agents::registry::AgentRegistry;
pub use agents::review::{AggregatedReview, ManagerAgent, PipelineMessage, ReviewStage};
pub use llms::base_llm::{BaseLLM, LLMMessage};
pub use llms::providers::openai::OpenAICompletion;
pub use memory::{EpisodicMemory, MemoryEvent, SemanticProfile};
pub use rag::index::SemanticIndex;
pub use session::{classify_query, QueryRoute, SessionContext, SessionReply};
pub use tools::{Tool, ToolCapability, ToolSet};
pub use utilities::config::PersonaConfig;
pub use utilities::errors::{AgentError, LLMError, MemoryError, PipelineError, ToolError};

/// Library version.
pub const VERSION: &str = "0.3.0";

//! Agents.
//!
//! - [`persona_agent`] - per-user personalized assistant
//! - [`registry`] - session-scoped agent registry
//! - [`review`] - the critique / fact-check / validation pipeline

pub mod persona_agent;
pub mod registry;
pub mod review;

// Re-exports for convenience
pub use persona_agent::{AgentReply, PersonaAgent};
pub use registry::{AgentGuard, AgentRegistry};
pub use review::{
    create_review_pipeline, AggregatedReview, CriticAgent, FactCheckAgent, ManagerAgent,
    PipelineMessage, ReviewStage, ValidatorAgent,
};

//! Multi-agent review pipeline.
//!
//! A draft enters the [`ManagerAgent`], which hands it through
//! [`CriticAgent`], [`FactCheckAgent`] and [`ValidatorAgent`] as a JSON
//! [`PipelineMessage`] and returns an [`AggregatedReview`] of every snapshot.

pub mod critic;
pub mod fact_check;
pub mod manager;
pub mod message;
pub mod validator;

use std::fmt;

use async_trait::async_trait;

pub use critic::CriticAgent;
pub use fact_check::FactCheckAgent;
pub use manager::{create_review_pipeline, AggregatedReview, ManagerAgent};
pub use message::PipelineMessage;
pub use validator::ValidatorAgent;

use crate::utilities::errors::PipelineError;

/// One stage of the review chain.
///
/// Implementors provide [`ReviewStage::review`] over the typed message; the
/// wire-level [`ReviewStage::receive`] decodes and re-encodes around it.
#[async_trait]
pub trait ReviewStage: Send + Sync + fmt::Debug {
    /// Stage name used in errors and logs.
    fn name(&self) -> &str;

    /// Add this stage's verdict to `message`.
    async fn review(&self, message: PipelineMessage) -> Result<PipelineMessage, PipelineError>;

    /// Decode `message_json`, review it and encode the result.
    async fn receive(&self, message_json: &str) -> Result<String, PipelineError> {
        let message = PipelineMessage::from_wire(self.name(), message_json)?;
        self.review(message).await?.to_wire(self.name())
    }
}

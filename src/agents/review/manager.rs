//! The manager stage: drives the fixed review chain and aggregates results.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::critic::CriticAgent;
use super::fact_check::FactCheckAgent;
use super::message::PipelineMessage;
use super::validator::ValidatorAgent;
use super::ReviewStage;
use crate::utilities::errors::PipelineError;

/// Name the manager reports in aggregates.
pub const MANAGER_NAME: &str = "Manager";

/// Every snapshot of one pipeline run.
///
/// `original` is the input; `critic`, `factcheck` and `validation` are the
/// full message as it left the corresponding stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedReview {
    pub manager: String,
    pub original: PipelineMessage,
    pub critic: PipelineMessage,
    pub factcheck: PipelineMessage,
    pub validation: PipelineMessage,
}

impl AggregatedReview {
    /// The final validation verdict.
    pub fn verdict(&self) -> Option<&str> {
        self.validation.validation()
    }
}

/// Runs Critic, FactCheck and Validator in order.
///
/// Stages exchange the JSON wire form. The first failing stage aborts the
/// run; no partial aggregate is produced.
#[derive(Debug, Clone)]
pub struct ManagerAgent {
    name: String,
    critic: Arc<dyn ReviewStage>,
    factcheck: Arc<dyn ReviewStage>,
    validator: Arc<dyn ReviewStage>,
}

impl Default for ManagerAgent {
    fn default() -> Self {
        Self::with_stages(
            Arc::new(CriticAgent),
            Arc::new(FactCheckAgent),
            Arc::new(ValidatorAgent),
        )
    }
}

impl ManagerAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manager around custom stage policies.
    ///
    /// # Arguments
    ///
    /// * `critic` - First stage; adds the critique.
    /// * `factcheck` - Second stage; adds the fact-check verdict.
    /// * `validator` - Final stage; adds the validation verdict.
    pub fn with_stages(
        critic: Arc<dyn ReviewStage>,
        factcheck: Arc<dyn ReviewStage>,
        validator: Arc<dyn ReviewStage>,
    ) -> Self {
        Self {
            name: MANAGER_NAME.to_string(),
            critic,
            factcheck,
            validator,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wire-level entry point: JSON message in, JSON aggregate out.
    pub async fn receive(&self, message_json: &str) -> Result<String, PipelineError> {
        let original = PipelineMessage::from_wire(&self.name, message_json)?;
        let aggregate = self.review(original).await?;
        serde_json::to_string(&aggregate).map_err(|source| PipelineError::Encode {
            stage: self.name.clone(),
            source,
        })
    }

    /// Run the chain over `message`.
    pub async fn review(&self, message: PipelineMessage) -> Result<AggregatedReview, PipelineError> {
        log::info!(
            "{}: reviewing message ({} chars)",
            self.name,
            message.content.chars().count()
        );

        let original_wire = message.to_wire(&self.name)?;
        let critic_wire = self.run_stage(self.critic.as_ref(), &original_wire).await?;
        let factcheck_wire = self.run_stage(self.factcheck.as_ref(), &critic_wire).await?;
        let validation_wire = self
            .run_stage(self.validator.as_ref(), &factcheck_wire)
            .await?;

        Ok(AggregatedReview {
            manager: self.name.clone(),
            original: message,
            critic: PipelineMessage::from_wire(&self.name, &critic_wire)?,
            factcheck: PipelineMessage::from_wire(&self.name, &factcheck_wire)?,
            validation: PipelineMessage::from_wire(&self.name, &validation_wire)?,
        })
    }

    async fn run_stage(&self, stage: &dyn ReviewStage, input: &str) -> Result<String, PipelineError> {
        match stage.receive(input).await {
            Ok(output) => {
                log::debug!("{}: stage '{}' completed", self.name, stage.name());
                Ok(output)
            }
            Err(e) => {
                log::error!("{}: stage '{}' failed: {}", self.name, stage.name(), e);
                Err(e)
            }
        }
    }
}

/// The default Manager → Critic → FactCheck → Validator pipeline.
pub fn create_review_pipeline() -> ManagerAgent {
    ManagerAgent::default()
}

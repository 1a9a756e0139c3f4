use async_trait::async_trait;

use super::message::PipelineMessage;
use super::ReviewStage;
use crate::utilities::errors::PipelineError;

/// Adds a critique of the draft content.
#[derive(Debug, Clone, Default)]
pub struct CriticAgent;

#[async_trait]
impl ReviewStage for CriticAgent {
    fn name(&self) -> &str {
        "Critic"
    }

    async fn review(&self, mut message: PipelineMessage) -> Result<PipelineMessage, PipelineError> {
        let critique = format!(
            "Critique: The message '{}' is being reviewed.",
            message.content
        );
        message.set_critic(critique);
        Ok(message)
    }
}

use async_trait::async_trait;

use super::message::PipelineMessage;
use super::ReviewStage;
use crate::utilities::errors::PipelineError;

/// Adds a fact-check verdict.
///
/// Judges `content` alone; an existing critique never influences it.
#[derive(Debug, Clone, Default)]
pub struct FactCheckAgent;

#[async_trait]
impl ReviewStage for FactCheckAgent {
    fn name(&self) -> &str {
        "FactCheck"
    }

    async fn review(&self, mut message: PipelineMessage) -> Result<PipelineMessage, PipelineError> {
        let verdict = format!(
            "FactCheck: The statement '{}' appears plausible.",
            message.content
        );
        message.set_factcheck(verdict);
        Ok(message)
    }
}

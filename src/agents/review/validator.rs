use async_trait::async_trait;

use super::message::PipelineMessage;
use super::ReviewStage;
use crate::utilities::errors::PipelineError;

/// Verdict when every earlier stage has reported.
pub const ALL_CHECKS_PASSED: &str = "Validation: All checks passed.";

/// Confirms the critique and fact-check stages both ran.
#[derive(Debug, Clone, Default)]
pub struct ValidatorAgent;

#[async_trait]
impl ReviewStage for ValidatorAgent {
    fn name(&self) -> &str {
        "Validator"
    }

    async fn review(&self, mut message: PipelineMessage) -> Result<PipelineMessage, PipelineError> {
        let mut missing = Vec::new();
        if message.critic().is_none() {
            missing.push("critic");
        }
        if message.factcheck().is_none() {
            missing.push("factcheck");
        }

        let verdict = if missing.is_empty() {
            ALL_CHECKS_PASSED.to_string()
        } else {
            log::warn!("Validator: missing review stages {:?}", missing);
            format!("Validation: Missing review stages: {}.", missing.join(", "))
        };
        message.set_validation(verdict);
        Ok(message)
    }
}

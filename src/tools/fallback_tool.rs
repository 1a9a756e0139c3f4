//! Primary/secondary tool composition.

use std::sync::Arc;

use async_trait::async_trait;

use super::base_tool::{Tool, ToolCapability};
use crate::utilities::errors::ToolError;

/// Asks `primary` first and falls back to `secondary`.
///
/// The fallback triggers when the primary fails, or when its output mentions
/// `error` or `credentials` (case-insensitive): some backends report failure
/// in-band.
#[derive(Debug, Clone)]
pub struct FallbackTool {
    name: String,
    primary: Arc<dyn Tool>,
    secondary: Arc<dyn Tool>,
}

impl FallbackTool {
    pub fn new(name: impl Into<String>, primary: Arc<dyn Tool>, secondary: Arc<dyn Tool>) -> Self {
        Self {
            name: name.into(),
            primary,
            secondary,
        }
    }

    fn reports_failure(output: &str) -> bool {
        let lowered = output.to_lowercase();
        lowered.contains("error") || lowered.contains("credentials")
    }
}

#[async_trait]
impl Tool for FallbackTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> ToolCapability {
        self.primary.capability()
    }

    async fn run(&self, query: &str) -> Result<String, ToolError> {
        match self.primary.run(query).await {
            Ok(output) if !Self::reports_failure(&output) => Ok(output),
            Ok(output) => {
                log::info!(
                    "Tool '{}' answered with a failure message, falling back to '{}': {}",
                    self.primary.name(),
                    self.secondary.name(),
                    output
                );
                self.secondary.run(query).await
            }
            Err(e) => {
                log::info!(
                    "Tool '{}' failed, falling back to '{}': {}",
                    self.primary.name(),
                    self.secondary.name(),
                    e
                );
                self.secondary.run(query).await
            }
        }
    }
}

//! Tool exposing an agent's recent episodic memory.

use async_trait::async_trait;

use super::base_tool::{Tool, ToolCapability};
use crate::memory::episodic::{render_events, EpisodicMemory, DEFAULT_TOP_K};
use crate::utilities::errors::ToolError;

/// Output when nothing has been recorded yet.
pub const NO_MEMORY: &str = "No memory found.";

/// Renders the last `window` exchanges of one user's episodic memory.
#[derive(Debug, Clone)]
pub struct MemoryTool {
    memory: EpisodicMemory,
    window: usize,
}

impl MemoryTool {
    /// Create a tool reading `memory` with the default window of 4.
    pub fn new(memory: EpisodicMemory) -> Self {
        Self::with_window(memory, DEFAULT_TOP_K)
    }

    pub fn with_window(memory: EpisodicMemory, window: usize) -> Self {
        Self { memory, window }
    }
}

#[async_trait]
impl Tool for MemoryTool {
    fn name(&self) -> &str {
        "memory"
    }

    fn capability(&self) -> ToolCapability {
        ToolCapability::Memory
    }

    async fn run(&self, query: &str) -> Result<String, ToolError> {
        let events = self
            .memory
            .retrieve(query, self.window)
            .map_err(|e| ToolError::failed("memory", e.to_string()))?;
        if events.is_empty() {
            return Ok(NO_MEMORY.to_string());
        }
        Ok(render_events(&events))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_tool_renders_recent_events() {
        let memory = EpisodicMemory::in_memory("userA");
        let tool = MemoryTool::with_window(memory.clone(), 2);
        assert_eq!(tool.run("anything").await.unwrap(), NO_MEMORY);

        memory.add_event("q1", "a1", None).unwrap();
        memory.add_event("q2", "a2", None).unwrap();
        memory.add_event("q3", "a3", None).unwrap();
        assert_eq!(
            tool.run("anything").await.unwrap(),
            "Q: q2 | A: a2; Q: q3 | A: a3"
        );
    }
}

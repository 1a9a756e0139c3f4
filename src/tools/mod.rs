//! Tools available to persona agents.
//!
//! Every tool implements [`Tool`] and declares one [`ToolCapability`]. Agents
//! receive tools as an ordered [`ToolSet`].

pub mod base_tool;
pub mod fallback_tool;
pub mod memory_tool;
pub mod search_tool;
pub mod wikipedia_tool;

// Re-exports for convenience
pub use base_tool::{render_outcome, run_with_timeout, FnTool, Tool, ToolCapability, ToolSet};
pub use fallback_tool::FallbackTool;
pub use memory_tool::MemoryTool;
pub use search_tool::BrightDataSearchTool;
pub use wikipedia_tool::WikipediaTool;

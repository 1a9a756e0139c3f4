//! Base tool definitions.
//!
//! Provides the [`Tool`] trait every information-retrieval capability
//! implements, the closed [`ToolCapability`] set, the closure-backed
//! [`FnTool`], and [`ToolSet`], the ordered collection an agent draws from.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::utilities::errors::ToolError;

// ---------------------------------------------------------------------------
// ToolCapability
// ---------------------------------------------------------------------------

/// What kind of information a tool provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCapability {
    /// Live web search.
    WebSearch,
    /// Encyclopedia lookup.
    Encyclopedia,
    /// The agent's own episodic memory.
    Memory,
}

impl fmt::Display for ToolCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WebSearch => "web_search",
            Self::Encyclopedia => "encyclopedia",
            Self::Memory => "memory",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Tool
// ---------------------------------------------------------------------------

/// A named capability answering a free-text query.
#[async_trait]
pub trait Tool: Send + Sync + fmt::Debug {
    /// Unique name; also the label used when rendering output.
    fn name(&self) -> &str;

    /// Capability this tool provides.
    fn capability(&self) -> ToolCapability;

    /// Answer `query`.
    async fn run(&self, query: &str) -> Result<String, ToolError>;
}

/// Run `tool` bounded by `timeout`.
///
/// Elapsed time is reported as [`ToolError::Timeout`].
pub async fn run_with_timeout(
    tool: &dyn Tool,
    query: &str,
    timeout: Duration,
) -> Result<String, ToolError> {
    match tokio::time::timeout(timeout, tool.run(query)).await {
        Ok(result) => result,
        Err(_) => {
            log::warn!(
                "Tool '{}' timed out after {:?}",
                tool.name(),
                timeout
            );
            Err(ToolError::Timeout {
                tool: tool.name().to_string(),
                seconds: timeout.as_secs(),
            })
        }
    }
}

/// Render a tool outcome as inline text: the output, or `"Error: <reason>"`.
pub fn render_outcome(outcome: &Result<String, ToolError>) -> String {
    match outcome {
        Ok(output) => output.clone(),
        Err(e) => format!("Error: {}", e),
    }
}

// ---------------------------------------------------------------------------
// FnTool
// ---------------------------------------------------------------------------

type ToolFn = Arc<dyn Fn(&str) -> Result<String, ToolError> + Send + Sync>;

/// A tool backed by a synchronous closure.
///
/// The closure runs on tokio's blocking pool, so it may block and
/// [`run_with_timeout`] still bounds it. A timed-out closure keeps running
/// in the background until it returns.
#[derive(Clone)]
pub struct FnTool {
    name: String,
    capability: ToolCapability,
    func: ToolFn,
}

impl fmt::Debug for FnTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnTool")
            .field("name", &self.name)
            .field("capability", &self.capability)
            .finish()
    }
}

impl FnTool {
    /// Create a tool from a closure.
    pub fn new<F>(name: impl Into<String>, capability: ToolCapability, func: F) -> Self
    where
        F: Fn(&str) -> Result<String, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            capability,
            func: Arc::new(func),
        }
    }

    /// Offline encyclopedia stand-in returning a canned summary line.
    pub fn static_wiki() -> Self {
        Self::new("wiki", ToolCapability::Encyclopedia, |query| {
            Ok(format!("Summary for '{}' (from Wikipedia)", query))
        })
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn capability(&self) -> ToolCapability {
        self.capability
    }

    async fn run(&self, query: &str) -> Result<String, ToolError> {
        let func = Arc::clone(&self.func);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || func(&query))
            .await
            .map_err(|e| ToolError::failed(&self.name, e.to_string()))?
    }
}

// ---------------------------------------------------------------------------
// ToolSet
// ---------------------------------------------------------------------------

/// Ordered collection of tools; iteration order is insertion order.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`ToolSet::push`].
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.push(tool);
        self
    }

    /// Append `tool`, replacing any existing tool with the same name in place.
    pub fn push(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(existing) => *existing = tool,
            None => self.tools.push(tool),
        }
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Iterate in order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.iter()
    }

    /// The first `n` tools (fewer if the set is smaller).
    pub fn first(&self, n: usize) -> &[Arc<dyn Tool>] {
        &self.tools[..n.min(self.tools.len())]
    }

    /// Look up a tool by name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// The first tool providing `capability`.
    pub fn by_capability(&self, capability: ToolCapability) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.capability() == capability)
    }

    /// Tool names in order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }
}

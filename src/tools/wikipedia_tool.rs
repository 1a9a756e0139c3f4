//! Wikipedia page-summary tool.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::base_tool::{Tool, ToolCapability};
use crate::utilities::errors::ToolError;
use crate::utilities::string_utils::strip_html;

/// REST summary endpoint prefix.
pub const WIKIPEDIA_SUMMARY_BASE: &str = "https://en.wikipedia.org/api/rest_v1/page/summary";

/// Output when the page has no extract.
pub const NO_SUMMARY: &str = "No summary found.";

const WIKIPEDIA_REQUEST_TIMEOUT: u64 = 10;

/// Looks a topic up through the Wikipedia REST summary API.
#[derive(Debug, Clone)]
pub struct WikipediaTool {
    base_url: String,
}

impl Default for WikipediaTool {
    fn default() -> Self {
        Self {
            base_url: WIKIPEDIA_SUMMARY_BASE.to_string(),
        }
    }
}

impl WikipediaTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the summary endpoint prefix.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    /// Summary URL for `topic`; spaces become underscores.
    pub fn summary_url(&self, topic: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            topic.trim().replace(' ', "_")
        )
    }

    /// Pull the plain-text extract out of a summary payload.
    pub fn parse_summary(body: &Value) -> String {
        body.get("extract")
            .and_then(Value::as_str)
            .map(|s| strip_html(s).trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| NO_SUMMARY.to_string())
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &str {
        "wikipedia"
    }

    fn capability(&self) -> ToolCapability {
        ToolCapability::Encyclopedia
    }

    async fn run(&self, query: &str) -> Result<String, ToolError> {
        let http_error = |e: reqwest::Error| ToolError::Http {
            tool: "Wikipedia".to_string(),
            message: e.to_string(),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WIKIPEDIA_REQUEST_TIMEOUT))
            .build()
            .map_err(http_error)?;

        let url = self.summary_url(query);
        log::debug!("Wikipedia lookup: {}", url);
        let body: Value = client
            .get(&url)
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?
            .json()
            .await
            .map_err(|e| ToolError::Parse {
                tool: "Wikipedia".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self::parse_summary(&body))
    }
}

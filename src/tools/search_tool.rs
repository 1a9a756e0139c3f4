//! Bright Data web search tool.
//!
//! Posts `{"query": ...}` to the dataset collection endpoint
//! `https://api.brightdata.com/dca/<dataset_id>` and returns the raw response
//! body.

use std::time::Duration;

use async_trait::async_trait;

use super::base_tool::{Tool, ToolCapability};
use crate::utilities::errors::ToolError;

/// Bright Data API base URL.
pub const BRIGHTDATA_API_BASE: &str = "https://api.brightdata.com/dca";

/// Message returned when the API key or dataset id is missing.
pub const MISSING_CREDENTIALS: &str = "Bright Data API credentials are not set.";

/// Per-request HTTP timeout in seconds.
pub const BRIGHTDATA_REQUEST_TIMEOUT: u64 = 15;

/// Web search through a Bright Data dataset.
#[derive(Debug, Clone)]
pub struct BrightDataSearchTool {
    api_key: Option<String>,
    dataset_id: Option<String>,
    base_url: String,
}

impl BrightDataSearchTool {
    /// Create a tool with explicit credentials.
    pub fn new(api_key: Option<String>, dataset_id: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.is_empty()),
            dataset_id: dataset_id.filter(|d| !d.is_empty()),
            base_url: BRIGHTDATA_API_BASE.to_string(),
        }
    }

    /// Read `BRIGHTDATA_API_KEY` and `BRIGHTDATA_DATASET_ID`.
    pub fn from_env() -> Self {
        Self::new(
            std::env::var("BRIGHTDATA_API_KEY").ok(),
            std::env::var("BRIGHTDATA_DATASET_ID").ok(),
        )
    }

    /// Override the API base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Whether both the API key and dataset id are configured.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.dataset_id.is_some()
    }

    fn endpoint(&self, dataset_id: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), dataset_id)
    }
}

#[async_trait]
impl Tool for BrightDataSearchTool {
    fn name(&self) -> &str {
        "search"
    }

    fn capability(&self) -> ToolCapability {
        ToolCapability::WebSearch
    }

    async fn run(&self, query: &str) -> Result<String, ToolError> {
        let (Some(api_key), Some(dataset_id)) = (&self.api_key, &self.dataset_id) else {
            return Err(ToolError::Credentials {
                message: MISSING_CREDENTIALS.to_string(),
            });
        };

        let http_error = |e: reqwest::Error| ToolError::Http {
            tool: "Bright Data".to_string(),
            message: e.to_string(),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(BRIGHTDATA_REQUEST_TIMEOUT))
            .build()
            .map_err(http_error)?;

        log::debug!("Bright Data search: dataset={}", dataset_id);
        let response = client
            .post(self.endpoint(dataset_id))
            .bearer_auth(api_key)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?;

        response.text().await.map_err(http_error)
    }
}

//! Runtime configuration for persona agents.
//!
//! Configuration is layered: built-in defaults, then an optional YAML file,
//! then `PERSONA_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::utilities::paths::EPISODIC_DB_FILE;

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
/// Default sampling temperature for persona answers.
pub const DEFAULT_TEMPERATURE: f64 = 0.1;
/// Default number of episodic events surfaced as context.
pub const DEFAULT_MEMORY_WINDOW: usize = 4;
/// Number of trailing events the semantic profile is built from.
pub const DEFAULT_PROFILE_WINDOW: usize = 3;
/// Per-tool time budget.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 10;
/// Cap on accumulated alignment feedback lines.
pub const DEFAULT_MAX_ALIGNMENT_LINES: usize = 20;

/// Settings shared by every agent a session creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Model identifier passed to the LLM capability.
    pub model: String,
    /// Sampling temperature for persona answers.
    pub temperature: f64,
    /// How many recent events `act` and the memory tool surface.
    pub memory_window: usize,
    /// How many trailing events feed the semantic profile.
    pub profile_window: usize,
    /// Per-tool timeout in seconds.
    pub tool_timeout_secs: u64,
    /// Maximum retained alignment feedback lines.
    pub max_alignment_lines: usize,
    /// SQLite file for episodic memory. `None` keeps memory in-process.
    pub storage_path: Option<PathBuf>,
    /// Override for the OpenAI-compatible endpoint.
    pub openai_base_url: Option<String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            memory_window: DEFAULT_MEMORY_WINDOW,
            profile_window: DEFAULT_PROFILE_WINDOW,
            tool_timeout_secs: DEFAULT_TOOL_TIMEOUT_SECS,
            max_alignment_lines: DEFAULT_MAX_ALIGNMENT_LINES,
            storage_path: None,
            openai_base_url: None,
        }
    }
}

impl PersonaConfig {
    /// Load a YAML configuration file. Missing keys take their defaults.
    pub fn from_yaml_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse YAML configuration text.
    pub fn from_yaml_str(content: &str) -> Result<Self, anyhow::Error> {
        let config: Self = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Defaults overridden by the process environment.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `PERSONA_*` overrides using `lookup` to resolve variables.
    ///
    /// Unparseable numeric values are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup("PERSONA_MODEL") {
            self.model = model;
        }
        if let Some(raw) = lookup("PERSONA_TEMPERATURE") {
            match raw.parse() {
                Ok(value) => self.temperature = value,
                Err(_) => log::warn!("Ignoring invalid PERSONA_TEMPERATURE '{}'", raw),
            }
        }
        if let Some(raw) = lookup("PERSONA_MEMORY_WINDOW") {
            match raw.parse() {
                Ok(value) => self.memory_window = value,
                Err(_) => log::warn!("Ignoring invalid PERSONA_MEMORY_WINDOW '{}'", raw),
            }
        }
        if let Some(raw) = lookup("PERSONA_PROFILE_WINDOW") {
            match raw.parse() {
                Ok(value) => self.profile_window = value,
                Err(_) => log::warn!("Ignoring invalid PERSONA_PROFILE_WINDOW '{}'", raw),
            }
        }
        if let Some(raw) = lookup("PERSONA_TOOL_TIMEOUT_SECS") {
            match raw.parse() {
                Ok(value) => self.tool_timeout_secs = value,
                Err(_) => log::warn!("Ignoring invalid PERSONA_TOOL_TIMEOUT_SECS '{}'", raw),
            }
        }
        if let Some(raw) = lookup("PERSONA_MAX_ALIGNMENT_LINES") {
            match raw.parse() {
                Ok(value) => self.max_alignment_lines = value,
                Err(_) => log::warn!("Ignoring invalid PERSONA_MAX_ALIGNMENT_LINES '{}'", raw),
            }
        }
        if let Some(dir) = lookup("PERSONA_STORAGE_DIR") {
            self.storage_path = Some(PathBuf::from(dir).join(EPISODIC_DB_FILE));
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            self.openai_base_url = Some(url);
        }
    }

    /// Per-tool timeout as a [`Duration`].
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

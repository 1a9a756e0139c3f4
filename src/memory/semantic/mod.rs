//! Semantic profile: a compact summary derived from the episodic tail.

use serde::{Deserialize, Serialize};

use crate::memory::episodic::{render_events, MemoryEvent};
use crate::utilities::config::DEFAULT_PROFILE_WINDOW;

/// Natural-language summary of a user's most recent exchanges.
///
/// The text is always recomputed from scratch from the events handed to
/// [`SemanticProfile::update`], never patched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticProfile {
    profile: String,
    window: usize,
}

impl Default for SemanticProfile {
    fn default() -> Self {
        Self::new()
    }
}

impl SemanticProfile {
    /// An empty profile summarizing the last three events.
    pub fn new() -> Self {
        Self::with_window(DEFAULT_PROFILE_WINDOW)
    }

    /// An empty profile summarizing the last `window` events.
    pub fn with_window(window: usize) -> Self {
        Self {
            profile: String::new(),
            window,
        }
    }

    /// Recompute the profile from the tail of `events`.
    pub fn update(&mut self, events: &[MemoryEvent]) {
        let start = events.len().saturating_sub(self.window);
        self.profile = render_events(&events[start..]);
    }

    /// Current profile text, `""` if never updated.
    pub fn get(&self) -> &str {
        &self.profile
    }

    /// Forget the profile.
    pub fn clear(&mut self) {
        self.profile.clear();
    }
}

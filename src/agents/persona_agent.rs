//! Per-user persona agent.
//!
//! A `PersonaAgent` owns one user's episodic memory and semantic profile,
//! renders the personalized system prompt, gathers tool context for a query
//! and records every completed exchange.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;

use crate::agents::review::{AggregatedReview, ManagerAgent, PipelineMessage};
use crate::llms::base_llm::{BaseLLM, LLMMessage};
use crate::memory::episodic::{render_events, EpisodicMemory, MemoryEvent};
use crate::memory::semantic::SemanticProfile;
use crate::memory::storage::EpisodicStorage;
use crate::rag::index::SemanticIndex;
use crate::rag::types::SearchResult;
use crate::tools::base_tool::{render_outcome, run_with_timeout, Tool, ToolSet};
use crate::tools::memory_tool::{MemoryTool, NO_MEMORY};
use crate::utilities::config::PersonaConfig;
use crate::utilities::errors::{AgentError, MemoryError};
use crate::utilities::string_utils::capitalize;

/// Placeholder in the persona template replaced by the semantic profile.
pub const PROFILE_PLACEHOLDER: &str = "[Initial Semantic Memory]";

/// Default system prompt template.
pub const PERSONA_TEMPLATE: &str = "You are a helpful personalized assistant. \
Take more than two actions to infer the user preference and answer the question. \
User summary: [Initial Semantic Memory]\n\
STRICT RULES: when using tools, always:\n\
1. Think step-by-step about what information you need.\n\
2. MUST use at least TWO tools to answer the question.\n\
3. Use tools precisely and deliberately and try to get the most accurate information from different tools.\n\
4. Provide clear, concise responses. Do not give explanation in the final answer.";

/// How many tools [`PersonaAgent::act`] consults.
pub const TOOLS_PER_ACT: usize = 2;

/// Key read from each feedback item by [`PersonaAgent::test_time_alignment`].
pub const FEEDBACK_KEY: &str = "feedback";

/// Result of [`PersonaAgent::respond`].
#[derive(Debug, Clone)]
pub struct AgentReply {
    /// The drafted answer, as recorded into memory.
    pub answer: String,
    /// Review aggregate, when a reviewer was supplied.
    pub review: Option<AggregatedReview>,
}

/// Personalized assistant for a single user.
#[derive(Debug)]
pub struct PersonaAgent {
    user_id: String,
    episodic: EpisodicMemory,
    profile: SemanticProfile,
    persona_template: String,
    alignment: VecDeque<String>,
    config: Arc<PersonaConfig>,
}

impl PersonaAgent {
    /// Create an agent with private in-process memory and default settings.
    pub fn new(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let episodic = EpisodicMemory::in_memory(user_id.clone());
        Self::from_parts(user_id, episodic, Arc::new(PersonaConfig::default()))
    }

    /// Create an agent over shared episodic storage.
    ///
    /// Events already stored for `user_id` are kept and the profile is
    /// recomputed from them.
    pub fn with_storage(
        user_id: impl Into<String>,
        storage: Arc<dyn EpisodicStorage>,
        config: Arc<PersonaConfig>,
    ) -> Self {
        let user_id = user_id.into();
        let episodic = EpisodicMemory::new(user_id.clone(), storage);
        Self::from_parts(user_id, episodic, config)
    }

    fn from_parts(user_id: String, episodic: EpisodicMemory, config: Arc<PersonaConfig>) -> Self {
        let mut agent = Self {
            user_id,
            episodic,
            profile: SemanticProfile::with_window(config.profile_window),
            persona_template: PERSONA_TEMPLATE.to_string(),
            alignment: VecDeque::new(),
            config,
        };
        if let Err(e) = agent.refresh_profile() {
            log::warn!(
                "Could not load stored history for user '{}': {}",
                agent.user_id,
                e
            );
        }
        agent
    }

    /// Replace the persona template. It should contain [`PROFILE_PLACEHOLDER`].
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.persona_template = template.into();
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// This agent's episodic memory.
    pub fn episodic(&self) -> &EpisodicMemory {
        &self.episodic
    }

    /// This agent's semantic profile.
    pub fn profile(&self) -> &SemanticProfile {
        &self.profile
    }

    pub fn config(&self) -> &PersonaConfig {
        &self.config
    }

    /// Retained alignment feedback lines, oldest first.
    pub fn alignment_feedback(&self) -> impl Iterator<Item = &str> {
        self.alignment.iter().map(String::as_str)
    }

    /// The system prompt for the current state.
    ///
    /// The template with the profile substituted, followed by one line per
    /// retained alignment preference.
    pub fn get_persona(&self) -> String {
        let mut persona = self
            .persona_template
            .replace(PROFILE_PLACEHOLDER, self.profile.get());
        if !self.alignment.is_empty() {
            persona.push('\n');
            persona.push_str(
                &self
                    .alignment
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join("\n"),
            );
        }
        persona
    }

    /// A memory tool reading this agent's episodic log.
    pub fn memory_tool(&self) -> MemoryTool {
        MemoryTool::with_window(self.episodic.clone(), self.config.memory_window)
    }

    /// Record an exchange and recompute the profile.
    pub fn update_memories(&mut self, query: &str, response: &str) -> Result<MemoryEvent, MemoryError> {
        let event = self.episodic.add_event(query, response, None)?;
        self.refresh_profile()?;
        Ok(event)
    }

    fn refresh_profile(&mut self) -> Result<(), MemoryError> {
        let tail = self.episodic.retrieve("", self.config.profile_window)?;
        self.profile.update(&tail);
        Ok(())
    }

    async fn run_tools<'a, I>(&self, query: &str, tools: I) -> Vec<(String, String)>
    where
        I: IntoIterator<Item = &'a Arc<dyn Tool>>,
    {
        let timeout = self.config.tool_timeout();
        let calls = tools.into_iter().map(|tool| async move {
            let outcome = run_with_timeout(tool.as_ref(), query, timeout).await;
            if let Err(e) = &outcome {
                log::warn!("Tool '{}' failed for user '{}': {}", tool.name(), self.user_id, e);
            }
            (tool.name().to_string(), render_outcome(&outcome))
        });
        join_all(calls).await
    }

    /// Answer from tool output and recent memory, without a model.
    ///
    /// Consults the first two tools of `tools`; each contributes a line
    /// `"<Name>: <output>"` (failures rendered as `"Error: ..."`). A final
    /// `"Memory: ..."` line shows the recent exchanges. The response is
    /// recorded before it is returned.
    pub async fn act(&mut self, query: &str, tools: &ToolSet) -> Result<String, AgentError> {
        log::debug!(
            "PersonaAgent '{}' act with tools {:?}",
            self.user_id,
            tools.first(TOOLS_PER_ACT).iter().map(|t| t.name()).collect::<Vec<_>>()
        );

        let mut lines: Vec<String> = self
            .run_tools(query, tools.first(TOOLS_PER_ACT))
            .await
            .into_iter()
            .map(|(name, output)| format!("{}: {}", capitalize(&name), output))
            .collect();

        let recent = self.episodic.retrieve(query, self.config.memory_window)?;
        let memory = if recent.is_empty() {
            NO_MEMORY.to_string()
        } else {
            render_events(&recent)
        };
        lines.push(format!("Memory: {}", memory));

        let response = lines.join("\n");
        self.update_memories(query, &response)?;
        Ok(response)
    }

    /// Answer through `llm` with the persona prompt and every tool's output.
    ///
    /// # Arguments
    ///
    /// * `query` - The user's question.
    /// * `tools` - Every tool is consulted and its output passed as context.
    /// * `llm` - Model capability.
    /// * `model` - Model name; `None` uses the configured model.
    ///
    /// # Errors
    ///
    /// [`AgentError::Model`] if the model call fails; nothing is recorded in
    /// that case.
    pub async fn llm_response(
        &mut self,
        query: &str,
        tools: &ToolSet,
        llm: &dyn BaseLLM,
        model: Option<&str>,
    ) -> Result<String, AgentError> {
        let tool_context = self
            .run_tools(query, tools.iter())
            .await
            .into_iter()
            .map(|(name, output)| format!("{}: {}", name, output))
            .collect::<Vec<_>>()
            .join("\n");

        let messages = vec![
            LLMMessage::system(self.get_persona()),
            LLMMessage::user(format!("{}\n{}", query, tool_context)),
        ];
        let model = model.unwrap_or(self.config.model.as_str());

        let answer = llm
            .call(messages, model, self.config.temperature)
            .await
            .map_err(|e| {
                log::error!(
                    "LLM call via '{}' failed for user '{}': {}",
                    llm.provider(),
                    self.user_id,
                    e
                );
                AgentError::Model(e)
            })?;
        let answer = answer.trim().to_string();

        self.update_memories(query, &answer)?;
        Ok(answer)
    }

    /// Fold user feedback into the persona.
    ///
    /// Each item contributes `"Align to preference: <feedback>"`. Only the
    /// newest `max_alignment_lines` lines are kept.
    pub fn test_time_alignment(&mut self, recent_interactions: &[HashMap<String, String>]) {
        for interaction in recent_interactions {
            let feedback = interaction.get(FEEDBACK_KEY).map(String::as_str).unwrap_or("");
            self.alignment
                .push_back(format!("Align to preference: {}", feedback));
        }
        let max = self.config.max_alignment_lines;
        while self.alignment.len() > max {
            self.alignment.pop_front();
        }
    }

    /// Store the current profile in `index` under this user.
    ///
    /// Returns the entry id, or `None` if the profile is still empty.
    pub fn save_profile(&self, index: &SemanticIndex) -> Result<Option<String>, AgentError> {
        let profile = self.profile.get();
        if profile.is_empty() {
            return Ok(None);
        }
        let mut metadata = HashMap::new();
        metadata.insert("source".to_string(), Value::from("profile"));
        let id = index
            .add(&self.user_id, profile, Some(metadata))
            .map_err(MemoryError::from)?;
        log::info!("Saved profile of user '{}' as {}", self.user_id, id);
        Ok(Some(id))
    }

    /// Long-term memories of this user most similar to `query`.
    pub fn recall(
        &self,
        index: &SemanticIndex,
        query: &str,
        n_results: usize,
    ) -> Result<Vec<SearchResult>, AgentError> {
        Ok(index
            .search(&self.user_id, query, n_results)
            .map_err(MemoryError::from)?)
    }

    /// Forget every exchange and the derived profile.
    pub fn reset(&mut self) -> Result<(), AgentError> {
        self.episodic.clear()?;
        self.profile.clear();
        log::info!("Reset memory of user '{}'", self.user_id);
        Ok(())
    }

    /// Draft an answer and optionally review it.
    ///
    /// Uses [`PersonaAgent::llm_response`] when a model is available and
    /// [`PersonaAgent::act`] otherwise.
    pub async fn respond(
        &mut self,
        query: &str,
        tools: &ToolSet,
        llm: Option<&dyn BaseLLM>,
        reviewer: Option<&ManagerAgent>,
    ) -> Result<AgentReply, AgentError> {
        let answer = match llm {
            Some(llm) => self.llm_response(query, tools, llm, None).await?,
            None => self.act(query, tools).await?,
        };
        let review = match reviewer {
            Some(manager) => Some(
                manager
                    .review(PipelineMessage::new("assistant", answer.clone()))
                    .await?,
            ),
            None => None,
        };
        Ok(AgentReply { answer, review })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::tools::base_tool::{FnTool, ToolCapability};
    use crate::utilities::errors::{LLMError, ToolError};

    #[derive(Debug, Default)]
    struct RecordingLLM {
        answer: Option<String>,
        seen: Mutex<Vec<(Vec<LLMMessage>, String, f64)>>,
    }

    #[async_trait]
    impl BaseLLM for RecordingLLM {
        async fn call(
            &self,
            messages: Vec<LLMMessage>,
            model: &str,
            temperature: f64,
        ) -> Result<String, LLMError> {
            self.seen
                .lock()
                .unwrap()
                .push((messages, model.to_string(), temperature));
            self.answer
                .clone()
                .ok_or_else(|| LLMError::RateLimited("quota exhausted".to_string()))
        }
    }

    #[derive(Debug)]
    struct StuckTool;

    #[async_trait]
    impl Tool for StuckTool {
        fn name(&self) -> &str {
            "stuck"
        }

        fn capability(&self) -> ToolCapability {
            ToolCapability::WebSearch
        }

        async fn run(&self, _query: &str) -> Result<String, ToolError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("never".to_string())
        }
    }

    fn echo(name: &str) -> Arc<dyn Tool> {
        let label = name.to_string();
        Arc::new(FnTool::new(name, ToolCapability::Encyclopedia, move |q| {
            Ok(format!("{} result for {}", label, q))
        }))
    }

    fn feedback(text: &str) -> HashMap<String, String> {
        let mut item = HashMap::new();
        item.insert(FEEDBACK_KEY.to_string(), text.to_string());
        item
    }

    #[test]
    fn test_initial_persona_has_empty_profile() {
        let agent = PersonaAgent::new("userA");
        let persona = agent.get_persona();
        assert!(persona.contains("User summary: \nSTRICT RULES"));
        assert!(!persona.contains(PROFILE_PLACEHOLDER));
    }

    #[tokio::test]
    async fn test_act_uses_first_two_tools_and_memory() {
        let mut agent = PersonaAgent::new("userA");
        let tools = ToolSet::new().with(echo("wiki")).with(echo("search")).with(echo("extra"));

        let first = agent.act("sci-fi", &tools).await.unwrap();
        assert_eq!(
            first,
            "Wiki: wiki result for sci-fi\nSearch: search result for sci-fi\nMemory: No memory found."
        );

        let second = agent.act("films", &tools).await.unwrap();
        assert!(second.starts_with("Wiki: wiki result for films\nSearch: search result for films\n"));
        assert!(second.ends_with(&format!("Memory: Q: sci-fi | A: {}", first)));
        assert_eq!(agent.episodic().len().unwrap(), 2);
        assert!(agent.get_persona().contains("Q: films | A: Wiki: wiki result for films"));
    }

    #[tokio::test]
    async fn test_act_with_one_tool_and_none() {
        let mut agent = PersonaAgent::new("userA");
        let one = ToolSet::new().with(echo("wiki"));
        assert_eq!(agent.act("q", &one).await.unwrap().lines().count(), 2);

        let mut fresh = PersonaAgent::new("userB");
        assert_eq!(
            fresh.act("q", &ToolSet::new()).await.unwrap(),
            "Memory: No memory found."
        );
    }

    #[tokio::test]
    async fn test_tool_timeout_is_rendered_inline() {
        let mut config = PersonaConfig::default();
        config.tool_timeout_secs = 1;
        let storage = Arc::new(crate::memory::storage::InMemoryEpisodicStorage::new());
        let mut agent = PersonaAgent::with_storage("userA", storage, Arc::new(config));
        let tools = ToolSet::new()
            .with(Arc::new(StuckTool))
            .with(echo("wiki"));

        let response = agent.act("q", &tools).await.unwrap();
        let lines: Vec<&str> = response.lines().collect();
        assert!(lines[0].starts_with("Stuck: Error: tool 'stuck' timed out"));
        assert_eq!(lines[1], "Wiki: wiki result for q");
        assert_eq!(agent.episodic().len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_llm_response_builds_messages_and_records() {
        let mut agent = PersonaAgent::new("userA");
        let llm = RecordingLLM {
            answer: Some("  Dune, Blade Runner.  ".to_string()),
            ..Default::default()
        };
        let tools = ToolSet::new().with(echo("wiki")).with(echo("memory"));

        let answer = agent
            .llm_response("Popular sci-fi?", &tools, &llm, None)
            .await
            .unwrap();
        assert_eq!(answer, "Dune, Blade Runner.");

        let seen = llm.seen.lock().unwrap();
        let (messages, model, temperature) = &seen[0];
        assert_eq!(model, "gpt-3.5-turbo");
        assert!((temperature - 0.1).abs() < f64::EPSILON);
        assert_eq!(messages[0], LLMMessage::system(PersonaAgent::new("x").get_persona()));
        assert_eq!(
            messages[1].content,
            "Popular sci-fi?\nwiki: wiki result for Popular sci-fi?\nmemory: memory result for Popular sci-fi?"
        );
        assert_eq!(agent.profile().get(), "Q: Popular sci-fi? | A: Dune, Blade Runner.");
    }

    #[tokio::test]
    async fn test_model_failure_records_nothing() {
        let mut agent = PersonaAgent::new("userA");
        let llm = RecordingLLM::default();
        let err = agent
            .llm_response("q", &ToolSet::new(), &llm, Some("gpt-4o"))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Model(LLMError::RateLimited(_))));
        assert!(agent.episodic().is_empty().unwrap());
        assert_eq!(agent.profile().get(), "");
        assert_eq!(llm.seen.lock().unwrap()[0].1, "gpt-4o");
    }

    #[test]
    fn test_alignment_lines_are_appended_and_bounded() {
        let mut config = PersonaConfig::default();
        config.max_alignment_lines = 3;
        let storage = Arc::new(crate::memory::storage::InMemoryEpisodicStorage::new());
        let mut agent = PersonaAgent::with_storage("userA", storage, Arc::new(config));

        agent.test_time_alignment(&[feedback("short answers"), HashMap::new()]);
        let persona = agent.get_persona();
        assert!(persona.ends_with("\nAlign to preference: short answers\nAlign to preference: "));

        agent.test_time_alignment(&[feedback("a"), feedback("b"), feedback("c")]);
        let lines: Vec<&str> = agent.alignment_feedback().collect();
        assert_eq!(
            lines,
            vec![
                "Align to preference: a",
                "Align to preference: b",
                "Align to preference: c"
            ]
        );
    }

    #[tokio::test]
    async fn test_save_profile_and_recall() {
        let index = SemanticIndex::default();
        let mut agent = PersonaAgent::new("userA");
        assert_eq!(agent.save_profile(&index).unwrap(), None);

        agent
            .update_memories("Tell me about Italian history", "Rome was founded in 753 BC.")
            .unwrap();
        let id = agent.save_profile(&index).unwrap();
        assert!(id.is_some());

        let hits = agent.recall(&index, "Italian history", 3).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].content, agent.profile().get());
        assert!(PersonaAgent::new("userB").recall(&index, "Italian history", 3).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reset_clears_memory_and_profile() {
        let mut agent = PersonaAgent::new("userA");
        agent.act("q", &ToolSet::new()).await.unwrap();
        agent.reset().unwrap();
        assert!(agent.episodic().is_empty().unwrap());
        assert_eq!(agent.profile().get(), "");
    }

    #[tokio::test]
    async fn test_respond_with_review() {
        let mut agent = PersonaAgent::new("userA");
        let reviewer = ManagerAgent::new();
        let tools = ToolSet::new().with(echo("wiki"));
        let reply = agent
            .respond("Rome", &tools, None, Some(&reviewer))
            .await
            .unwrap();
        let review = reply.review.unwrap();
        assert_eq!(review.original.content, reply.answer);
        assert_eq!(review.verdict(), Some("Validation: All checks passed."));
    }

    #[test]
    fn test_agent_over_shared_storage_restores_profile() {
        let storage: Arc<dyn EpisodicStorage> =
            Arc::new(crate::memory::storage::InMemoryEpisodicStorage::new());
        let config = Arc::new(PersonaConfig::default());
        let mut first = PersonaAgent::with_storage("userA", storage.clone(), config.clone());
        first.update_memories("q1", "a1").unwrap();

        let second = PersonaAgent::with_storage("userA", storage, config);
        assert_eq!(second.profile().get(), "Q: q1 | A: a1");
    }
}

//! Request-scoped entry point.
//!
//! A [`SessionContext`] bundles what a request handler needs: the agent
//! registry, the shared tools, an optional model, the review pipeline and the
//! long-term semantic index. Handlers call [`SessionContext::ask`].

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agents::persona_agent::PersonaAgent;
use crate::agents::registry::AgentRegistry;
use crate::agents::review::{AggregatedReview, ManagerAgent, PipelineMessage};
use crate::llms::base_llm::{BaseLLM, LLMMessage};
use crate::memory::storage::{EpisodicSQLiteStorage, EpisodicStorage, InMemoryEpisodicStorage};
use crate::rag::index::SemanticIndex;
use crate::rag::types::SearchResult;
use crate::tools::base_tool::{render_outcome, run_with_timeout, ToolCapability, ToolSet};
use crate::tools::fallback_tool::FallbackTool;
use crate::tools::search_tool::BrightDataSearchTool;
use crate::tools::wikipedia_tool::WikipediaTool;
use crate::utilities::config::PersonaConfig;
use crate::utilities::errors::{AgentError, MemoryError};

/// Words that send a message down the web-search path.
pub const SEARCH_KEYWORDS: &[&str] = &["search", "find", "lookup", "web"];

/// How a message is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryRoute {
    /// Web search, then a model summary of the results.
    SearchThenSummarize,
    /// Straight to the persona agent.
    Direct,
}

/// Route `message` by keyword, case-insensitively.
pub fn classify_query(message: &str) -> QueryRoute {
    let lowered = message.to_lowercase();
    if SEARCH_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        QueryRoute::SearchThenSummarize
    } else {
        QueryRoute::Direct
    }
}

/// Answer to one [`SessionContext::ask`] call.
#[derive(Debug, Clone)]
pub struct SessionReply {
    pub route: QueryRoute,
    pub answer: String,
    pub review: Option<AggregatedReview>,
}

/// Everything a request needs, shared across requests.
pub struct SessionContext {
    config: Arc<PersonaConfig>,
    registry: AgentRegistry,
    tools: ToolSet,
    llm: Option<Arc<dyn BaseLLM>>,
    reviewer: ManagerAgent,
    index: SemanticIndex,
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("registry", &self.registry)
            .field("tools", &self.tools.names())
            .field("llm", &self.llm.as_ref().map(|l| l.provider().to_string()))
            .finish_non_exhaustive()
    }
}

impl SessionContext {
    /// Session with in-process memory and no tools or model.
    pub fn new(config: PersonaConfig) -> Self {
        Self::with_storage(config, Arc::new(InMemoryEpisodicStorage::new()))
    }

    /// Session over an explicit episodic storage backend.
    pub fn with_storage(config: PersonaConfig, storage: Arc<dyn EpisodicStorage>) -> Self {
        let config = Arc::new(config);
        Self {
            registry: AgentRegistry::new(storage, Arc::clone(&config)),
            config,
            tools: ToolSet::new(),
            llm: None,
            reviewer: ManagerAgent::default(),
            index: SemanticIndex::default(),
        }
    }

    /// Session built from `config`: SQLite memory when `storage_path` is
    /// set, and the default web tools.
    pub fn from_config(config: PersonaConfig) -> Result<Self, MemoryError> {
        let storage: Arc<dyn EpisodicStorage> = match &config.storage_path {
            Some(path) => Arc::new(EpisodicSQLiteStorage::new(Some(path.clone()), false)?),
            None => Arc::new(InMemoryEpisodicStorage::new()),
        };
        Ok(Self::with_storage(config, storage).with_tools(default_tools()))
    }

    pub fn with_tools(mut self, tools: ToolSet) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn BaseLLM>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_reviewer(mut self, reviewer: ManagerAgent) -> Self {
        self.reviewer = reviewer;
        self
    }

    pub fn with_index(mut self, index: SemanticIndex) -> Self {
        self.index = index;
        self
    }

    pub fn config(&self) -> &PersonaConfig {
        &self.config
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    pub fn index(&self) -> &SemanticIndex {
        &self.index
    }

    /// Shared tools followed by the agent's own memory tool.
    fn tools_for(&self, agent: &PersonaAgent) -> ToolSet {
        self.tools.clone().with(Arc::new(agent.memory_tool()))
    }

    /// Answer `query` for `user_id`.
    ///
    /// Search-style messages are answered by summarizing a web search when a
    /// model and a web-search tool are available; everything else goes to
    /// the user's persona agent. With `review` set the answer also passes
    /// through the review pipeline.
    pub async fn ask(&self, user_id: &str, query: &str, review: bool) -> Result<SessionReply, AgentError> {
        let route = classify_query(query);
        log::info!("Session: user '{}' asked ({:?})", user_id, route);

        let mut agent = self.registry.acquire(user_id).await;
        let tools = self.tools_for(&agent);

        let answer = match (route, self.llm.as_deref()) {
            (QueryRoute::SearchThenSummarize, Some(llm))
                if tools.by_capability(ToolCapability::WebSearch).is_some() =>
            {
                self.search_and_summarize(&mut agent, query, &tools, llm).await?
            }
            (_, llm) => agent.respond(query, &tools, llm, None).await?.answer,
        };

        let review = if review {
            Some(
                self.reviewer
                    .review(PipelineMessage::new("assistant", answer.clone()))
                    .await?,
            )
        } else {
            None
        };

        Ok(SessionReply {
            route,
            answer,
            review,
        })
    }

    async fn search_and_summarize(
        &self,
        agent: &mut PersonaAgent,
        query: &str,
        tools: &ToolSet,
        llm: &dyn BaseLLM,
    ) -> Result<String, AgentError> {
        let web_data = match tools.by_capability(ToolCapability::WebSearch) {
            Some(tool) => {
                render_outcome(&run_with_timeout(tool.as_ref(), query, self.config.tool_timeout()).await)
            }
            None => String::new(),
        };

        let messages = vec![
            LLMMessage::system(agent.get_persona()),
            LLMMessage::user(format!("Summarize this information: {}", web_data)),
        ];
        let summary = llm
            .call(messages, &self.config.model, self.config.temperature)
            .await?
            .trim()
            .to_string();
        agent.update_memories(query, &summary)?;
        Ok(summary)
    }

    /// Save `user_id`'s current profile into long-term memory.
    pub async fn remember_profile(&self, user_id: &str) -> Result<Option<String>, AgentError> {
        let agent = self.registry.acquire(user_id).await;
        agent.save_profile(&self.index)
    }

    /// Long-term memories of `user_id` most similar to `query`.
    pub fn recall(&self, user_id: &str, query: &str, n_results: usize) -> Result<Vec<SearchResult>, AgentError> {
        Ok(self
            .index
            .search(user_id, query, n_results)
            .map_err(MemoryError::from)?)
    }

    /// Forget everything about `user_id` and drop the cached agent.
    ///
    /// Requests already waiting on the agent run against a fresh one.
    pub async fn reset_user(&self, user_id: &str) -> Result<(), AgentError> {
        self.registry
            .retire_with(user_id, |agent| -> Result<(), AgentError> {
                agent.reset()?;
                self.index.clear_user(user_id);
                Ok(())
            })
            .await
    }
}

/// Bright Data search falling back to Wikipedia, then Wikipedia itself.
pub fn default_tools() -> ToolSet {
    let wikipedia = Arc::new(WikipediaTool::new());
    ToolSet::new()
        .with(Arc::new(FallbackTool::new(
            "search",
            Arc::new(BrightDataSearchTool::from_env()),
            wikipedia.clone(),
        )))
        .with(wikipedia)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::tools::base_tool::FnTool;
    use crate::utilities::errors::LLMError;

    #[derive(Debug, Default)]
    struct EchoLLM {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BaseLLM for EchoLLM {
        async fn call(
            &self,
            messages: Vec<LLMMessage>,
            _model: &str,
            _temperature: f64,
        ) -> Result<String, LLMError> {
            let user = messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.prompts.lock().unwrap().push(user);
            Ok("summary".to_string())
        }
    }

    fn offline_tools() -> ToolSet {
        ToolSet::new()
            .with(Arc::new(FnTool::new("search", ToolCapability::WebSearch, |q| {
                Ok(format!("web results for {}", q))
            })))
            .with(Arc::new(FnTool::static_wiki()))
    }

    #[test]
    fn test_classify_query() {
        assert_eq!(classify_query("Search the latest Rust news"), QueryRoute::SearchThenSummarize);
        assert_eq!(classify_query("can you LOOKUP this"), QueryRoute::SearchThenSummarize);
        assert_eq!(classify_query("What is the web?"), QueryRoute::SearchThenSummarize);
        assert_eq!(classify_query("Tell me about sci-fi movies"), QueryRoute::Direct);
    }

    #[tokio::test]
    async fn test_direct_ask_without_model_uses_act() {
        let session = SessionContext::new(PersonaConfig::default()).with_tools(offline_tools());
        let reply = session.ask("userA", "Tell me about sci-fi movies", true).await.unwrap();

        assert_eq!(reply.route, QueryRoute::Direct);
        assert!(reply.answer.starts_with("Search: web results for Tell me about sci-fi movies\nWiki: "));
        assert!(reply.answer.ends_with("Memory: No memory found."));
        let review = reply.review.unwrap();
        assert_eq!(review.verdict(), Some("Validation: All checks passed."));
    }

    #[tokio::test]
    async fn test_search_route_summarizes_web_results() {
        let llm = Arc::new(EchoLLM::default());
        let session = SessionContext::new(PersonaConfig::default())
            .with_tools(offline_tools())
            .with_llm(llm.clone());

        let reply = session.ask("userA", "find rust books", false).await.unwrap();
        assert_eq!(reply.route, QueryRoute::SearchThenSummarize);
        assert_eq!(reply.answer, "summary");
        assert!(reply.review.is_none());
        assert_eq!(
            llm.prompts.lock().unwrap()[0],
            "Summarize this information: web results for find rust books"
        );

        let agent = session.registry().acquire("userA").await;
        assert_eq!(agent.profile().get(), "Q: find rust books | A: summary");
    }

    #[tokio::test]
    async fn test_profile_memory_and_reset() {
        let session = SessionContext::new(PersonaConfig::default()).with_tools(offline_tools());
        assert_eq!(session.remember_profile("userA").await.unwrap(), None);

        session.ask("userA", "Italian history", false).await.unwrap();
        assert!(session.remember_profile("userA").await.unwrap().is_some());
        assert_eq!(session.recall("userA", "Italian history", 3).unwrap().len(), 1);
        assert!(session.recall("userB", "Italian history", 3).unwrap().is_empty());

        session.reset_user("userA").await.unwrap();
        assert!(session.recall("userA", "Italian history", 3).unwrap().is_empty());
        assert!(!session.registry().contains("userA"));
        let agent = session.registry().acquire("userA").await;
        assert!(agent.episodic().is_empty().unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_ask_waiting_on_reset_runs_against_fresh_agent() {
        let session =
            Arc::new(SessionContext::new(PersonaConfig::default()).with_tools(offline_tools()));
        session.ask("userA", "first", false).await.unwrap();

        let held = session.registry().acquire("userA").await;
        let reset = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.reset_user("userA").await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let ask = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.ask("userA", "second", false).await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(held);

        reset.await.unwrap().unwrap();
        ask.await.unwrap().unwrap();

        let agent = session.registry().acquire("userA").await;
        let events = agent.episodic().events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].query, "second");
        assert_eq!(session.registry().len(), 1);
    }

    #[test]
    fn test_default_tools_order() {
        let tools = default_tools();
        assert_eq!(tools.names(), vec!["search", "wikipedia"]);
        assert_eq!(
            tools.by_capability(ToolCapability::WebSearch).map(|t| t.name()),
            Some("search")
        );
    }
}

//! persona-crew demo binary.
//!
//! Walks one user through a tool-only answer, a model answer (when
//! `OPENAI_API_KEY` is set) and a review of that answer.
//!
//! # Environment Variables
//!
//! - `OPENAI_API_KEY` - enables the model step
//! - `PERSONA_CONFIG` - optional YAML configuration file
//! - `RUST_LOG` - tracing filter (default: "info,persona_crew=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin persona-demo
//! ```

use std::sync::Arc;

use persona_crew::tools::FnTool;
use persona_crew::{ManagerAgent, OpenAICompletion, PersonaAgent, PersonaConfig, PipelineMessage, ToolSet};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,persona_crew=debug".into()),
        )
        .init();

    let mut config = match std::env::var("PERSONA_CONFIG") {
        Ok(path) => PersonaConfig::from_yaml_file(std::path::Path::new(&path))?,
        Err(_) => PersonaConfig::default(),
    };
    config.apply_overrides(|key| std::env::var(key).ok());
    tracing::info!(model = %config.model, "persona-crew v{}", persona_crew::VERSION);

    let storage = Arc::new(persona_crew::memory::InMemoryEpisodicStorage::new());
    let mut agent = PersonaAgent::with_storage("userA", storage, Arc::new(config.clone()));
    let tools = ToolSet::new()
        .with(Arc::new(FnTool::static_wiki()))
        .with(Arc::new(agent.memory_tool()));

    println!("Initial persona: {}", agent.get_persona());
    let response = agent.act("Tell me about sci-fi movies", &tools).await?;
    println!("Agent response: {}", response);
    println!("Updated persona: {}", agent.get_persona());

    let draft = if std::env::var("OPENAI_API_KEY").is_ok() {
        let llm = OpenAICompletion::new(None, config.openai_base_url.clone());
        match agent
            .llm_response("What are some popular sci-fi movies?", &tools, &llm, None)
            .await
        {
            Ok(answer) => {
                println!("LLM response: {}", answer);
                answer
            }
            Err(e) => {
                tracing::error!("LLM response failed: {}", e);
                response
            }
        }
    } else {
        tracing::warn!("OPENAI_API_KEY not set, skipping the model step");
        response
    };

    let review = ManagerAgent::new()
        .review(PipelineMessage::new("assistant", draft))
        .await?;
    println!("{}", serde_json::to_string_pretty(&review)?);
    Ok(())
}

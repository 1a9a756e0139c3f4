//! Native LLM providers.

pub mod openai;

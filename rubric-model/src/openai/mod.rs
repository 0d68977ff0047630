//! OpenAI-compatible provider.
//!
//! Talks to any server exposing `POST {base_url}/chat/completions`: OpenAI
//! itself, OpenRouter, vLLM, LiteLLM and similar gateways.
//!
//! # Example
//!
//! ```rust,ignore
//! use rubric_model::openai::{OpenAICompatibleClient, OpenAICompatibleConfig};
//!
//! let client = OpenAICompatibleClient::new(
//!     OpenAICompatibleConfig::new(std::env::var("OPENAI_API_KEY").unwrap(), "gpt-4.1")
//!         .with_base_url("https://openrouter.ai/api/v1"),
//! )?;
//! ```

mod client;
mod config;
pub(crate) mod convert;

pub use client::OpenAICompatibleClient;
pub use config::{OPENAI_API_BASE, OpenAICompatibleConfig};

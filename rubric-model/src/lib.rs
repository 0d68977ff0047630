//! # rubric-model
//!
//! Chat-model adapters for the rubric benchmark.
//!
//! ## Overview
//!
//! - [`OpenAICompatibleClient`] - Any OpenAI-style `/chat/completions` endpoint
//! - [`MockModel`] - Scripted model for tests
//! - [`RetryConfig`] - Transport-level retry policy used by the adapters
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rubric_model::{OpenAICompatibleClient, OpenAICompatibleConfig};
//! use std::sync::Arc;
//!
//! let api_key = std::env::var("OPENAI_API_KEY").unwrap();
//! let model = OpenAICompatibleClient::new(OpenAICompatibleConfig::new(api_key, "gpt-4.1")).unwrap();
//! let model: Arc<dyn rubric_core::ChatModel> = Arc::new(model);
//! ```

pub mod mock;
pub mod openai;
pub mod retry;

pub use mock::MockModel;
pub use openai::{OpenAICompatibleClient, OpenAICompatibleConfig};
pub use retry::RetryConfig;

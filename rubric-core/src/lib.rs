//! # rubric-core
//!
//! Core traits and types shared by the rubric benchmark crates.
//!
//! ## Overview
//!
//! - [`ChatModel`] - The chat-completion capability the engine is built against
//! - [`Message`] / [`Role`] - Ordered conversation turns
//! - [`TokenUsage`] - Token accounting, combinable with `+`
//! - [`RubricError`] / [`Result`] - Unified error handling
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rubric_core::{ChatModel, ChatRequest, Message};
//!
//! async fn ask(model: &dyn ChatModel) -> rubric_core::Result<String> {
//!     let request = ChatRequest::new(model.name(), vec![Message::user("Hello")]);
//!     Ok(model.generate(request).await?.text)
//! }
//! ```

pub mod error;
pub mod model;
pub mod types;

pub use error::{Result, RubricError};
pub use model::{ChatModel, ChatRequest, ChatResponse, GenerateConfig, ReasoningEffort};
pub use types::{Message, Role, TokenUsage};

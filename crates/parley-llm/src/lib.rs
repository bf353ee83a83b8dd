//! Parley LLM - Chat completion provider abstraction
//!
//! This crate provides the completion-service side of the relay:
//! - Message and request/response types
//! - `LlmProvider` trait
//! - OpenAI provider (async-openai)
//! - Mock provider for tests

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod message;
pub mod mock;
pub mod openai;
pub mod provider;
pub mod util;

pub use completion::{CompletionRequest, CompletionResponse, TokenUsage};
pub use error::{Error, Result};
pub use message::{Message, MessageRole};
pub use mock::{MockProvider, MockReply};
pub use openai::{OpenAiConfig, OpenAiProvider};
pub use provider::LlmProvider;

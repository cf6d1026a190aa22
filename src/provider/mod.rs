//! Provider module - the LLM inference service boundary
//!
//! This module defines the `LlmProvider` trait and common types for
//! interacting with LLM backends, plus one concrete implementation for
//! OpenAI-compatible chat-completions endpoints.
//!
//! # Example
//!
//! ```rust,ignore
//! use windlass::provider::{ChatOptions, LlmProvider, OpenAiProvider};
//! use windlass::session::Message;
//!
//! async fn example() {
//!     let provider = OpenAiProvider::new("your-api-key");
//!     let messages = vec![Message::user("Hello!")];
//!     let options = ChatOptions::new().with_max_tokens(1000);
//!
//!     let response = provider.chat(messages, vec![], None, options).await.unwrap();
//!     println!("Response: {}", response.content);
//! }
//! ```

pub mod openai;
mod types;

pub use openai::OpenAiProvider;
pub use types::{ChatOptions, LlmProvider, LlmResponse, LlmToolCall, ToolDefinition, Usage};

//! Provider types for Windlass
//!
//! This module defines the boundary to the LLM inference service: the
//! `LlmProvider` trait, chat options, tool schemas and response types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::session::Message;

/// Definition of a tool that can be called by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The name of the tool (must be unique)
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// JSON Schema describing the tool's parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    ///
    /// # Example
    /// ```
    /// use windlass::provider::ToolDefinition;
    /// use serde_json::json;
    ///
    /// let tool = ToolDefinition::new(
    ///     "read_file",
    ///     "Read the contents of a file",
    ///     json!({
    ///         "type": "object",
    ///         "properties": {
    ///             "path": { "type": "string", "description": "File path" }
    ///         },
    ///         "required": ["path"]
    ///     }),
    /// );
    /// assert_eq!(tool.name, "read_file");
    /// ```
    pub fn new(name: &str, description: &str, parameters: serde_json::Value) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters,
        }
    }
}

/// Trait for LLM providers.
///
/// Implement this trait to add support for a new inference backend. The
/// provider translates between Windlass's message format and the backend's
/// wire format; it never owns control-flow decisions.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    ///
    /// # Arguments
    /// * `messages` - The ordered conversation history
    /// * `tools` - Tool schemas the model may request
    /// * `model` - Optional model override (uses the default if None)
    /// * `options` - Sampling parameters
    ///
    /// # Returns
    /// One response message, optionally carrying tool-call requests and
    /// usage metadata.
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LlmResponse>;

    /// The default model for this provider.
    fn default_model(&self) -> &str;

    /// The provider name (e.g. "openai").
    fn name(&self) -> &str;
}

/// Options for chat completion requests.
///
/// Use the builder pattern to construct options.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Maximum number of tokens to generate
    pub max_tokens: Option<u32>,
    /// Temperature for sampling (0.0 = deterministic)
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter
    pub top_p: Option<f32>,
}

impl ChatOptions {
    /// Create new default chat options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of tokens to generate.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the temperature for sampling.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the top_p (nucleus sampling) parameter.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }
}

/// Response from an LLM chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// Text content of the response
    pub content: String,
    /// Tool calls requested by the model (if any)
    pub tool_calls: Vec<LlmToolCall>,
    /// Token usage metadata (if the backend reports it)
    pub usage: Option<Usage>,
}

impl LlmResponse {
    /// Create a plain text response with no tool calls.
    ///
    /// # Example
    /// ```
    /// use windlass::provider::LlmResponse;
    ///
    /// let response = LlmResponse::text("Hello!");
    /// assert!(!response.has_tool_calls());
    /// ```
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            tool_calls: vec![],
            usage: None,
        }
    }

    /// Create a response carrying tool-call requests.
    pub fn with_tools(content: &str, tool_calls: Vec<LlmToolCall>) -> Self {
        Self {
            content: content.to_string(),
            tool_calls,
            usage: None,
        }
    }

    /// Attach usage metadata.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Check if this response requests any tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmToolCall {
    /// Correlation id for this call
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// Structured arguments for the tool
    pub arguments: serde_json::Value,
}

impl LlmToolCall {
    /// Create a new tool call request.
    pub fn new(id: &str, name: &str, arguments: serde_json::Value) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }
}

/// Token usage metadata from a chat completion.
///
/// `total_tokens` plus `cache_creation_tokens` is what the budget tracker
/// treats as the cumulative context cost of the conversation as of this
/// response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub cache_creation_tokens: u64,
    pub cache_read_tokens: u64,
}

impl Usage {
    /// Context cost attributed to this response: `total + cache_creation`.
    pub fn context_cost(&self) -> u64 {
        self.total_tokens + self.cache_creation_tokens
    }
}

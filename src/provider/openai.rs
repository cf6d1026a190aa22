//! OpenAI-compatible provider implementation
//!
//! Implements the `LlmProvider` trait for the Chat Completions API, handling
//! message conversion, tool calls, and response parsing. Works against any
//! OpenAI-compatible endpoint via `with_base_url`.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, WindlassError};
use crate::session::{Message, Role};

use super::{ChatOptions, LlmProvider, LlmResponse, LlmToolCall, ToolDefinition, Usage};

/// The OpenAI API endpoint URL.
const OPENAI_API_URL: &str = "https://api.openai.com/v1";

/// The default model to use.
const DEFAULT_MODEL: &str = "gpt-4o";

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// A message in the wire format.
#[derive(Debug, Serialize)]
struct WireMessage {
    /// "system", "user", "assistant", or "tool"
    role: String,
    /// Content may be null for an assistant message that only carries calls
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    r#type: String,
    function: WireFunctionCall,
}

/// Function call details. Arguments travel JSON-encoded on the wire.
#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct WireTool {
    r#type: String,
    function: WireFunctionDef,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireResponseToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct WireErrorResponse {
    error: WireError,
}

#[derive(Debug, Deserialize)]
struct WireError {
    message: String,
    r#type: String,
}

// ============================================================================
// Provider
// ============================================================================

/// OpenAI-compatible LLM provider.
///
/// # Example
/// ```
/// use windlass::provider::{LlmProvider, OpenAiProvider};
///
/// let provider = OpenAiProvider::new("sk-xxx");
/// assert_eq!(provider.name(), "openai");
/// ```
pub struct OpenAiProvider {
    /// API key for authentication
    api_key: String,
    /// API base URL
    api_base: String,
    /// HTTP client for making requests
    client: Client,
}

impl OpenAiProvider {
    /// Create a new provider against the default OpenAI endpoint.
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: OPENAI_API_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Create a provider with a custom base URL.
    ///
    /// Useful for OpenAI-compatible APIs (Azure, local models, proxies).
    /// A trailing slash is removed.
    pub fn with_base_url(api_key: &str, api_base: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

// ============================================================================
// Conversion Functions
// ============================================================================

/// Convert session messages to the wire format.
fn convert_messages(messages: Vec<Message>) -> Vec<WireMessage> {
    messages
        .into_iter()
        .map(|msg| {
            let role = match msg.role {
                Role::System => "system",
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => "tool",
            }
            .to_string();

            let tool_calls = msg.tool_calls.map(|tcs| {
                tcs.into_iter()
                    .map(|tc| WireToolCall {
                        id: tc.id,
                        r#type: "function".to_string(),
                        function: WireFunctionCall {
                            name: tc.name,
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect()
            });

            WireMessage {
                role,
                content: if msg.content.is_empty() && tool_calls.is_some() {
                    None
                } else {
                    Some(msg.content)
                },
                tool_calls,
                tool_call_id: msg.tool_call_id,
            }
        })
        .collect()
}

/// Convert tool definitions to the wire format.
fn convert_tools(tools: Vec<ToolDefinition>) -> Vec<WireTool> {
    tools
        .into_iter()
        .map(|t| WireTool {
            r#type: "function".to_string(),
            function: WireFunctionDef {
                name: t.name,
                description: t.description,
                parameters: t.parameters,
            },
        })
        .collect()
}

/// Convert a wire response to an `LlmResponse`.
fn convert_response(response: ChatResponse) -> LlmResponse {
    let choice = response.choices.into_iter().next();

    let (content, tool_calls) = match choice {
        Some(c) => {
            let content = c.message.content.unwrap_or_default();
            let tool_calls = c
                .message
                .tool_calls
                .map(|tcs| {
                    tcs.into_iter()
                        .map(|tc| {
                            // Malformed argument JSON is surfaced to the tool
                            // layer as a string rather than failing the turn
                            let args = serde_json::from_str(&tc.function.arguments)
                                .unwrap_or(serde_json::Value::String(tc.function.arguments));
                            LlmToolCall::new(&tc.id, &tc.function.name, args)
                        })
                        .collect()
                })
                .unwrap_or_default();
            (content, tool_calls)
        }
        None => (String::new(), Vec::new()),
    };

    let mut llm_response = if tool_calls.is_empty() {
        LlmResponse::text(&content)
    } else {
        LlmResponse::with_tools(&content, tool_calls)
    };

    if let Some(usage) = response.usage {
        llm_response = llm_response.with_usage(Usage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            cache_creation_tokens: 0,
            cache_read_tokens: 0,
        });
    }

    llm_response
}

// ============================================================================
// LlmProvider Implementation
// ============================================================================

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        tools: Vec<ToolDefinition>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LlmResponse> {
        let model = model.unwrap_or(DEFAULT_MODEL);
        let wire_messages = convert_messages(messages);
        let wire_tools = if tools.is_empty() {
            None
        } else {
            Some(convert_tools(tools))
        };

        let request = ChatRequest {
            model: model.to_string(),
            messages: wire_messages,
            tools: wire_tools,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
        };

        debug!(model = model, "Chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| WindlassError::Provider(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if let Ok(error_response) = serde_json::from_str::<WireErrorResponse>(&error_text) {
                return Err(WindlassError::Provider(format!(
                    "API error ({}): {} - {}",
                    status, error_response.error.r#type, error_response.error.message
                )));
            }

            return Err(WindlassError::Provider(format!(
                "API error ({}): {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| WindlassError::Provider(format!("Failed to parse response: {}", e)))?;

        info!("Chat completion response received");
        Ok(convert_response(chat_response))
    }

    fn default_model(&self) -> &str {
        DEFAULT_MODEL
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ToolCall;
    use serde_json::json;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAiProvider::new("test-key");
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.default_model(), "gpt-4o");
        assert_eq!(provider.api_base, "https://api.openai.com/v1");
    }

    #[test]
    fn test_provider_with_base_url_trims_slash() {
        let provider = OpenAiProvider::with_base_url("test-key", "https://custom.api/v1/");
        assert_eq!(provider.api_base, "https://custom.api/v1");
    }

    #[test]
    fn test_convert_messages_roles() {
        let messages = vec![
            Message::system("You are helpful"),
            Message::user("Hello"),
            Message::assistant("Hi there!"),
            Message::tool_result("call_1", "done"),
        ];
        let wire = convert_messages(messages);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[2].role, "assistant");
        assert_eq!(wire[3].role, "tool");
        assert_eq!(wire[3].tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_convert_messages_tool_call_arguments_encoded() {
        let msg = Message::assistant_with_tools(
            "",
            vec![ToolCall::new("c1", "read_file", json!({"path": "a.txt"}))],
        );
        let wire = convert_messages(vec![msg]);
        // Empty content with tool calls serializes as null content
        assert!(wire[0].content.is_none());
        let calls = wire[0].tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "read_file");
        let parsed: serde_json::Value =
            serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(parsed["path"], "a.txt");
    }

    #[test]
    fn test_convert_tools() {
        let tools = vec![ToolDefinition::new(
            "shell",
            "Run a command",
            json!({"type": "object"}),
        )];
        let wire = convert_tools(tools);
        assert_eq!(wire[0].r#type, "function");
        assert_eq!(wire[0].function.name, "shell");
    }

    #[test]
    fn test_convert_response_with_tool_calls() {
        let response = ChatResponse {
            choices: vec![WireChoice {
                message: WireResponseMessage {
                    content: None,
                    tool_calls: Some(vec![WireResponseToolCall {
                        id: "call_1".to_string(),
                        function: WireFunctionCall {
                            name: "list_dir".to_string(),
                            arguments: r#"{"path": "."}"#.to_string(),
                        },
                    }]),
                },
            }],
            usage: Some(WireUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
                total_tokens: 120,
            }),
        };

        let converted = convert_response(response);
        assert!(converted.has_tool_calls());
        assert_eq!(converted.tool_calls[0].arguments["path"], ".");
        let usage = converted.usage.unwrap();
        assert_eq!(usage.input_tokens, 100);
        assert_eq!(usage.total_tokens, 120);
    }

    #[test]
    fn test_convert_response_malformed_arguments() {
        let response = ChatResponse {
            choices: vec![WireChoice {
                message: WireResponseMessage {
                    content: None,
                    tool_calls: Some(vec![WireResponseToolCall {
                        id: "call_1".to_string(),
                        function: WireFunctionCall {
                            name: "shell".to_string(),
                            arguments: "not json".to_string(),
                        },
                    }]),
                },
            }],
            usage: None,
        };

        let converted = convert_response(response);
        assert_eq!(
            converted.tool_calls[0].arguments,
            serde_json::Value::String("not json".to_string())
        );
    }

    #[test]
    fn test_convert_response_empty_choices() {
        let response = ChatResponse {
            choices: vec![],
            usage: None,
        };
        let converted = convert_response(response);
        assert_eq!(converted.content, "");
        assert!(!converted.has_tool_calls());
    }
}

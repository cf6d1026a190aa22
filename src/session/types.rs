//! Session types for Windlass
//!
//! This module defines the core types for conversation state: messages,
//! roles, tool calls, compression records and the session aggregate that
//! the orchestration engine threads through every step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tasks::Task;
use crate::provider::Usage;

/// A single message in a conversation.
///
/// Messages can be from users, assistants, system prompts, or tool results.
/// A message is immutable once appended to a session; only compression may
/// replace messages, and it does so wholesale, never by editing in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// The role of the message sender
    pub role: Role,
    /// The text content of the message
    pub content: String,
    /// Tool calls requested by the assistant (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// ID of the tool call this message is responding to (for tool results)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Provider usage annotation carried on assistant messages. The budget
    /// tracker reads the newest annotation as the authoritative context cost.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl Message {
    /// Create a new user message.
    ///
    /// # Example
    /// ```
    /// use windlass::session::{Message, Role};
    ///
    /// let msg = Message::user("Hello!");
    /// assert_eq!(msg.role, Role::User);
    /// ```
    pub fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
            usage: None,
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
            usage: None,
        }
    }

    /// Create a new system message.
    pub fn system(content: &str) -> Self {
        Self {
            role: Role::System,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: None,
            usage: None,
        }
    }

    /// Create a new tool result message.
    ///
    /// # Arguments
    /// * `tool_call_id` - The ID of the tool call this is responding to
    /// * `content` - The result content from the tool
    ///
    /// # Example
    /// ```
    /// use windlass::session::{Message, Role};
    ///
    /// let msg = Message::tool_result("call_123", "file written");
    /// assert_eq!(msg.role, Role::Tool);
    /// assert!(msg.is_tool_result());
    /// ```
    pub fn tool_result(tool_call_id: &str, content: &str) -> Self {
        Self {
            role: Role::Tool,
            content: content.to_string(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.to_string()),
            usage: None,
        }
    }

    /// Create an assistant message carrying tool-call requests.
    pub fn assistant_with_tools(content: &str, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
            usage: None,
        }
    }

    /// Attach a provider usage annotation to this message.
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Check if this message carries tool-call requests.
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls
            .as_ref()
            .map(|tc| !tc.is_empty())
            .unwrap_or(false)
    }

    /// Check if this is a tool result message.
    pub fn is_tool_result(&self) -> bool {
        self.role == Role::Tool && self.tool_call_id.is_some()
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompts and instructions
    System,
    /// Messages from the human operator
    User,
    /// Messages from the model
    Assistant,
    /// Results from tool executions
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A tool call requested by the assistant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation identifier for this call; the matching tool result
    /// carries the same id.
    pub id: String,
    /// Name of the tool to call
    pub name: String,
    /// Structured arguments for the tool
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Create a new tool call.
    ///
    /// # Example
    /// ```
    /// use windlass::session::ToolCall;
    /// use serde_json::json;
    ///
    /// let call = ToolCall::new("call_1", "read_file", json!({"path": "notes.md"}));
    /// assert_eq!(call.name, "read_file");
    /// ```
    pub fn new(id: &str, name: &str, arguments: serde_json::Value) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }
    }
}

/// The phase tag of a session, last-write-wins.
///
/// Every engine step ends by writing the phase it reached, so a suspended
/// or terminated session can be inspected and resumed deterministically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Fresh session, no step executed yet
    Idle,
    /// The model produced a response this step
    ModelCalled,
    /// History was replaced by a summary plus a recency tail
    Compressed,
    /// The summarization call failed; history was kept intact
    CompressionFailed,
    /// The model call failed; a synthetic assistant message was substituted
    Error,
    /// A recovery notice was appended after an errored turn
    ErrorHandled,
    /// Suspended on a dangerous tool call, waiting for an external answer
    AwaitingReview,
    /// The loop iteration ceiling was reached with tool calls still pending
    IterationLimit,
    /// The session was explicitly reset by the caller
    Reset,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Idle => "idle",
            SessionStatus::ModelCalled => "model_called",
            SessionStatus::Compressed => "compressed",
            SessionStatus::CompressionFailed => "compression_failed",
            SessionStatus::Error => "error",
            SessionStatus::ErrorHandled => "error_handled",
            SessionStatus::AwaitingReview => "awaiting_review",
            SessionStatus::IterationLimit => "iteration_limit",
            SessionStatus::Reset => "reset",
        };
        write!(f, "{}", s)
    }
}

/// Audit record of one successful compression, append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionRecord {
    /// When the compression happened
    pub timestamp: DateTime<Utc>,
    /// Context cost before compression, in tokens
    pub tokens_before: u64,
    /// Estimated cost of the summary message alone, in tokens
    pub tokens_after: u64,
    /// `tokens_after / tokens_before`
    pub ratio: f64,
    /// First 200 characters of the generated summary
    pub summary_preview: String,
}

/// The session aggregate: the single mutable record threaded through every
/// orchestration step and persisted to the checkpoint store.
///
/// `messages` is append-only per step and never reordered; only compression
/// replaces it, wholesale. `task_list` is wholesale-replaced on each update
/// (latest write wins and must be the complete list). `compression_history`
/// is an append-only audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    /// Stable identifier, set once at creation
    pub session_id: String,
    /// Ordered conversation history
    pub messages: Vec<Message>,
    /// Current complete task list
    pub task_list: Vec<Task>,
    /// Audit trail of past compressions
    pub compression_history: Vec<CompressionRecord>,
    /// Phase reached by the most recent step
    pub status: SessionStatus,
    /// True while a dangerous tool call awaits an external answer
    pub requires_human_review: bool,
    /// When this session was created
    pub created_at: DateTime<Utc>,
    /// When this session was last modified
    pub updated_at: DateTime<Utc>,
}

impl SessionState {
    /// Create a new empty session with the given id.
    ///
    /// # Example
    /// ```
    /// use windlass::session::{SessionState, SessionStatus};
    ///
    /// let state = SessionState::new("demo");
    /// assert_eq!(state.session_id, "demo");
    /// assert_eq!(state.status, SessionStatus::Idle);
    /// assert!(state.messages.is_empty());
    /// ```
    pub fn new(session_id: &str) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.to_string(),
            messages: Vec::new(),
            task_list: Vec::new(),
            compression_history: Vec::new(),
            status: SessionStatus::Idle,
            requires_human_review: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new session with a generated UUID v4 id.
    pub fn new_with_generated_id() -> Self {
        Self::new(&uuid::Uuid::new_v4().to_string())
    }

    /// Append a message, bumping `updated_at`.
    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// Set the phase tag, bumping `updated_at`.
    pub fn set_status(&mut self, status: SessionStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    /// Get the last message, if any.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// The tool calls pending on the most recent assistant message.
    ///
    /// This is what the review gate and the resume path inspect: a suspended
    /// session derives its pending work from the conversation itself rather
    /// than from a separate side channel.
    pub fn pending_tool_calls(&self) -> &[ToolCall] {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .and_then(|m| m.tool_calls.as_deref())
            .unwrap_or(&[])
    }

    /// Text of the most recent assistant message, if any.
    pub fn last_assistant_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::Assistant)
            .map(|m| m.content.as_str())
    }

    /// Get the number of messages in this session.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Check if this session has no messages.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(msg.tool_calls.is_none());
        assert!(msg.usage.is_none());

        let msg = Message::assistant("Hi there");
        assert_eq!(msg.role, Role::Assistant);

        let msg = Message::system("You are helpful");
        assert_eq!(msg.role, Role::System);

        let msg = Message::tool_result("call_123", "Success");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id, Some("call_123".to_string()));
        assert!(msg.is_tool_result());
    }

    #[test]
    fn test_message_with_tool_calls() {
        let call = ToolCall::new("call_1", "read_file", json!({"path": "a.txt"}));
        let msg = Message::assistant_with_tools("Reading...", vec![call]);

        assert!(msg.has_tool_calls());
        let calls = msg.tool_calls.unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read_file");
    }

    #[test]
    fn test_message_with_usage() {
        let msg = Message::assistant("done").with_usage(Usage {
            total_tokens: 120,
            ..Default::default()
        });
        assert_eq!(msg.usage.unwrap().total_tokens, 120);
    }

    #[test]
    fn test_message_serialization_skips_none() {
        let msg = Message::user("Hello");
        let json = serde_json::to_string(&msg).unwrap();

        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
        assert!(!json.contains("usage"));
    }

    #[test]
    fn test_role_display_and_serde() {
        assert_eq!(Role::Assistant.to_string(), "assistant");
        let json = serde_json::to_string(&Role::User).unwrap();
        assert_eq!(json, r#""user""#);
        let parsed: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, Role::User);
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&SessionStatus::AwaitingReview).unwrap();
        assert_eq!(json, r#""awaiting_review""#);
        let parsed: SessionStatus = serde_json::from_str(r#""compression_failed""#).unwrap();
        assert_eq!(parsed, SessionStatus::CompressionFailed);
    }

    #[test]
    fn test_session_new() {
        let state = SessionState::new("test-session");
        assert_eq!(state.session_id, "test-session");
        assert!(state.is_empty());
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(!state.requires_human_review);
        assert!(state.created_at <= state.updated_at);
    }

    #[test]
    fn test_session_generated_id_unique() {
        let a = SessionState::new_with_generated_id();
        let b = SessionState::new_with_generated_id();
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_session_push_message_bumps_updated_at() {
        let mut state = SessionState::new("test");
        let initial = state.updated_at;
        std::thread::sleep(std::time::Duration::from_millis(5));
        state.push_message(Message::user("Hello"));
        assert_eq!(state.message_count(), 1);
        assert!(state.updated_at >= initial);
    }

    #[test]
    fn test_pending_tool_calls_from_latest_assistant() {
        let mut state = SessionState::new("test");
        assert!(state.pending_tool_calls().is_empty());

        state.push_message(Message::user("do it"));
        state.push_message(Message::assistant_with_tools(
            "",
            vec![ToolCall::new("c1", "shell", json!({"command": "ls"}))],
        ));
        state.push_message(Message::tool_result("c1", "ok"));

        // The tool result does not shadow the assistant message
        let pending = state.pending_tool_calls();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].name, "shell");
    }

    #[test]
    fn test_last_assistant_text() {
        let mut state = SessionState::new("test");
        state.push_message(Message::user("hi"));
        state.push_message(Message::assistant("hello"));
        state.push_message(Message::user("bye"));
        assert_eq!(state.last_assistant_text(), Some("hello"));
    }

    #[test]
    fn test_session_serialization_roundtrip() {
        let mut state = SessionState::new("roundtrip");
        state.push_message(Message::user("Hello"));
        state.push_message(Message::assistant("Hi!"));
        state.set_status(SessionStatus::ModelCalled);

        let json = serde_json::to_string(&state).unwrap();
        let parsed: SessionState = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.session_id, "roundtrip");
        assert_eq!(parsed.messages.len(), 2);
        assert_eq!(parsed.status, SessionStatus::ModelCalled);
    }
}

//! Tool types for Windlass
//!
//! This module defines the `Tool` trait that all tools implement, the static
//! concurrency-safety classification, the tagged tool output (plain message
//! or message plus state patch), and the execution context.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::session::Task;

/// Static concurrency-safety classification of a tool.
///
/// The partition is fixed at registration time, never inferred at call time.
/// Safe tools (read-only or idempotent) may run concurrently within one model
/// turn; unsafe tools (mutating or externally visible) run strictly
/// sequentially in request order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolConcurrency {
    /// Read-only or idempotent; safe to dispatch in parallel
    Safe,
    /// Mutating or externally visible; must run sequentially
    Unsafe,
}

impl std::fmt::Display for ToolConcurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Safe => write!(f, "safe"),
            Self::Unsafe => write!(f, "unsafe"),
        }
    }
}

/// A partial update to session state produced by a tool.
///
/// Currently only the task list can be patched; the struct leaves room for
/// further channels without widening every tool's return type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatePatch {
    /// Complete replacement task list (whole-list semantics)
    pub task_list: Option<Vec<Task>>,
}

impl StatePatch {
    /// A patch that replaces the task list.
    pub fn task_list(tasks: Vec<Task>) -> Self {
        Self {
            task_list: Some(tasks),
        }
    }

    /// Whether this patch changes anything.
    pub fn is_empty(&self) -> bool {
        self.task_list.is_none()
    }

    /// Fold another patch into this one; later writes win per channel.
    pub fn merge(&mut self, other: StatePatch) {
        if other.task_list.is_some() {
            self.task_list = other.task_list;
        }
    }
}

/// Result of a tool execution: either a plain result message, or a result
/// message plus a state patch. The tagged variant keeps the dispatcher's
/// merge logic exhaustive.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// Plain tool result text
    Message(String),
    /// Tool result text plus a session state update
    WithPatch { message: String, patch: StatePatch },
}

impl ToolOutput {
    /// Shortcut for a plain text result.
    pub fn message(content: impl Into<String>) -> Self {
        Self::Message(content.into())
    }

    /// Shortcut for a result carrying a state patch.
    pub fn with_patch(content: impl Into<String>, patch: StatePatch) -> Self {
        Self::WithPatch {
            message: content.into(),
            patch,
        }
    }

    /// The result text, whichever variant this is.
    pub fn text(&self) -> &str {
        match self {
            Self::Message(m) => m,
            Self::WithPatch { message, .. } => message,
        }
    }
}

/// Trait that all tools must implement.
///
/// Tools are named, schema-typed, side-effecting capabilities the model may
/// request. Failure is recoverable at the conversation level: the dispatcher
/// converts errors into tool-result messages the model can react to.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use serde_json::Value;
/// use windlass::tools::{Tool, ToolConcurrency, ToolContext, ToolOutput};
/// use windlass::error::Result;
///
/// struct PingTool;
///
/// #[async_trait]
/// impl Tool for PingTool {
///     fn name(&self) -> &str { "ping" }
///     fn description(&self) -> &str { "Replies with pong" }
///     fn parameters(&self) -> Value {
///         serde_json::json!({ "type": "object", "properties": {} })
///     }
///     fn concurrency(&self) -> ToolConcurrency { ToolConcurrency::Safe }
///     async fn execute(&self, _args: Value, _ctx: &ToolContext) -> Result<ToolOutput> {
///         Ok(ToolOutput::message("pong"))
///     }
/// }
/// ```
#[async_trait]
pub trait Tool: Send + Sync {
    /// The tool name, unique within a registry.
    fn name(&self) -> &str;

    /// Description sent to the LLM.
    fn description(&self) -> &str;

    /// JSON Schema for the tool's arguments.
    fn parameters(&self) -> Value;

    /// Concurrency-safety classification.
    ///
    /// Defaults to `Unsafe` (fail-closed): a tool that forgets to override
    /// this is executed sequentially rather than in parallel.
    fn concurrency(&self) -> ToolConcurrency {
        ToolConcurrency::Unsafe
    }

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput>;
}

/// Context provided to tools during execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// The workspace directory for file operations
    pub workspace: Option<String>,
    /// Snapshot of the session's task list at dispatch time
    pub task_list: Vec<Task>,
}

impl ToolContext {
    /// Create a new empty tool context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workspace directory.
    pub fn with_workspace(mut self, workspace: &str) -> Self {
        self.workspace = Some(workspace.to_string());
        self
    }

    /// Set the task list snapshot.
    pub fn with_task_list(mut self, task_list: Vec<Task>) -> Self {
        self.task_list = task_list;
        self
    }
}

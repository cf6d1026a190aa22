//! Tools module - tool definitions, registry and dispatch
//!
//! Tools are named, schema-typed capabilities the model may request during a
//! conversation. Each tool is statically classified as safe-concurrency
//! (read-only or idempotent) or unsafe-concurrency (mutating or externally
//! visible); the dispatcher parallelizes the former and serializes the
//! latter within one model turn.
//!
//! # Built-in Tools
//!
//! - `ReadFileTool` / `WriteFileTool` / `EditFileTool` / `ListDirTool`: file
//!   operations relative to the workspace
//! - `GrepTool`: regex search over files
//! - `ShellTool`: shell command execution
//! - `TaskReadTool` / `TaskWriteTool`: session task list access
//!
//! # Example
//!
//! ```rust
//! use windlass::tools::{ToolRegistry, ReadFileTool, WriteFileTool, ShellTool};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(Box::new(ReadFileTool));
//! registry.register(Box::new(WriteFileTool));
//! registry.register(Box::new(ShellTool::new()));
//!
//! assert!(registry.is_safe_concurrency("read_file"));
//! assert!(!registry.is_safe_concurrency("shell"));
//! ```

pub mod dispatcher;
pub mod filesystem;
pub mod grep;
mod registry;
pub mod shell;
pub mod tasklist;
mod types;

pub use dispatcher::{execute_turn, TurnOutcome};
pub use filesystem::{EditFileTool, ListDirTool, ReadFileTool, WriteFileTool};
pub use grep::GrepTool;
pub use registry::ToolRegistry;
pub use shell::ShellTool;
pub use tasklist::{TaskReadTool, TaskWriteTool};
pub use types::{StatePatch, Tool, ToolConcurrency, ToolContext, ToolOutput};

/// Register the full built-in tool set on a registry.
pub fn register_builtin_tools(registry: &mut ToolRegistry) {
    registry.register(Box::new(ReadFileTool));
    registry.register(Box::new(WriteFileTool));
    registry.register(Box::new(EditFileTool));
    registry.register(Box::new(ListDirTool));
    registry.register(Box::new(GrepTool));
    registry.register(Box::new(ShellTool::new()));
    registry.register(Box::new(TaskReadTool));
    registry.register(Box::new(TaskWriteTool));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_builtin_tools() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry);

        assert_eq!(registry.len(), 8);
        for name in [
            "read_file",
            "write_file",
            "edit_file",
            "list_dir",
            "grep",
            "shell",
            "task_read",
            "task_write",
        ] {
            assert!(registry.has(name), "missing builtin tool {}", name);
        }
    }

    #[test]
    fn test_builtin_partition() {
        let mut registry = ToolRegistry::new();
        register_builtin_tools(&mut registry);

        let mut safe = registry.safe_names();
        safe.sort();
        assert_eq!(safe, vec!["grep", "list_dir", "read_file", "task_read"]);

        let mut unsafe_names = registry.unsafe_names();
        unsafe_names.sort();
        assert_eq!(
            unsafe_names,
            vec!["edit_file", "shell", "task_write", "write_file"]
        );
    }
}

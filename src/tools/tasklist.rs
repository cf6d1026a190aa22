//! Task list tools
//!
//! `task_read` exposes the session's current task list to the model;
//! `task_write` replaces it wholesale. The write tool is the producer in the
//! task-list contract: it stamps start/end timestamps on status transitions
//! before handing the complete list back as a state patch.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::{Result, WindlassError};
use crate::session::{format_task_list, stamp_task_transitions, task_stats, Task};

use super::{StatePatch, Tool, ToolConcurrency, ToolContext, ToolOutput};

const TASK_WRITE_DESCRIPTION: &str = "\
Update the task list for the current session. Use this tool proactively to \
track progress and manage task execution:

1. When starting a task, mark it in_progress.
2. When a task is fully done, mark it completed.
3. When a task hits an unrecoverable problem, mark it failed and include the \
error.

The list you send REPLACES the previous list entirely, so always include \
every task that should persist, not only the ones that changed. Only mark a \
task completed when it is actually finished; incomplete work stays \
in_progress or becomes failed with an error description.";

/// Tool for reading the current task list.
pub struct TaskReadTool;

#[async_trait]
impl Tool for TaskReadTool {
    fn name(&self) -> &str {
        "task_read"
    }

    fn description(&self) -> &str {
        "Read the current session task list. Use this frequently to stay aware \
         of task state, especially before starting work or choosing a next step."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    fn concurrency(&self) -> ToolConcurrency {
        ToolConcurrency::Safe
    }

    async fn execute(&self, _args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let stats = task_stats(&ctx.task_list);
        let listing = format_task_list(&ctx.task_list);
        Ok(ToolOutput::message(format!(
            "Current task list ({} total, {} in progress, {} completed):\n{}",
            stats.total, stats.in_progress, stats.completed, listing
        )))
    }
}

/// Tool for replacing the task list.
///
/// # Parameters
/// - `tasks`: The complete updated task list (required)
pub struct TaskWriteTool;

#[async_trait]
impl Tool for TaskWriteTool {
    fn name(&self) -> &str {
        "task_write"
    }

    fn description(&self) -> &str {
        TASK_WRITE_DESCRIPTION
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tasks": {
                    "type": "array",
                    "description": "The complete updated task list",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string", "description": "Unique task identifier" },
                            "name": { "type": "string", "description": "Short task name" },
                            "description": { "type": "string", "description": "What needs to be done" },
                            "status": {
                                "type": "string",
                                "enum": ["pending", "in_progress", "completed", "failed", "blocked"],
                                "description": "Task lifecycle state"
                            },
                            "priority": {
                                "type": "string",
                                "enum": ["high", "medium", "low"],
                                "description": "Optional task priority"
                            },
                            "error": {
                                "type": "string",
                                "description": "Failure reason, required when status is failed"
                            }
                        },
                        "required": ["id", "name", "description", "status"]
                    }
                }
            },
            "required": ["tasks"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let tasks_value = args
            .get("tasks")
            .cloned()
            .ok_or_else(|| WindlassError::Tool("Missing 'tasks' argument".into()))?;
        let tasks: Vec<Task> = serde_json::from_value(tasks_value)
            .map_err(|e| WindlassError::Tool(format!("Invalid task list: {}", e)))?;

        let stamped = stamp_task_transitions(&ctx.task_list, tasks, Utc::now());
        let count = stamped.len();

        Ok(ToolOutput::with_patch(
            format!("Task list updated. {} task(s) tracked.", count),
            StatePatch::task_list(stamped),
        ))
    }
}

//! Session module - conversation state and task list management
//!
//! A session is the aggregate record the orchestration engine threads
//! through every step: ordered messages, the current task list, the
//! compression audit trail, a phase tag and the human-review flag.
//! Durable storage lives in [`crate::checkpoint`]; this module only
//! defines the state itself and the pure reducers over it.

pub mod tasks;
pub mod types;

pub use tasks::{
    format_task_list, reduce_task_list, stamp_task_transitions, task_stats, Task, TaskPriority,
    TaskStats, TaskStatus,
};
pub use types::{CompressionRecord, Message, Role, SessionState, SessionStatus, ToolCall};

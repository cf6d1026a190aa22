//! Task list management.
//!
//! The model owns the task list wholesale: each `task_write` call carries the
//! complete updated list, and the reducer adopts it verbatim (an empty update
//! keeps the old list). Timestamp invariants are enforced at the write site
//! via [`stamp_task_transitions`], not inside the reducer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lifecycle state of a task.
///
/// `completed` and `failed` are terminal. `blocked` is a parked state with
/// no automatic transition out of it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Blocked,
}

impl TaskStatus {
    /// Whether this status is terminal (completed or failed).
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Blocked => "blocked",
        };
        write!(f, "{}", s)
    }
}

/// Priority of a task.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
}

/// A single task in a session's task list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    /// Unique identifier within the list
    pub id: String,
    /// Short task name
    pub name: String,
    /// What needs to be done
    pub description: String,
    /// Lifecycle state
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,
    /// Stamped on the first transition into `in_progress`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Stamped on the first transition into `completed` or `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    /// Failure reason when status is `failed`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    /// Create a new pending task.
    ///
    /// # Example
    /// ```
    /// use windlass::session::{Task, TaskStatus};
    ///
    /// let task = Task::new("t1", "Write parser", "Implement the config parser");
    /// assert_eq!(task.status, TaskStatus::Pending);
    /// assert!(task.start_time.is_none());
    /// ```
    pub fn new(id: &str, name: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            status: TaskStatus::Pending,
            priority: None,
            start_time: None,
            end_time: None,
            error: None,
        }
    }
}

/// Whole-list-replacement reducer for the task list.
///
/// An empty or absent update keeps the old list; any non-empty update is
/// adopted verbatim. The reducer does not validate transitions -- the
/// producer of the new list owns timestamping and id continuity (see
/// [`stamp_task_transitions`]). A terminal task silently reverting to a
/// non-terminal status is logged so the gap is observable.
///
/// # Example
/// ```
/// use windlass::session::{reduce_task_list, Task};
///
/// let old = vec![Task::new("t1", "a", "first")];
/// let kept = reduce_task_list(old.clone(), Vec::new());
/// assert_eq!(kept.len(), 1);
///
/// let new = vec![Task::new("t2", "b", "second")];
/// let replaced = reduce_task_list(old, new);
/// assert_eq!(replaced[0].id, "t2");
/// ```
pub fn reduce_task_list(old: Vec<Task>, new: Vec<Task>) -> Vec<Task> {
    if new.is_empty() {
        return old;
    }
    for task in &new {
        if let Some(prev) = old.iter().find(|t| t.id == task.id) {
            if prev.status.is_terminal() && !task.status.is_terminal() {
                warn!(
                    task_id = %task.id,
                    from = %prev.status,
                    to = %task.status,
                    "Terminal task reverted to non-terminal status by list replacement"
                );
            }
        }
    }
    new
}

/// Stamp start/end timestamps on a replacement task list.
///
/// Caller contract for task-list producers: `start_time` is set on the first
/// transition into `in_progress` and never overwritten; `end_time` is set on
/// the first transition into `completed` or `failed` and never overwritten.
/// Tasks unknown to `old` are stamped as if freshly transitioned.
pub fn stamp_task_transitions(old: &[Task], new: Vec<Task>, now: DateTime<Utc>) -> Vec<Task> {
    new.into_iter()
        .map(|mut task| {
            let prev = old.iter().find(|t| t.id == task.id);

            if task.status == TaskStatus::InProgress {
                let already_started = prev
                    .map(|t| t.status == TaskStatus::InProgress || t.start_time.is_some())
                    .unwrap_or(false);
                if already_started {
                    // Keep the original start if the update dropped it
                    if task.start_time.is_none() {
                        task.start_time = prev.and_then(|t| t.start_time);
                    }
                } else if task.start_time.is_none() {
                    task.start_time = Some(now);
                }
            }

            if task.status.is_terminal() && task.end_time.is_none() {
                task.end_time = prev.and_then(|t| t.end_time).or(Some(now));
            }

            task
        })
        .collect()
}

/// Summary counts over a task list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub blocked: usize,
}

/// Compute summary counts for a task list.
pub fn task_stats(tasks: &[Task]) -> TaskStats {
    let mut stats = TaskStats {
        total: tasks.len(),
        ..Default::default()
    };
    for task in tasks {
        match task.status {
            TaskStatus::Pending => stats.pending += 1,
            TaskStatus::InProgress => stats.in_progress += 1,
            TaskStatus::Completed => stats.completed += 1,
            TaskStatus::Failed => stats.failed += 1,
            TaskStatus::Blocked => stats.blocked += 1,
        }
    }
    stats
}

/// Render a task list as a human-readable numbered listing.
pub fn format_task_list(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return "No tasks".to_string();
    }
    tasks
        .iter()
        .enumerate()
        .map(|(i, task)| {
            let mut line = format!("{}. [{}] {} - {}", i + 1, task.status, task.name, task.description);
            if let Some(err) = &task.error {
                line.push_str(&format!(" (error: {})", err));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task_with_status(id: &str, status: TaskStatus) -> Task {
        let mut t = Task::new(id, id, "desc");
        t.status = status;
        t
    }

    // ── reduce_task_list ───────────────────────────────────────────────

    #[test]
    fn test_reduce_empty_new_keeps_old() {
        let old = vec![Task::new("t1", "a", "first"), Task::new("t2", "b", "second")];
        let result = reduce_task_list(old.clone(), Vec::new());
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "t1");
    }

    #[test]
    fn test_reduce_non_empty_replaces_wholesale() {
        let old = vec![Task::new("t1", "a", "first")];
        let new = vec![
            Task::new("t2", "b", "second"),
            Task::new("t3", "c", "third"),
        ];
        let result = reduce_task_list(old, new);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "t2");
        assert_eq!(result[1].id, "t3");
    }

    #[test]
    fn test_reduce_both_empty() {
        let result = reduce_task_list(Vec::new(), Vec::new());
        assert!(result.is_empty());
    }

    #[test]
    fn test_reduce_terminal_revert_is_adopted() {
        // The reducer warns but does not reject: the new list wins.
        let old = vec![task_with_status("t1", TaskStatus::Completed)];
        let new = vec![task_with_status("t1", TaskStatus::Pending)];
        let result = reduce_task_list(old, new);
        assert_eq!(result[0].status, TaskStatus::Pending);
    }

    // ── stamp_task_transitions ─────────────────────────────────────────

    #[test]
    fn test_stamp_sets_start_time_on_first_in_progress() {
        let old = vec![task_with_status("t1", TaskStatus::Pending)];
        let new = vec![task_with_status("t1", TaskStatus::InProgress)];
        let now = Utc::now();
        let result = stamp_task_transitions(&old, new, now);
        assert_eq!(result[0].start_time, Some(now));
        assert!(result[0].end_time.is_none());
    }

    #[test]
    fn test_stamp_start_time_idempotent() {
        let started = Utc::now() - chrono::Duration::minutes(5);
        let mut old_task = task_with_status("t1", TaskStatus::InProgress);
        old_task.start_time = Some(started);

        // Second in_progress write must not overwrite the existing start
        let new = vec![task_with_status("t1", TaskStatus::InProgress)];
        let result = stamp_task_transitions(&[old_task], new, Utc::now());
        assert_eq!(result[0].start_time, Some(started));
    }

    #[test]
    fn test_stamp_sets_end_time_on_completion() {
        let started = Utc::now() - chrono::Duration::minutes(5);
        let mut old_task = task_with_status("t1", TaskStatus::InProgress);
        old_task.start_time = Some(started);

        let mut done = task_with_status("t1", TaskStatus::Completed);
        done.start_time = Some(started);
        let now = Utc::now();
        let result = stamp_task_transitions(&[old_task], vec![done], now);
        assert_eq!(result[0].end_time, Some(now));
    }

    #[test]
    fn test_stamp_end_time_idempotent() {
        let ended = Utc::now() - chrono::Duration::minutes(1);
        let mut old_task = task_with_status("t1", TaskStatus::Failed);
        old_task.end_time = Some(ended);

        let new = vec![task_with_status("t1", TaskStatus::Failed)];
        let result = stamp_task_transitions(&[old_task], new, Utc::now());
        assert_eq!(result[0].end_time, Some(ended));
    }

    #[test]
    fn test_stamp_unknown_task_in_progress() {
        let now = Utc::now();
        let new = vec![task_with_status("fresh", TaskStatus::InProgress)];
        let result = stamp_task_transitions(&[], new, now);
        assert_eq!(result[0].start_time, Some(now));
    }

    #[test]
    fn test_stamp_pending_task_untouched() {
        let now = Utc::now();
        let new = vec![task_with_status("t1", TaskStatus::Pending)];
        let result = stamp_task_transitions(&[], new, now);
        assert!(result[0].start_time.is_none());
        assert!(result[0].end_time.is_none());
    }

    // ── stats & formatting ─────────────────────────────────────────────

    #[test]
    fn test_task_stats_counts() {
        let tasks = vec![
            task_with_status("a", TaskStatus::Pending),
            task_with_status("b", TaskStatus::InProgress),
            task_with_status("c", TaskStatus::Completed),
            task_with_status("d", TaskStatus::Completed),
            task_with_status("e", TaskStatus::Failed),
            task_with_status("f", TaskStatus::Blocked),
        ];
        let stats = task_stats(&tasks);
        assert_eq!(stats.total, 6);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.in_progress, 1);
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.blocked, 1);
    }

    #[test]
    fn test_format_task_list_empty() {
        assert_eq!(format_task_list(&[]), "No tasks");
    }

    #[test]
    fn test_format_task_list_includes_status_and_error() {
        let mut failed = task_with_status("t1", TaskStatus::Failed);
        failed.error = Some("disk full".to_string());
        let output = format_task_list(&[failed]);
        assert!(output.contains("[failed]"));
        assert!(output.contains("disk full"));
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, r#""in_progress""#);
        let parsed: TaskStatus = serde_json::from_str(r#""blocked""#).unwrap();
        assert_eq!(parsed, TaskStatus::Blocked);
    }

    #[test]
    fn test_is_terminal() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::InProgress.is_terminal());
        assert!(!TaskStatus::Blocked.is_terminal());
    }
}

//! Human review gate for dangerous tool calls.
//!
//! When routing detects a tool from the configured dangerous set, the engine
//! suspends with a review prompt and waits for an external answer. The answer
//! is classified by case-insensitive containment into approve, reject, or
//! modify-with-feedback; both English keywords and their Chinese equivalents
//! are recognized, matching the replies the prompt asks for.

use crate::session::ToolCall;

/// The classified outcome of a review answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewAction {
    /// Execute the pending tool calls
    Approve,
    /// Refuse the pending call and send the model back for another approach
    Reject,
    /// Free-text feedback forwarded to the model as a new instruction
    Modify(String),
}

/// Classify an external review answer.
///
/// # Example
/// ```
/// use windlass::agent::{classify_answer, ReviewAction};
///
/// assert_eq!(classify_answer("Approve"), ReviewAction::Approve);
/// assert_eq!(classify_answer("同意"), ReviewAction::Approve);
/// assert_eq!(classify_answer("reject it"), ReviewAction::Reject);
/// assert!(matches!(classify_answer("use /tmp instead"), ReviewAction::Modify(_)));
/// ```
pub fn classify_answer(answer: &str) -> ReviewAction {
    let lowered = answer.to_lowercase();
    if lowered.contains("同意") || lowered.contains("approve") {
        ReviewAction::Approve
    } else if lowered.contains("拒绝") || lowered.contains("reject") {
        ReviewAction::Reject
    } else {
        ReviewAction::Modify(answer.to_string())
    }
}

/// Build the prompt shown to the operator for a pending tool call.
pub fn review_prompt(call: &ToolCall) -> String {
    let args = serde_json::to_string_pretty(&call.arguments)
        .unwrap_or_else(|_| call.arguments.to_string());
    format!(
        "Please confirm whether to execute the following operation:\n\
         Tool: {}\n\
         Arguments: {}\n\n\
         Reply with:\n\
         - \"approve\" (同意) - execute the operation\n\
         - \"reject\" (拒绝) - refuse the operation\n\
         - anything else - treated as modification feedback",
        call.name, args
    )
}

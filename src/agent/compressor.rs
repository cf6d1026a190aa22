//! LLM-backed context compression.
//!
//! When the budget tracker reports the conversation over threshold, the
//! compressor renders the full history into one structured-summary request
//! and produces a synthetic assistant message that supersedes the older
//! messages. The engine performs the actual splice (summary + recency tail);
//! the compressor only computes the summary and reports what it replaces.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::Result;
use crate::provider::{ChatOptions, LlmProvider};
use crate::session::{CompressionRecord, Message, Role};

use super::budget::TokenBudget;

/// Prefix marking a synthetic summary message in the history.
pub const SUMMARY_PREFIX: &str = "[COMPRESSED SUMMARY]";

/// Per-message character window when rendering the transcript, bounding the
/// cost of the summarization request itself.
const TRANSCRIPT_CHAR_WINDOW: usize = 1000;

/// Characters of the summary kept in the audit record.
const PREVIEW_CHARS: usize = 200;

/// The structured-summary request. Eight mandated sections plus an optional
/// next step, so a later model call can pick up exactly where the dropped
/// history left off.
const SUMMARY_PROMPT: &str = "\
Your task is to create a detailed summary of the conversation so far, \
paying close attention to the user's explicit requests and your previous actions. \
This summary should be thorough in capturing technical details, code patterns, \
and architectural decisions that would be essential for continuing development \
work without losing context.

Your summary should include the following sections:

1. **Primary Request and Intent**: Capture all of the user's explicit requests and intents in detail
2. **Key Technical Concepts**: List all important technical concepts, technologies, and frameworks discussed.
3. **Files and Code Sections**: Enumerate specific files and code sections examined, modified, or created. Pay special attention to the most recent messages.
4. **Errors and Fixes**: List all errors that you ran into, and how you fixed them. Pay special attention to specific user feedback.
5. **Problem Solving**: Document problems solved and any ongoing troubleshooting efforts.
6. **All User Messages**: List ALL user messages that are not tool results. These are critical for understanding the users' feedback and changing intent.
7. **Pending Tasks**: Outline any pending tasks that you have explicitly been asked to work on.
8. **Current Work**: Describe in detail precisely what was being worked on immediately before this summary request.
9. **Optional Next Step**: List the next step that you will take that is related to the most recent work you were doing.";

/// The outcome of one compression: the synthetic summary message, the audit
/// record, and the older messages the summary logically supersedes.
#[derive(Debug, Clone)]
pub struct Compression {
    /// Synthetic assistant message to splice in front of the recency tail
    pub summary_message: Message,
    /// Audit record for the compression history
    pub record: CompressionRecord,
    /// Messages logically superseded by the summary
    pub dropped: Vec<Message>,
}

/// Invokes the LLM to compress conversation history into a structured
/// summary.
pub struct ContextCompressor {
    provider: Arc<dyn LlmProvider>,
    model: Option<String>,
    budget: TokenBudget,
    recent_kept: usize,
}

impl ContextCompressor {
    /// Create a compressor.
    ///
    /// # Arguments
    /// * `provider` - LLM backend used for the summarization call
    /// * `model` - Optional model override for summarization
    /// * `budget` - Budget tracker used for before/after accounting
    /// * `recent_kept` - How many recent messages the engine will keep
    ///   verbatim; used here to report which messages are superseded
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: Option<String>,
        budget: TokenBudget,
        recent_kept: usize,
    ) -> Self {
        Self {
            provider,
            model,
            budget,
            recent_kept,
        }
    }

    /// Whether the history has reached the compression threshold.
    pub fn needs_compression(&self, messages: &[Message]) -> bool {
        self.budget.needs_compression(messages)
    }

    /// Run one summarization call over the full history.
    ///
    /// Calling this below the threshold is legal but wasteful; the engine
    /// checks `needs_compression` first. Failure of the summarization call
    /// propagates -- the engine treats it as non-fatal and keeps the
    /// uncompressed history.
    pub async fn compress(&self, messages: &[Message]) -> Result<Compression> {
        let before = self.budget.usage(messages);
        info!(
            tokens = before.used,
            percentage = format!("{:.1}%", before.percentage * 100.0),
            "Compressing conversation history"
        );

        let transcript = format_transcript(messages);
        let request = format!(
            "{}\n\nConversation to summarize:\n{}",
            SUMMARY_PROMPT, transcript
        );

        let response = self
            .provider
            .chat(
                vec![Message::user(&request)],
                Vec::new(),
                self.model.as_deref(),
                ChatOptions::new(),
            )
            .await?;

        let summary_message =
            Message::assistant(&format!("{}\n\n{}", SUMMARY_PREFIX, response.content));

        // The after figure is estimated from the summary alone; the recency
        // tail is accounted for on the next model call.
        let tokens_after = TokenBudget::estimate_tokens(std::slice::from_ref(&summary_message));
        let ratio = if before.used > 0 {
            tokens_after as f64 / before.used as f64
        } else {
            1.0
        };

        let record = CompressionRecord {
            timestamp: Utc::now(),
            tokens_before: before.used,
            tokens_after,
            ratio,
            summary_preview: truncate_chars(&response.content, PREVIEW_CHARS),
        };

        let dropped = messages
            .iter()
            .take(messages.len().saturating_sub(self.recent_kept))
            .cloned()
            .collect();

        debug!(
            before = before.used,
            after = tokens_after,
            ratio = format!("{:.1}%", ratio * 100.0),
            "Compression complete"
        );

        Ok(Compression {
            summary_message,
            record,
            dropped,
        })
    }
}

/// Render messages as an indexed transcript, each bounded to a character
/// window so the summarization request itself stays cheap.
fn format_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .enumerate()
        .map(|(i, msg)| {
            let role = match msg.role {
                Role::User => "Human",
                Role::Assistant => "Assistant",
                Role::System => "System",
                Role::Tool => "Tool",
            };
            let content = truncate_chars(&msg.content, TRANSCRIPT_CHAR_WINDOW);
            format!("[{}] {}: {}", i + 1, role, content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Truncate a string to at most `max` characters, never splitting a
/// multi-byte character.
fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

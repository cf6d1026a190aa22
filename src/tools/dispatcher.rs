//! Tool dispatch for one model turn.
//!
//! Executes the tool calls requested by a single assistant message. Calls are
//! split by each call's own concurrency partition: safe calls are dispatched
//! concurrently and awaited jointly, unsafe calls run strictly sequentially in
//! request order (they may have ordering-dependent side effects). Result
//! messages always come back in original request order with correlation ids
//! preserved, regardless of actual completion order.
//!
//! Tool failure is recoverable at the conversation level: errors and unknown
//! tool names become tool-result messages the model can react to, never turn
//! failures.

use std::time::Instant;

use futures::future::join_all;
use tracing::{error, info};

use crate::session::{Message, ToolCall};

use super::{StatePatch, ToolContext, ToolOutput, ToolRegistry};

/// The outcome of dispatching one turn's tool calls.
#[derive(Debug)]
pub struct TurnOutcome {
    /// One tool-result message per call, in request order
    pub messages: Vec<Message>,
    /// State patches folded in request order (later calls win per channel)
    pub patch: StatePatch,
}

/// Execute every tool call of one model turn.
pub async fn execute_turn(
    registry: &ToolRegistry,
    calls: &[ToolCall],
    ctx: &ToolContext,
) -> TurnOutcome {
    let mut slots: Vec<Option<(String, StatePatch)>> = (0..calls.len()).map(|_| None).collect();

    // Safe partition: dispatch concurrently, await jointly.
    let safe_futures: Vec<_> = calls
        .iter()
        .enumerate()
        .filter(|(_, call)| registry.is_safe_concurrency(&call.name))
        .map(|(idx, call)| async move { (idx, run_call(registry, call, ctx).await) })
        .collect();
    for (idx, result) in join_all(safe_futures).await {
        slots[idx] = Some(result);
    }

    // Unsafe partition (including unknown tools): strictly sequential,
    // request order.
    for (idx, call) in calls.iter().enumerate() {
        if slots[idx].is_some() {
            continue;
        }
        slots[idx] = Some(run_call(registry, call, ctx).await);
    }

    let mut messages = Vec::with_capacity(calls.len());
    let mut patch = StatePatch::default();
    for (call, slot) in calls.iter().zip(slots) {
        let (text, call_patch) = slot.unwrap_or_else(|| {
            (
                format!("Tool dispatch produced no result for: {}", call.name),
                StatePatch::default(),
            )
        });
        messages.push(Message::tool_result(&call.id, &text));
        patch.merge(call_patch);
    }

    TurnOutcome { messages, patch }
}

/// Run a single call, converting every failure mode into result text.
async fn run_call(
    registry: &ToolRegistry,
    call: &ToolCall,
    ctx: &ToolContext,
) -> (String, StatePatch) {
    let tool = match registry.get(&call.name) {
        Some(t) => t,
        None => return (format!("Tool not found: {}", call.name), StatePatch::default()),
    };

    let start = Instant::now();
    match tool.execute(call.arguments.clone(), ctx).await {
        Ok(output) => {
            info!(
                tool = %call.name,
                id = %call.id,
                latency_ms = start.elapsed().as_millis() as u64,
                "Tool executed successfully"
            );
            match output {
                ToolOutput::Message(text) => (text, StatePatch::default()),
                ToolOutput::WithPatch { message, patch } => (message, patch),
            }
        }
        Err(e) => {
            error!(
                tool = %call.name,
                id = %call.id,
                latency_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "Tool execution failed"
            );
            (format!("Error: {}", e), StatePatch::default())
        }
    }
}

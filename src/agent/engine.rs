//! The orchestration engine.
//!
//! One iteration of the loop: compression check, model call, routing
//! decision, then tool execution, human-review suspension, or termination.
//! The engine is a strictly sequential state machine per session; the only
//! parallelism is inside a single safe-tools step. Every state mutation
//! boundary is checkpointed, so a session can be suspended (human review),
//! inspected, and resumed deterministically.
//!
//! Engines are built by dependency injection: provider, tool registry and
//! checkpoint store are passed in at construction. There is no process-wide
//! state, so multiple engines with different configurations can coexist.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{info, info_span, warn, Instrument};

use crate::checkpoint::CheckpointStore;
use crate::config::EngineConfig;
use crate::error::{Result, WindlassError};
use crate::provider::{ChatOptions, LlmProvider};
use crate::session::{
    reduce_task_list, Message, SessionState, SessionStatus, ToolCall,
};
use crate::tools::{execute_turn, ToolContext, ToolRegistry};

use super::budget::TokenBudget;
use super::compressor::ContextCompressor;
use super::review::{classify_answer, review_prompt, ReviewAction};

/// Routing decision after a model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    /// No tool calls requested; the turn is complete
    Terminate,
    /// A dangerous tool was requested; suspend for an external answer
    HumanReview,
    /// First call is in the safe-concurrency partition
    SafeTools,
    /// First call is in the unsafe-concurrency partition
    UnsafeTools,
}

/// Handle for cancelling an in-flight model call.
///
/// Cancellation aborts the current step before any state append; the session
/// remains intact at its last checkpoint.
#[derive(Clone)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

impl Canceller {
    /// Signal cancellation to the engine's in-flight step.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }
}

/// The orchestration engine tying budget tracking, compression, tool
/// dispatch, human review and checkpointing into one loop.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use windlass::agent::Engine;
/// use windlass::checkpoint::CheckpointStore;
/// use windlass::config::EngineConfig;
/// use windlass::provider::OpenAiProvider;
/// use windlass::tools::{register_builtin_tools, ToolRegistry};
///
/// let mut tools = ToolRegistry::new();
/// register_builtin_tools(&mut tools);
///
/// let engine = Engine::new(
///     EngineConfig::default(),
///     Arc::new(OpenAiProvider::new("api-key")),
///     tools,
///     CheckpointStore::new_memory(),
/// );
///
/// let final_state = engine.invoke("List the files in src/", None).await?;
/// ```
pub struct Engine {
    config: EngineConfig,
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    checkpoints: Arc<CheckpointStore>,
    budget: TokenBudget,
    compressor: ContextCompressor,
    cancel_tx: watch::Sender<bool>,
    /// Per-session locks: same-session calls serialize, distinct sessions
    /// run fully concurrently.
    session_locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl Engine {
    /// Create an engine from its collaborators.
    pub fn new(
        config: EngineConfig,
        provider: Arc<dyn LlmProvider>,
        tools: ToolRegistry,
        checkpoints: CheckpointStore,
    ) -> Self {
        let budget = TokenBudget::new(config.max_tokens, config.compression_threshold);
        let compressor = ContextCompressor::new(
            Arc::clone(&provider),
            Some(config.model.clone()),
            budget,
            config.recent_messages_kept,
        );
        let (cancel_tx, _) = watch::channel(false);
        Self {
            config,
            provider,
            tools: Arc::new(tools),
            checkpoints: Arc::new(checkpoints),
            budget,
            compressor,
            cancel_tx,
            session_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// A handle that cancels the in-flight model call.
    pub fn canceller(&self) -> Canceller {
        Canceller {
            tx: self.cancel_tx.clone(),
        }
    }

    /// A reference to the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A reference to the checkpoint store.
    pub fn checkpoints(&self) -> &Arc<CheckpointStore> {
        &self.checkpoints
    }

    /// Run one invocation: append the input as a user message and drive the
    /// loop until it terminates, suspends for review, or hits a limit.
    ///
    /// Without a session id a fresh session with a generated id is created;
    /// with one, the stored session is continued.
    ///
    /// # Errors
    /// Returns an error if the session is suspended awaiting review (use
    /// [`Engine::resume`]), if checkpointing fails, or if the step is
    /// cancelled. Model and tool failures are recovered in-loop and reported
    /// through the final state's status instead.
    pub async fn invoke(&self, input: &str, session_id: Option<&str>) -> Result<SessionState> {
        let session_id = session_id
            .map(|s| s.to_string())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let _guard = self.lock_session(&session_id).await;

        let mut state = match self.checkpoints.load(&session_id).await? {
            Some(state) => state,
            None => SessionState::new(&session_id),
        };

        if state.requires_human_review {
            return Err(WindlassError::Session(format!(
                "Session '{}' is awaiting human review; call resume() with an answer",
                session_id
            )));
        }

        // An errored session gets a recovery notice before new work starts.
        if state.status == SessionStatus::Error {
            state.push_message(Message::assistant(
                "An error occurred in the previous turn; recovering and continuing.",
            ));
            state.set_status(SessionStatus::ErrorHandled);
        }

        state.push_message(Message::user(input));
        self.checkpoints.save(&state).await?;

        let span = info_span!("invoke", session_id = %state.session_id);
        self.run_loop(state).instrument(span).await
    }

    /// Resume a session suspended on human review with an external answer.
    ///
    /// The answer is classified by containment: approve executes the pending
    /// tool calls, reject sends the model back for another approach, and any
    /// other text is forwarded as modification feedback.
    pub async fn resume(&self, session_id: &str, answer: &str) -> Result<SessionState> {
        let _guard = self.lock_session(session_id).await;

        let mut state = self.checkpoints.load(session_id).await?.ok_or_else(|| {
            WindlassError::Session(format!("Unknown session '{}'", session_id))
        })?;

        if !state.requires_human_review {
            return Err(WindlassError::Session(format!(
                "Session '{}' is not awaiting review",
                session_id
            )));
        }

        let pending = state.pending_tool_calls().to_vec();
        let tool_name = pending
            .first()
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "unknown".to_string());

        let action = classify_answer(answer);
        info!(session_id = %session_id, tool = %tool_name, ?action, "Resuming suspended session");

        state.requires_human_review = false;
        match action {
            ReviewAction::Approve => {
                state.push_message(Message::user(&format!(
                    "User approved execution of {}.",
                    tool_name
                )));
                self.run_tools(&mut state, &pending).await;
                self.checkpoints.save(&state).await?;
            }
            ReviewAction::Reject => {
                state.push_message(Message::user(&format!(
                    "User rejected the {} operation; choose another approach.",
                    tool_name
                )));
                self.checkpoints.save(&state).await?;
            }
            ReviewAction::Modify(feedback) => {
                state.push_message(Message::user(&format!(
                    "User requested changes to the {} operation: {}",
                    tool_name, feedback
                )));
                self.checkpoints.save(&state).await?;
            }
        }

        let span = info_span!("resume", session_id = %state.session_id);
        self.run_loop(state).instrument(span).await
    }

    /// Latest checkpointed state for a session id.
    pub async fn get_state(&self, session_id: &str) -> Result<Option<SessionState>> {
        self.checkpoints.load(session_id).await
    }

    /// Full checkpoint history for a session id, oldest first.
    pub async fn get_state_history(&self, session_id: &str) -> Result<Vec<SessionState>> {
        self.checkpoints.history(session_id).await
    }

    /// Clear the review flag and mark a session reset.
    pub async fn reset(&self, session_id: &str) -> Result<SessionState> {
        let _guard = self.lock_session(session_id).await;
        let mut state = self.checkpoints.load(session_id).await?.ok_or_else(|| {
            WindlassError::Session(format!("Unknown session '{}'", session_id))
        })?;
        state.requires_human_review = false;
        state.set_status(SessionStatus::Reset);
        self.checkpoints.save(&state).await?;
        Ok(state)
    }

    /// The review prompt for a suspended session, if one is pending.
    pub fn pending_review_prompt(state: &SessionState) -> Option<String> {
        if !state.requires_human_review {
            return None;
        }
        state.pending_tool_calls().first().map(review_prompt)
    }

    // ── internals ──────────────────────────────────────────────────────

    async fn lock_session(&self, session_id: &str) -> tokio::sync::OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.session_locks.lock().await;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drive the state machine until it terminates, suspends, or errors.
    async fn run_loop(&self, mut state: SessionState) -> Result<SessionState> {
        let mut iterations = 0usize;
        // Fresh subscription; a stale cancel from a previous run is consumed.
        let mut cancel_rx = self.cancel_tx.subscribe();
        let _ = *cancel_rx.borrow_and_update();

        loop {
            // Compression check. Failure is non-fatal: keep the full history
            // and proceed to the model call.
            if self.budget.needs_compression(&state.messages) {
                match self.compressor.compress(&state.messages).await {
                    Ok(compression) => {
                        let tail_start = state
                            .messages
                            .len()
                            .saturating_sub(self.config.recent_messages_kept);
                        let mut new_messages = vec![compression.summary_message];
                        new_messages.extend(state.messages.split_off(tail_start));
                        state.messages = new_messages;
                        state.compression_history.push(compression.record);
                        state.set_status(SessionStatus::Compressed);
                    }
                    Err(e) => {
                        warn!(error = %e, "Compression failed; keeping full history");
                        state.set_status(SessionStatus::CompressionFailed);
                    }
                }
                self.checkpoints.save(&state).await?;
            }

            // Model call, cancellable. Cancellation leaves the session at
            // its last checkpoint with no partial appends.
            let options = ChatOptions::new()
                .with_max_tokens(self.config.max_output_tokens)
                .with_temperature(self.config.temperature);
            let chat = self.provider.chat(
                state.messages.clone(),
                self.tools.definitions(),
                Some(&self.config.model),
                options,
            );
            let response = tokio::select! {
                response = chat => response,
                _ = cancel_rx.changed() => {
                    info!("Model call cancelled");
                    return Err(WindlassError::Cancelled);
                }
            };

            // Model failure is recovered locally: substitute a synthetic
            // assistant message and end the turn gracefully.
            let response = match response {
                Ok(response) => response,
                Err(e) => {
                    state.push_message(Message::assistant(&format!("Model call failed: {}", e)));
                    state.set_status(SessionStatus::Error);
                    self.checkpoints.save(&state).await?;
                    return Ok(state);
                }
            };

            let tool_calls: Vec<ToolCall> = response
                .tool_calls
                .iter()
                .map(|tc| ToolCall::new(&tc.id, &tc.name, tc.arguments.clone()))
                .collect();

            let mut assistant = if tool_calls.is_empty() {
                Message::assistant(&response.content)
            } else {
                Message::assistant_with_tools(&response.content, tool_calls.clone())
            };
            if let Some(usage) = response.usage {
                assistant = assistant.with_usage(usage);
            }
            state.push_message(assistant);
            state.set_status(SessionStatus::ModelCalled);
            self.checkpoints.save(&state).await?;

            match self.decide_route(&tool_calls) {
                Route::Terminate => return Ok(state),
                Route::HumanReview => {
                    state.requires_human_review = true;
                    state.set_status(SessionStatus::AwaitingReview);
                    self.checkpoints.save(&state).await?;
                    if let Some(prompt) = Self::pending_review_prompt(&state) {
                        info!(prompt = %prompt, "Suspended for human review");
                    }
                    return Ok(state);
                }
                Route::SafeTools | Route::UnsafeTools => {
                    if iterations >= self.config.max_loop_iterations {
                        info!(
                            iterations = iterations,
                            "Iteration ceiling reached with tool calls pending"
                        );
                        state.set_status(SessionStatus::IterationLimit);
                        self.checkpoints.save(&state).await?;
                        return Ok(state);
                    }
                    iterations += 1;
                    self.run_tools(&mut state, &tool_calls).await;
                    self.checkpoints.save(&state).await?;
                }
            }
        }
    }

    /// Route by the requested tool calls.
    ///
    /// Any dangerous call in the batch suspends the whole turn; otherwise
    /// the first call's partition labels the state, and dispatch splits the
    /// batch per call anyway.
    fn decide_route(&self, calls: &[ToolCall]) -> Route {
        let Some(first) = calls.first() else {
            return Route::Terminate;
        };
        if calls.iter().any(|c| self.config.is_dangerous(&c.name)) {
            return Route::HumanReview;
        }
        if self.tools.is_safe_concurrency(&first.name) {
            Route::SafeTools
        } else {
            Route::UnsafeTools
        }
    }

    /// Execute one turn's tool calls and fold results into the state.
    async fn run_tools(&self, state: &mut SessionState, calls: &[ToolCall]) {
        let ctx = ToolContext::new()
            .with_workspace(&self.config.workspace)
            .with_task_list(state.task_list.clone());

        let outcome = execute_turn(&self.tools, calls, &ctx).await;

        for message in outcome.messages {
            state.push_message(message);
        }
        if let Some(tasks) = outcome.patch.task_list {
            state.task_list = reduce_task_list(std::mem::take(&mut state.task_list), tasks);
        }
    }
}

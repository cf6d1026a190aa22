//! Agent module - the orchestration core
//!
//! This module ties the loop together:
//!
//! - [`Engine`]: the state machine running compression checks, model calls,
//!   routing, tool dispatch, human-review suspension and checkpointing
//! - [`TokenBudget`]: context usage tracking and the compression trigger
//! - [`ContextCompressor`]: LLM-backed structured summarization of history
//! - review helpers: classifying external answers into approve / reject /
//!   modify and rendering the review prompt
//!
//! # Architecture
//!
//! ```text
//!             ┌──────────────────┐
//!             │      Engine      │
//!             └──────────────────┘
//!               │    │    │    │
//!      ┌────────┘    │    │    └─────────┐
//!      ▼             ▼    ▼              ▼
//! ┌─────────┐ ┌──────────┐ ┌────────┐ ┌────────────┐
//! │ LLM     │ │ Tool     │ │ Review │ │ Checkpoint │
//! │ Provider│ │ Registry │ │ Gate   │ │ Store      │
//! └─────────┘ └──────────┘ └────────┘ └────────────┘
//! ```
//!
//! Control flow lives exclusively in the engine; every other component is a
//! service it calls. Data flows forward as the evolving session state.

pub mod budget;
pub mod compressor;
mod engine;
pub mod review;

pub use budget::{TokenBudget, TokenUsage};
pub use compressor::{Compression, ContextCompressor, SUMMARY_PREFIX};
pub use engine::{Canceller, Engine};
pub use review::{classify_answer, review_prompt, ReviewAction};

//! Error types for Windlass
//!
//! This module defines all error types used throughout the engine.
//! Uses `thiserror` for ergonomic error handling with automatic `Display` and
//! `Error` trait implementations.

use thiserror::Error;

/// The primary error type for Windlass operations.
#[derive(Error, Debug)]
pub enum WindlassError {
    /// Configuration-related errors (invalid config, missing required fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider errors (API failures, rate limits, model errors, etc.)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Tool execution errors (invalid parameters, execution failures, etc.)
    #[error("Tool error: {0}")]
    Tool(String),

    /// Session state errors (unknown session, invalid phase for an operation, etc.)
    #[error("Session error: {0}")]
    Session(String),

    /// Checkpoint store errors. State durability is never silently skipped,
    /// so these always propagate to the caller.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// The in-flight step was cancelled by an external signal.
    #[error("Cancelled")]
    Cancelled,

    /// Standard I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A specialized `Result` type for Windlass operations.
pub type Result<T> = std::result::Result<T, WindlassError>;

//! Configuration type definitions.
//!
//! All fields have serde defaults so a partial config file (or none at all)
//! yields a working engine.

use serde::{Deserialize, Serialize};

/// Engine configuration: model defaults, context budget, loop limits and the
/// dangerous-tool set gated by human review.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model identifier passed to the provider
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens the model may generate per response
    pub max_output_tokens: u32,
    /// Context window capacity; the denominator for usage percentage
    pub max_tokens: u64,
    /// Fraction of `max_tokens` that triggers compression (inclusive)
    pub compression_threshold: f64,
    /// How many recent messages survive a compression verbatim
    pub recent_messages_kept: usize,
    /// Ceiling on loop iterations per invocation; the primary defense
    /// against runaway tool-call cycles
    pub max_loop_iterations: usize,
    /// Tool names requiring human review before execution
    pub dangerous_tools: Vec<String>,
    /// Workspace directory for file-operating tools
    pub workspace: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            temperature: 0.1,
            max_output_tokens: 4000,
            max_tokens: 128_000,
            compression_threshold: 0.92,
            recent_messages_kept: 5,
            max_loop_iterations: 25,
            dangerous_tools: vec![
                "write_file".to_string(),
                "edit_file".to_string(),
                "shell".to_string(),
            ],
            workspace: ".".to_string(),
        }
    }
}

impl EngineConfig {
    /// Whether a tool name is in the dangerous set.
    pub fn is_dangerous(&self, tool_name: &str) -> bool {
        self.dangerous_tools.iter().any(|t| t == tool_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_tokens, 128_000);
        assert_eq!(config.compression_threshold, 0.92);
        assert_eq!(config.recent_messages_kept, 5);
        assert_eq!(config.max_loop_iterations, 25);
        assert_eq!(config.workspace, ".");
    }

    #[test]
    fn test_default_dangerous_set() {
        let config = EngineConfig::default();
        assert!(config.is_dangerous("write_file"));
        assert!(config.is_dangerous("edit_file"));
        assert!(config.is_dangerous("shell"));
        assert!(!config.is_dangerous("read_file"));
        assert!(!config.is_dangerous("task_read"));
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"max_tokens": 1000, "compression_threshold": 0.5}"#).unwrap();
        assert_eq!(config.max_tokens, 1000);
        assert_eq!(config.compression_threshold, 0.5);
        // Unspecified fields take defaults
        assert_eq!(config.recent_messages_kept, 5);
        assert_eq!(config.model, "gpt-4o");
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.model, config.model);
        assert_eq!(parsed.dangerous_tools, config.dangerous_tools);
    }
}

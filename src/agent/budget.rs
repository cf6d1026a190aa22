//! Token budget tracking for the orchestration loop.
//!
//! The budget tracker answers two questions before every model call: how much
//! of the context window is in use, and whether compression is due. Usage is
//! derived from the conversation on demand, never stored.

use serde::{Deserialize, Serialize};

use crate::session::{Message, Role};

/// Derived context usage, computed on demand from the message history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TokenUsage {
    /// Tokens currently in use
    pub used: u64,
    /// Context window capacity
    pub total: u64,
    /// `used / total`
    pub percentage: f64,
}

/// Tracks context usage against a fixed budget and decides when the
/// conversation must be compressed.
#[derive(Debug, Clone, Copy)]
pub struct TokenBudget {
    max_tokens: u64,
    compression_threshold: f64,
}

impl TokenBudget {
    /// Create a budget tracker.
    ///
    /// # Arguments
    /// * `max_tokens` - Context window capacity (the percentage denominator)
    /// * `compression_threshold` - Fraction of capacity that triggers
    ///   compression, inclusive
    ///
    /// # Example
    /// ```
    /// use windlass::agent::TokenBudget;
    ///
    /// let budget = TokenBudget::new(128_000, 0.92);
    /// assert!(!budget.needs_compression(&[]));
    /// ```
    pub fn new(max_tokens: u64, compression_threshold: f64) -> Self {
        Self {
            max_tokens,
            compression_threshold,
        }
    }

    /// Compute current usage from the message history.
    ///
    /// Scans from most recent to oldest: the first assistant message carrying
    /// a provider usage annotation is authoritative (its figure reflects the
    /// cumulative cost as of that call; older figures are stale once newer
    /// messages exist). Without any annotation, falls back to estimating from
    /// content length.
    pub fn usage(&self, messages: &[Message]) -> TokenUsage {
        let mut used = 0u64;
        for message in messages.iter().rev() {
            if message.role == Role::Assistant {
                if let Some(annotation) = &message.usage {
                    used = annotation.context_cost();
                    break;
                }
            }
        }

        if used == 0 {
            used = Self::estimate_tokens(messages);
        }

        TokenUsage {
            used,
            total: self.max_tokens,
            percentage: used as f64 / self.max_tokens as f64,
        }
    }

    /// Estimate token count from raw content length: one token per four
    /// characters, rounded up.
    pub fn estimate_tokens(messages: &[Message]) -> u64 {
        let chars: u64 = messages.iter().map(|m| m.content.chars().count() as u64).sum();
        chars.div_ceil(4)
    }

    /// Whether the conversation has reached the compression threshold.
    /// The boundary is inclusive: exactly at the threshold triggers.
    pub fn needs_compression(&self, messages: &[Message]) -> bool {
        self.usage(messages).percentage >= self.compression_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::Usage;

    #[test]
    fn test_estimate_rounds_up() {
        let messages = vec![Message::user("abcde")]; // 5 chars -> 2 tokens
        assert_eq!(TokenBudget::estimate_tokens(&messages), 2);
    }

    #[test]
    fn test_estimate_from_combined_length() {
        // Scenario: 3 messages, no usage metadata, 400 chars combined
        let messages = vec![
            Message::user(&"a".repeat(100)),
            Message::assistant(&"b".repeat(200)),
            Message::user(&"c".repeat(100)),
        ];
        let budget = TokenBudget::new(1000, 0.92);
        let usage = budget.usage(&messages);
        assert_eq!(usage.used, 100);
        assert_eq!(usage.total, 1000);
        assert!((usage.percentage - 0.1).abs() < 1e-9);
        assert!(!budget.needs_compression(&messages));
    }

    #[test]
    fn test_newest_annotation_wins() {
        let messages = vec![
            Message::assistant("old").with_usage(Usage {
                total_tokens: 500,
                ..Default::default()
            }),
            Message::user("more work"),
            Message::assistant("new").with_usage(Usage {
                total_tokens: 900,
                cache_creation_tokens: 50,
                ..Default::default()
            }),
        ];
        let budget = TokenBudget::new(1000, 0.92);
        let usage = budget.usage(&messages);
        assert_eq!(usage.used, 950);
    }

    #[test]
    fn test_annotation_found_behind_tail_messages() {
        // Usage annotation on an older assistant message still wins over the
        // estimate when newer messages carry none.
        let messages = vec![
            Message::assistant("answer").with_usage(Usage {
                total_tokens: 800,
                ..Default::default()
            }),
            Message::user("follow-up"),
        ];
        let budget = TokenBudget::new(1000, 0.92);
        assert_eq!(budget.usage(&messages).used, 800);
    }

    #[test]
    fn test_threshold_boundary_inclusive() {
        let messages = vec![Message::assistant("x").with_usage(Usage {
            total_tokens: 920,
            ..Default::default()
        })];
        let budget = TokenBudget::new(1000, 0.92);
        // Exactly at the threshold triggers compression
        assert!(budget.needs_compression(&messages));

        let below = vec![Message::assistant("x").with_usage(Usage {
            total_tokens: 919,
            ..Default::default()
        })];
        assert!(!budget.needs_compression(&below));
    }

    #[test]
    fn test_usage_monotonic_without_compression() {
        let budget = TokenBudget::new(100_000, 0.92);
        let mut messages = Vec::new();
        let mut last = 0;
        for i in 0..20 {
            messages.push(Message::user(&format!("message number {}", i)));
            let used = budget.usage(&messages).used;
            assert!(used >= last, "usage decreased: {} < {}", used, last);
            last = used;
        }
    }

    #[test]
    fn test_empty_history() {
        let budget = TokenBudget::new(1000, 0.92);
        let usage = budget.usage(&[]);
        assert_eq!(usage.used, 0);
        assert_eq!(usage.percentage, 0.0);
        assert!(!budget.needs_compression(&[]));
    }
}

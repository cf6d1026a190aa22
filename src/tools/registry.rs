//! Tool registry for Windlass
//!
//! Holds the registered tools and the static concurrency partition derived
//! from each tool's classification at registration time.

use std::collections::HashMap;

use tracing::info;

use crate::provider::ToolDefinition;

use super::{Tool, ToolConcurrency};

/// A registry that holds and manages tools.
///
/// Registration partitions tools by concurrency safety once; routing and
/// dispatch query the partition, never the tool instance at call time.
///
/// # Example
///
/// ```rust
/// use windlass::tools::{ToolRegistry, ReadFileTool, ShellTool};
///
/// let mut registry = ToolRegistry::new();
/// registry.register(Box::new(ReadFileTool));
/// registry.register(Box::new(ShellTool::new()));
///
/// assert!(registry.is_safe_concurrency("read_file"));
/// assert!(!registry.is_safe_concurrency("shell"));
/// ```
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty tool registry.
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. A tool with the same name replaces the old one.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        info!(tool = %name, concurrency = %tool.concurrency(), "Registering tool");
        self.tools.insert(name, tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    /// Check if a tool exists.
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Whether a registered tool is in the safe-concurrency partition.
    /// Unknown tools report `false` (fail-closed).
    pub fn is_safe_concurrency(&self, name: &str) -> bool {
        self.tools
            .get(name)
            .map(|t| t.concurrency() == ToolConcurrency::Safe)
            .unwrap_or(false)
    }

    /// Names of all tools in the safe-concurrency partition.
    pub fn safe_names(&self) -> Vec<&str> {
        self.tools
            .values()
            .filter(|t| t.concurrency() == ToolConcurrency::Safe)
            .map(|t| t.name())
            .collect()
    }

    /// Names of all tools in the unsafe-concurrency partition.
    pub fn unsafe_names(&self) -> Vec<&str> {
        self.tools
            .values()
            .filter(|t| t.concurrency() == ToolConcurrency::Unsafe)
            .map(|t| t.name())
            .collect()
    }

    /// Tool definitions for the LLM provider.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters(),
            })
            .collect()
    }

    /// Names of all registered tools.
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(|s| s.as_str()).collect()
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Text search tool.
//!
//! In-process regex search over a file or a directory tree, replacing the
//! original's shell-out to grep(1). Read-only, so it sits in the
//! safe-concurrency partition.

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use crate::error::{Result, WindlassError};

use super::{Tool, ToolConcurrency, ToolContext, ToolOutput};

/// Cap on reported matches so a broad pattern cannot flood the context.
const MAX_MATCHES: usize = 200;

/// Tool for searching file contents with a regex pattern.
///
/// # Parameters
/// - `pattern`: The regex pattern to search for (required)
/// - `path`: A file or directory to search; defaults to the workspace root
pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Search for a regex pattern in a file or recursively in a directory, \
         returning matching lines with file and line number"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "The regex pattern to search for"
                },
                "path": {
                    "type": "string",
                    "description": "File or directory to search, defaults to the workspace root"
                }
            },
            "required": ["pattern"]
        })
    }

    fn concurrency(&self) -> ToolConcurrency {
        ToolConcurrency::Safe
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let pattern = args
            .get("pattern")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WindlassError::Tool("Missing 'pattern' argument".into()))?;
        let regex = Regex::new(pattern)
            .map_err(|e| WindlassError::Tool(format!("Invalid pattern '{}': {}", pattern, e)))?;

        let root = {
            let path = args.get("path").and_then(|v| v.as_str()).unwrap_or(".");
            let candidate = PathBuf::from(path);
            if candidate.is_absolute() {
                candidate
            } else {
                match &ctx.workspace {
                    Some(ws) => PathBuf::from(ws).join(candidate),
                    None => candidate,
                }
            }
        };

        let mut matches = Vec::new();
        search_path(&root, &regex, &mut matches)?;

        if matches.is_empty() {
            return Ok(ToolOutput::message(format!("No matches for: {}", pattern)));
        }

        let truncated = matches.len() > MAX_MATCHES;
        matches.truncate(MAX_MATCHES);
        let mut output = matches.join("\n");
        if truncated {
            output.push_str(&format!("\n... (truncated at {} matches)", MAX_MATCHES));
        }
        Ok(ToolOutput::message(output))
    }
}

/// Recursively search a file or directory, collecting `path:line: text`.
fn search_path(path: &Path, regex: &Regex, matches: &mut Vec<String>) -> Result<()> {
    if matches.len() > MAX_MATCHES {
        return Ok(());
    }

    let metadata = std::fs::metadata(path).map_err(|e| {
        WindlassError::Tool(format!("Cannot access '{}': {}", path.display(), e))
    })?;

    if metadata.is_dir() {
        let mut entries: Vec<_> = std::fs::read_dir(path)
            .map_err(|e| {
                WindlassError::Tool(format!("Cannot read directory '{}': {}", path.display(), e))
            })?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        entries.sort();
        for entry in entries {
            // Hidden entries stay out of recursive searches
            let hidden = entry
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('.'))
                .unwrap_or(false);
            if !hidden {
                search_path(&entry, regex, matches)?;
            }
        }
        return Ok(());
    }

    // Binary files fail UTF-8 and are skipped silently
    let Ok(content) = std::fs::read_to_string(path) else {
        return Ok(());
    };
    for (line_number, line) in content.lines().enumerate() {
        if regex.is_match(line) {
            matches.push(format!("{}:{}: {}", path.display(), line_number + 1, line));
            if matches.len() > MAX_MATCHES {
                return Ok(());
            }
        }
    }
    Ok(())
}

//! Filesystem tools
//!
//! Reading, writing, editing and listing files. Relative paths resolve
//! against the workspace in the tool context. Read and list are in the
//! safe-concurrency partition; write and edit are not.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;

use crate::error::{Result, WindlassError};

use super::{Tool, ToolConcurrency, ToolContext, ToolOutput};

/// Resolve a path against the workspace in the context.
fn resolve_path(path: &str, ctx: &ToolContext) -> PathBuf {
    let candidate = PathBuf::from(path);
    if candidate.is_absolute() {
        return candidate;
    }
    match &ctx.workspace {
        Some(ws) => PathBuf::from(ws).join(candidate),
        None => candidate,
    }
}

fn require_str_arg(args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| WindlassError::Tool(format!("Missing '{}' argument", key)))
}

/// Tool for reading file contents.
///
/// # Parameters
/// - `path`: The path to the file to read (required)
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read the contents of a file at the specified path"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to read"
                }
            },
            "required": ["path"]
        })
    }

    fn concurrency(&self) -> ToolConcurrency {
        ToolConcurrency::Safe
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let path = require_str_arg(&args, "path")?;
        let full_path = resolve_path(&path, ctx);

        let content = tokio::fs::read_to_string(&full_path).await.map_err(|e| {
            WindlassError::Tool(format!("Failed to read file '{}': {}", full_path.display(), e))
        })?;
        Ok(ToolOutput::message(content))
    }
}

/// Tool for writing content to a file.
///
/// Creates parent directories as needed; overwrites an existing file.
///
/// # Parameters
/// - `path`: The path to the file to write (required)
/// - `content`: The content to write (required)
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write content to a file at the specified path, creating it if necessary"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to write"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write to the file"
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let path = require_str_arg(&args, "path")?;
        let content = require_str_arg(&args, "content")?;
        let full_path = resolve_path(&path, ctx);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                WindlassError::Tool(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        tokio::fs::write(&full_path, &content).await.map_err(|e| {
            WindlassError::Tool(format!(
                "Failed to write file '{}': {}",
                full_path.display(),
                e
            ))
        })?;

        Ok(ToolOutput::message(format!(
            "Wrote {} bytes to {}",
            content.len(),
            full_path.display()
        )))
    }
}

/// Tool for editing a file by replacing the first occurrence of a text.
///
/// # Parameters
/// - `path`: The file to edit (required)
/// - `search`: The exact text to find (required)
/// - `replace`: The replacement text (required)
pub struct EditFileTool;

#[async_trait]
impl Tool for EditFileTool {
    fn name(&self) -> &str {
        "edit_file"
    }

    fn description(&self) -> &str {
        "Edit a file by replacing the first occurrence of a search text with new text"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The path to the file to edit"
                },
                "search": {
                    "type": "string",
                    "description": "The exact text to search for"
                },
                "replace": {
                    "type": "string",
                    "description": "The text to replace it with"
                }
            },
            "required": ["path", "search", "replace"]
        })
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let path = require_str_arg(&args, "path")?;
        let search = require_str_arg(&args, "search")?;
        let replace = require_str_arg(&args, "replace")?;
        let full_path = resolve_path(&path, ctx);

        let content = tokio::fs::read_to_string(&full_path).await.map_err(|e| {
            WindlassError::Tool(format!("Failed to read file '{}': {}", full_path.display(), e))
        })?;

        if !content.contains(&search) {
            return Err(WindlassError::Tool(format!(
                "Search text not found in '{}'",
                full_path.display()
            )));
        }

        let new_content = content.replacen(&search, &replace, 1);
        tokio::fs::write(&full_path, new_content).await.map_err(|e| {
            WindlassError::Tool(format!(
                "Failed to write file '{}': {}",
                full_path.display(),
                e
            ))
        })?;

        Ok(ToolOutput::message(format!(
            "Edited {}",
            full_path.display()
        )))
    }
}

/// Tool for listing directory contents.
///
/// # Parameters
/// - `path`: The directory to list; defaults to the workspace root (optional)
pub struct ListDirTool;

#[async_trait]
impl Tool for ListDirTool {
    fn name(&self) -> &str {
        "list_dir"
    }

    fn description(&self) -> &str {
        "List the contents of a directory, marking entries as [DIR] or [FILE]"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The directory path, defaults to the workspace root"
                }
            }
        })
    }

    fn concurrency(&self) -> ToolConcurrency {
        ToolConcurrency::Safe
    }

    async fn execute(&self, args: Value, ctx: &ToolContext) -> Result<ToolOutput> {
        let path = args
            .get("path")
            .and_then(|v| v.as_str())
            .unwrap_or(".")
            .to_string();
        let full_path = resolve_path(&path, ctx);

        let mut entries = tokio::fs::read_dir(&full_path).await.map_err(|e| {
            WindlassError::Tool(format!(
                "Failed to list directory '{}': {}",
                full_path.display(),
                e
            ))
        })?;

        let mut lines = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let kind = if entry.file_type().await?.is_dir() {
                "[DIR]"
            } else {
                "[FILE]"
            };
            lines.push(format!("{} {}", kind, entry.file_name().to_string_lossy()));
        }
        lines.sort();

        Ok(ToolOutput::message(if lines.is_empty() {
            format!("Directory {} is empty", full_path.display())
        } else {
            lines.join("\n")
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn ctx_in(dir: &TempDir) -> ToolContext {
        ToolContext::new().with_workspace(&dir.path().to_string_lossy())
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_in(&dir);

        let write = WriteFileTool
            .execute(json!({"path": "notes.txt", "content": "hello"}), &ctx)
            .await
            .unwrap();
        assert!(write.text().contains("5 bytes"));

        let read = ReadFileTool
            .execute(json!({"path": "notes.txt"}), &ctx)
            .await
            .unwrap();
        assert_eq!(read.text(), "hello");
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_in(&dir);

        WriteFileTool
            .execute(json!({"path": "a/b/c.txt", "content": "nested"}), &ctx)
            .await
            .unwrap();

        let read = ReadFileTool
            .execute(json!({"path": "a/b/c.txt"}), &ctx)
            .await
            .unwrap();
        assert_eq!(read.text(), "nested");
    }

    #[tokio::test]
    async fn test_read_missing_file_errors() {
        let dir = TempDir::new().unwrap();
        let result = ReadFileTool
            .execute(json!({"path": "missing.txt"}), &ctx_in(&dir))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_read_missing_path_argument() {
        let dir = TempDir::new().unwrap();
        let result = ReadFileTool.execute(json!({}), &ctx_in(&dir)).await;
        assert!(matches!(result, Err(WindlassError::Tool(_))));
    }

    #[tokio::test]
    async fn test_edit_replaces_first_occurrence() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_in(&dir);

        WriteFileTool
            .execute(json!({"path": "f.txt", "content": "foo bar foo"}), &ctx)
            .await
            .unwrap();
        EditFileTool
            .execute(
                json!({"path": "f.txt", "search": "foo", "replace": "baz"}),
                &ctx,
            )
            .await
            .unwrap();

        let read = ReadFileTool.execute(json!({"path": "f.txt"}), &ctx).await.unwrap();
        assert_eq!(read.text(), "baz bar foo");
    }

    #[tokio::test]
    async fn test_edit_search_not_found() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_in(&dir);
        WriteFileTool
            .execute(json!({"path": "f.txt", "content": "abc"}), &ctx)
            .await
            .unwrap();

        let result = EditFileTool
            .execute(
                json!({"path": "f.txt", "search": "zzz", "replace": "x"}),
                &ctx,
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_list_dir_marks_kinds() {
        let dir = TempDir::new().unwrap();
        let ctx = ctx_in(&dir);
        WriteFileTool
            .execute(json!({"path": "file.txt", "content": "x"}), &ctx)
            .await
            .unwrap();
        tokio::fs::create_dir(dir.path().join("sub")).await.unwrap();

        let listing = ListDirTool.execute(json!({}), &ctx).await.unwrap();
        assert!(listing.text().contains("[FILE] file.txt"));
        assert!(listing.text().contains("[DIR] sub"));
    }

    #[tokio::test]
    async fn test_list_dir_empty() {
        let dir = TempDir::new().unwrap();
        let listing = ListDirTool.execute(json!({}), &ctx_in(&dir)).await.unwrap();
        assert!(listing.text().contains("is empty"));
    }

    #[test]
    fn test_concurrency_partition() {
        assert_eq!(ReadFileTool.concurrency(), ToolConcurrency::Safe);
        assert_eq!(ListDirTool.concurrency(), ToolConcurrency::Safe);
        assert_eq!(WriteFileTool.concurrency(), ToolConcurrency::Unsafe);
        assert_eq!(EditFileTool.concurrency(), ToolConcurrency::Unsafe);
    }

    #[test]
    fn test_resolve_path_absolute_wins() {
        let ctx = ToolContext::new().with_workspace("/ws");
        assert_eq!(resolve_path("/etc/hosts", &ctx), PathBuf::from("/etc/hosts"));
        assert_eq!(resolve_path("rel.txt", &ctx), PathBuf::from("/ws/rel.txt"));
    }
}

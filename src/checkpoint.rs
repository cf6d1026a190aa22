//! Checkpoint store - durable session state keyed by session id.
//!
//! Every engine step saves the session here, so execution can be paused,
//! inspected, and resumed. `save` both replaces the latest snapshot and
//! appends to an append-only history log per session. I/O failures always
//! propagate: state durability is never silently skipped.
//!
//! The store is safe to clone and share across tasks; distinct session ids
//! never interfere.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::{Result, WindlassError};
use crate::session::SessionState;

/// Durable store for session state with per-id append-only history.
///
/// # Example
///
/// ```
/// use windlass::checkpoint::CheckpointStore;
/// use windlass::session::SessionState;
///
/// #[tokio::main]
/// async fn main() {
///     let store = CheckpointStore::new_memory();
///     let state = SessionState::new("demo");
///     store.save(&state).await.unwrap();
///
///     let loaded = store.load("demo").await.unwrap().unwrap();
///     assert_eq!(loaded.session_id, "demo");
/// }
/// ```
pub struct CheckpointStore {
    /// Latest snapshot per session id
    latest: Arc<RwLock<HashMap<String, SessionState>>>,
    /// Append-only history per session id
    history: Arc<RwLock<HashMap<String, Vec<SessionState>>>>,
    /// Optional directory for file-based persistence
    storage_path: Option<PathBuf>,
}

impl CheckpointStore {
    /// Create an in-memory store without persistence.
    pub fn new_memory() -> Self {
        Self {
            latest: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(HashMap::new())),
            storage_path: None,
        }
    }

    /// Create a store persisting to the given directory.
    ///
    /// Each session is stored as `<id>.json` (latest snapshot) plus
    /// `<id>.history.jsonl` (append-only log). The directory is created if
    /// missing.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)
            .map_err(|e| WindlassError::Checkpoint(format!("Cannot create store dir: {}", e)))?;
        Ok(Self {
            latest: Arc::new(RwLock::new(HashMap::new())),
            history: Arc::new(RwLock::new(HashMap::new())),
            storage_path: Some(path),
        })
    }

    /// Save a session snapshot: replaces the latest and appends to history.
    pub async fn save(&self, state: &SessionState) -> Result<()> {
        {
            let mut latest = self.latest.write().await;
            latest.insert(state.session_id.clone(), state.clone());
        }
        {
            let mut history = self.history.write().await;
            history
                .entry(state.session_id.clone())
                .or_default()
                .push(state.clone());
        }

        if let Some(dir) = &self.storage_path {
            let key = sanitize_key(&state.session_id);

            let latest_path = dir.join(format!("{}.json", key));
            let content = serde_json::to_string_pretty(state)?;
            tokio::fs::write(&latest_path, content).await.map_err(|e| {
                WindlassError::Checkpoint(format!(
                    "Failed to write '{}': {}",
                    latest_path.display(),
                    e
                ))
            })?;

            let history_path = dir.join(format!("{}.history.jsonl", key));
            let mut line = serde_json::to_string(state)?;
            line.push('\n');
            let mut existing = tokio::fs::read_to_string(&history_path)
                .await
                .unwrap_or_default();
            existing.push_str(&line);
            tokio::fs::write(&history_path, existing).await.map_err(|e| {
                WindlassError::Checkpoint(format!(
                    "Failed to append '{}': {}",
                    history_path.display(),
                    e
                ))
            })?;
        }

        Ok(())
    }

    /// Load the latest snapshot for a session id, if any.
    pub async fn load(&self, session_id: &str) -> Result<Option<SessionState>> {
        {
            let latest = self.latest.read().await;
            if let Some(state) = latest.get(session_id) {
                return Ok(Some(state.clone()));
            }
        }

        if let Some(dir) = &self.storage_path {
            let path = dir.join(format!("{}.json", sanitize_key(session_id)));
            if path.exists() {
                let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    WindlassError::Checkpoint(format!("Failed to read '{}': {}", path.display(), e))
                })?;
                let state: SessionState = serde_json::from_str(&content)?;

                let mut latest = self.latest.write().await;
                latest.insert(session_id.to_string(), state.clone());
                return Ok(Some(state));
            }
        }

        Ok(None)
    }

    /// The ordered sequence of past snapshots for a session id.
    pub async fn history(&self, session_id: &str) -> Result<Vec<SessionState>> {
        {
            let history = self.history.read().await;
            if let Some(states) = history.get(session_id) {
                return Ok(states.clone());
            }
        }

        if let Some(dir) = &self.storage_path {
            let path = dir.join(format!("{}.history.jsonl", sanitize_key(session_id)));
            if path.exists() {
                let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
                    WindlassError::Checkpoint(format!("Failed to read '{}': {}", path.display(), e))
                })?;
                let mut states = Vec::new();
                for line in content.lines().filter(|l| !l.trim().is_empty()) {
                    states.push(serde_json::from_str(line)?);
                }
                return Ok(states);
            }
        }

        Ok(Vec::new())
    }

    /// Check whether a session id is known to the store.
    pub async fn exists(&self, session_id: &str) -> bool {
        {
            let latest = self.latest.read().await;
            if latest.contains_key(session_id) {
                return true;
            }
        }
        if let Some(dir) = &self.storage_path {
            return dir.join(format!("{}.json", sanitize_key(session_id))).exists();
        }
        false
    }

    /// List all known session ids, sorted.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = {
            let latest = self.latest.read().await;
            latest.keys().cloned().collect()
        };

        if let Some(dir) = &self.storage_path {
            let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
                WindlassError::Checkpoint(format!("Failed to list store dir: {}", e))
            })?;
            while let Some(entry) = entries.next_entry().await.map_err(WindlassError::Io)? {
                let name = entry.file_name().to_string_lossy().to_string();
                if let Some(stem) = name.strip_suffix(".json") {
                    if stem.ends_with(".history") {
                        continue;
                    }
                    let id = unsanitize_key(stem);
                    if !ids.contains(&id) {
                        ids.push(id);
                    }
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    /// Delete a session's latest snapshot and history.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        {
            let mut latest = self.latest.write().await;
            latest.remove(session_id);
        }
        {
            let mut history = self.history.write().await;
            history.remove(session_id);
        }

        if let Some(dir) = &self.storage_path {
            let key = sanitize_key(session_id);
            for path in [
                dir.join(format!("{}.json", key)),
                dir.join(format!("{}.history.jsonl", key)),
            ] {
                if path.exists() {
                    tokio::fs::remove_file(&path).await.map_err(|e| {
                        WindlassError::Checkpoint(format!(
                            "Failed to delete '{}': {}",
                            path.display(),
                            e
                        ))
                    })?;
                }
            }
        }

        Ok(())
    }
}

impl Clone for CheckpointStore {
    fn clone(&self) -> Self {
        Self {
            latest: Arc::clone(&self.latest),
            history: Arc::clone(&self.history),
            storage_path: self.storage_path.clone(),
        }
    }
}

impl Default for CheckpointStore {
    /// Creates an in-memory store.
    fn default() -> Self {
        Self::new_memory()
    }
}

/// Sanitize a session id for use as a filename.
///
/// Percent-encodes characters that are problematic in filenames so the
/// mapping is bijective; distinct ids never collide on disk.
fn sanitize_key(key: &str) -> String {
    let mut result = String::with_capacity(key.len() * 3);
    for c in key.chars() {
        match c {
            '/' => result.push_str("%2F"),
            '\\' => result.push_str("%5C"),
            ':' => result.push_str("%3A"),
            '*' => result.push_str("%2A"),
            '?' => result.push_str("%3F"),
            '"' => result.push_str("%22"),
            '<' => result.push_str("%3C"),
            '>' => result.push_str("%3E"),
            '|' => result.push_str("%7C"),
            '%' => result.push_str("%25"),
            c => result.push(c),
        }
    }
    result
}

/// Inverse of `sanitize_key`.
fn unsanitize_key(sanitized: &str) -> String {
    let mut result = String::with_capacity(sanitized.len());
    let mut chars = sanitized.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '%' {
            let hex: String = chars.by_ref().take(2).collect();
            if hex.len() == 2 {
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    result.push(byte as char);
                    continue;
                }
            }
            result.push('%');
            result.push_str(&hex);
        } else {
            result.push(c);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{Message, SessionStatus};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let store = CheckpointStore::new_memory();
        let mut state = SessionState::new("s1");
        state.push_message(Message::user("Hello"));
        store.save(&state).await.unwrap();

        let loaded = store.load("s1").await.unwrap().unwrap();
        assert_eq!(loaded.session_id, "s1");
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(loaded.messages[0].content, "Hello");
    }

    #[tokio::test]
    async fn test_load_unknown_session() {
        let store = CheckpointStore::new_memory();
        assert!(store.load("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_grows_per_save() {
        let store = CheckpointStore::new_memory();
        let mut state = SessionState::new("s1");

        store.save(&state).await.unwrap();
        state.push_message(Message::user("one"));
        store.save(&state).await.unwrap();
        state.push_message(Message::user("two"));
        store.save(&state).await.unwrap();

        let history = store.history("s1").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].messages.len(), 0);
        assert_eq!(history[1].messages.len(), 1);
        assert_eq!(history[2].messages.len(), 2);
    }

    #[tokio::test]
    async fn test_file_persistence_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        {
            let store = CheckpointStore::with_path(path.clone()).unwrap();
            let mut state = SessionState::new("persist");
            state.push_message(Message::user("durable"));
            state.set_status(SessionStatus::AwaitingReview);
            store.save(&state).await.unwrap();
        }

        // A fresh store instance reads the snapshot from disk
        let store = CheckpointStore::with_path(path).unwrap();
        let loaded = store.load("persist").await.unwrap().unwrap();
        assert_eq!(loaded.messages[0].content, "durable");
        assert_eq!(loaded.status, SessionStatus::AwaitingReview);
    }

    #[tokio::test]
    async fn test_file_history_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        {
            let store = CheckpointStore::with_path(path.clone()).unwrap();
            let mut state = SessionState::new("h");
            store.save(&state).await.unwrap();
            state.push_message(Message::user("x"));
            store.save(&state).await.unwrap();
        }

        let store = CheckpointStore::with_path(path).unwrap();
        let history = store.history("h").await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_everything() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::with_path(dir.path().to_path_buf()).unwrap();
        let state = SessionState::new("gone");
        store.save(&state).await.unwrap();
        assert!(store.exists("gone").await);

        store.delete("gone").await.unwrap();
        assert!(!store.exists("gone").await);
        assert!(store.history("gone").await.unwrap().is_empty());
        assert!(!dir.path().join("gone.json").exists());
        assert!(!dir.path().join("gone.history.jsonl").exists());
    }

    #[tokio::test]
    async fn test_list_returns_original_ids() {
        let dir = TempDir::new().unwrap();
        let store = CheckpointStore::with_path(dir.path().to_path_buf()).unwrap();

        for id in ["cli:alpha", "cli:beta", "plain"] {
            store.save(&SessionState::new(id)).await.unwrap();
        }

        // A fresh instance lists from disk, recovering the unsanitized ids
        let fresh = CheckpointStore::with_path(dir.path().to_path_buf()).unwrap();
        let ids = fresh.list().await.unwrap();
        assert_eq!(ids, vec!["cli:alpha", "cli:beta", "plain"]);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let store = CheckpointStore::new_memory();
        let clone = store.clone();

        store.save(&SessionState::new("shared")).await.unwrap();
        assert!(clone.load("shared").await.unwrap().is_some());
    }

    #[test]
    fn test_sanitize_key_bijective() {
        let keys = ["simple", "cli:chat123", "path/to/session", "100%done"];
        for key in &keys {
            let sanitized = sanitize_key(key);
            assert_eq!(unsanitize_key(&sanitized), *key);
        }
    }

    #[test]
    fn test_sanitize_key_no_collisions() {
        assert_ne!(sanitize_key("a:b"), sanitize_key("a/b"));
        assert_ne!(sanitize_key("a:b"), sanitize_key("a_b"));
        assert_eq!(sanitize_key("a:b"), "a%3Ab");
    }
}

//! Conversation session storage.
//!
//! The orchestration core consumes session history through the
//! `SessionStore` trait and never owns the persistence format. Two
//! implementations ship with the crate: an in-memory store for tests and
//! ephemeral use, and a JSON-file store with atomic writes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;

use crate::error::LandCompError;
use crate::types::ConversationTurn;

/// Append-only, ordered per-session conversation history.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// All turns of a session, oldest first. Unknown sessions are empty.
    async fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>, LandCompError>;

    /// Append a turn to a session, creating the session if needed.
    async fn append(&self, session_id: &str, turn: ConversationTurn)
        -> Result<(), LandCompError>;
}

/// In-memory session store.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<ConversationTurn>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>, LandCompError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn append(
        &self,
        session_id: &str,
        turn: ConversationTurn,
    ) -> Result<(), LandCompError> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(turn);
        Ok(())
    }
}

/// JSON-file-backed session store.
///
/// Each session lives in `<base_dir>/<session_id>.json` and is rewritten
/// atomically (write to a temp file, then rename).
pub struct FileSessionStore {
    base_dir: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileSessionStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        // Session ids become file names; keep them to a safe subset.
        let safe: String = session_id
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.base_dir.join(format!("{}.json", safe))
    }

    fn read_session(&self, session_id: &str) -> Result<Vec<ConversationTurn>, LandCompError> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&data)?)
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn history(&self, session_id: &str) -> Result<Vec<ConversationTurn>, LandCompError> {
        self.read_session(session_id)
    }

    async fn append(
        &self,
        session_id: &str,
        turn: ConversationTurn,
    ) -> Result<(), LandCompError> {
        let _guard = self.write_lock.lock().await;

        let mut turns = self.read_session(session_id)?;
        turns.push(turn);

        std::fs::create_dir_all(&self.base_dir)?;
        let json = serde_json::to_string_pretty(&turns)?;
        let target = self.session_path(session_id);
        let tmp = target.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, &target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[tokio::test]
    async fn test_in_memory_append_preserves_order() {
        let store = InMemorySessionStore::new();
        store
            .append("s1", ConversationTurn::user("first"))
            .await
            .unwrap();
        store
            .append("s1", ConversationTurn::assistant("second"))
            .await
            .unwrap();

        let history = store.history("s1").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].text, "first");
        assert_eq!(history[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_in_memory_sessions_are_isolated() {
        let store = InMemorySessionStore::new();
        store
            .append("a", ConversationTurn::user("for a"))
            .await
            .unwrap();

        assert_eq!(store.history("a").await.unwrap().len(), 1);
        assert!(store.history("b").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());

        store
            .append("plot-42", ConversationTurn::user("how deep for a fence post?"))
            .await
            .unwrap();
        store
            .append("plot-42", ConversationTurn::assistant("at least 80 cm"))
            .await
            .unwrap();

        let history = store.history("plot-42").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].text, "at least 80 cm");
    }

    #[tokio::test]
    async fn test_file_store_unknown_session_is_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        assert!(store.history("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_store_sanitizes_session_ids() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path());
        store
            .append("../escape", ConversationTurn::user("hi"))
            .await
            .unwrap();

        // The file stays inside the base directory.
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(store.history("../escape").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempfile::TempDir::new().unwrap();
        {
            let store = FileSessionStore::new(dir.path());
            store
                .append("s", ConversationTurn::user("persisted"))
                .await
                .unwrap();
        }
        let reopened = FileSessionStore::new(dir.path());
        assert_eq!(reopened.history("s").await.unwrap().len(), 1);
    }
}

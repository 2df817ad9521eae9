//! Per-conversation turn history.
//!
//! The top-level map is guarded by an `RwLock`; each history has its own
//! `Mutex` so appends to different conversations never contend.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use plugboard_core::message::{ConversationId, Role, Turn};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

/// Content that replaces tool output when history is pruned.
pub const CLEARED_TOOL_RESPONSE: &str =
    "This function's response has been cleared to save on token usage";

type History = Arc<Mutex<Vec<Turn>>>;

/// In-memory mapping of conversation id to ordered turns.
pub struct ConversationStore {
    base_prompt: RwLock<String>,
    /// Re-read on every `read`; the last good contents are kept on failure
    prompt_file: Option<PathBuf>,
    conversations: RwLock<HashMap<ConversationId, History>>,
    run_locks: RwLock<HashMap<ConversationId, Arc<Mutex<()>>>>,
}

impl ConversationStore {
    /// Create a store whose system turns start with `base_prompt`.
    pub fn new(base_prompt: impl Into<String>) -> Self {
        Self {
            base_prompt: RwLock::new(base_prompt.into()),
            prompt_file: None,
            conversations: RwLock::new(HashMap::new()),
            run_locks: RwLock::new(HashMap::new()),
        }
    }

    /// Take the base prompt from `path` on every read, so edits apply to
    /// the next request without a restart.
    pub fn with_prompt_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.prompt_file = Some(path.into());
        self
    }

    /// The current base prompt, refreshed from the prompt file if one is set.
    pub async fn base_prompt(&self) -> String {
        if let Some(path) = &self.prompt_file {
            match tokio::fs::read_to_string(path).await {
                Ok(text) => {
                    *self.base_prompt.write().await = text.clone();
                    return text;
                }
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Prompt file unreadable, keeping previous prompt");
                }
            }
        }
        self.base_prompt.read().await.clone()
    }

    async fn existing(&self, id: &ConversationId) -> Option<History> {
        self.conversations.read().await.get(id).cloned()
    }

    /// Append a turn, creating the conversation if needed.
    pub async fn append(&self, id: &ConversationId, turn: Turn) {
        let history = match self.existing(id).await {
            Some(history) => history,
            None => self
                .conversations
                .write()
                .await
                .entry(id.clone())
                .or_default()
                .clone(),
        };

        debug!(conversation_id = %id, role = %turn.role, "Appending turn");
        history.lock().await.push(turn);
    }

    /// History prefixed by a freshly built system turn.
    ///
    /// The system turn is `base_prompt` followed by `context_info` and is
    /// never written back. An unknown id yields an empty list.
    pub async fn read(&self, id: &ConversationId, context_info: &str) -> Vec<Turn> {
        let Some(history) = self.existing(id).await else {
            return Vec::new();
        };

        let base_prompt = self.base_prompt().await;
        let history = history.lock().await;
        let mut turns = Vec::with_capacity(history.len() + 1);
        turns.push(Turn::system(format!("{base_prompt}{context_info}")));
        turns.extend(history.iter().filter(|t| t.role != Role::System).cloned());
        turns
    }

    /// Scrub tool output, then keep only the newest `keep_last_n` turns.
    pub async fn prune(&self, id: &ConversationId, keep_last_n: usize) {
        let Some(history) = self.existing(id).await else {
            return;
        };

        let mut history = history.lock().await;
        for turn in history.iter_mut().filter(|t| t.role == Role::Tool) {
            turn.content = CLEARED_TOOL_RESPONSE.to_string();
        }

        let excess = history.len().saturating_sub(keep_last_n);
        if excess > 0 {
            history.drain(..excess);
        }
        debug!(conversation_id = %id, dropped = excess, kept = history.len(), "Pruned history");
    }

    /// Stored turns exactly as they are.
    pub async fn history(&self, id: &ConversationId) -> Vec<Turn> {
        match self.existing(id).await {
            Some(history) => history.lock().await.clone(),
            None => Vec::new(),
        }
    }

    /// Number of conversations with any history.
    pub async fn conversation_count(&self) -> usize {
        self.conversations.read().await.len()
    }

    /// Exclusive guard over one conversation's orchestration run.
    ///
    /// Hold it for a whole request/tool chain so two inbound messages in
    /// the same conversation cannot interleave their turns.
    pub async fn conversation_lock(&self, id: &ConversationId) -> OwnedMutexGuard<()> {
        let existing = self.run_locks.read().await.get(id).cloned();
        let lock = match existing {
            Some(lock) => lock,
            None => self
                .run_locks
                .write()
                .await
                .entry(id.clone())
                .or_default()
                .clone(),
        };
        lock.lock_owned().await
    }
}

impl std::fmt::Debug for ConversationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationStore")
            .field("prompt_file", &self.prompt_file)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn id(s: &str) -> ConversationId {
        ConversationId::from(s)
    }

    #[tokio::test]
    async fn unknown_conversation_reads_empty() {
        let store = ConversationStore::new("Be helpful.");
        assert!(store.read(&id("nope"), "ctx").await.is_empty());
        assert_eq!(store.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn append_then_read_prepends_system_turn() {
        let store = ConversationStore::new("Be helpful.");
        store.append(&id("c1"), Turn::user("hello")).await;

        let turns = store.read(&id("c1"), "\nMessage ID: 1").await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::System);
        assert_eq!(turns[0].content, "Be helpful.\nMessage ID: 1");
        assert_eq!(turns[1].role, Role::User);
        assert_eq!(turns[1].content, "hello");
    }

    #[tokio::test]
    async fn system_turn_is_never_stored() {
        let store = ConversationStore::new("base");
        store.append(&id("c1"), Turn::user("hi")).await;

        let first = store.read(&id("c1"), " one").await;
        let second = store.read(&id("c1"), " two").await;
        assert_eq!(first[0].content, "base one");
        assert_eq!(second[0].content, "base two");
        assert_eq!(second.iter().filter(|t| t.role == Role::System).count(), 1);

        let stored = store.history(&id("c1")).await;
        assert_eq!(stored.len(), 1);
        assert!(stored.iter().all(|t| t.role != Role::System));
    }

    #[tokio::test]
    async fn prompt_file_edits_apply_on_next_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("initial_prompt.txt");
        std::fs::write(&path, "v1").unwrap();

        let store = ConversationStore::new("startup").with_prompt_file(&path);
        store.append(&id("c1"), Turn::user("hi")).await;
        assert_eq!(store.read(&id("c1"), "").await[0].content, "v1");

        std::fs::write(&path, "v2").unwrap();
        assert_eq!(store.read(&id("c1"), " ctx").await[0].content, "v2 ctx");

        std::fs::remove_file(&path).unwrap();
        assert_eq!(store.read(&id("c1"), "").await[0].content, "v2");
    }

    #[tokio::test]
    async fn stray_system_turns_are_replaced_on_read() {
        let store = ConversationStore::new("base");
        store.append(&id("c1"), Turn::system("stale")).await;
        store.append(&id("c1"), Turn::user("hi")).await;

        let turns = store.read(&id("c1"), "").await;
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "base");
        assert_eq!(turns[1].content, "hi");
    }

    #[tokio::test]
    async fn prune_drops_oldest_and_scrubs_tool_turns() {
        let store = ConversationStore::new("");
        let c = id("c1");
        store.append(&c, Turn::user("u1")).await;
        store.append(&c, Turn::tool_call("echo", "{}")).await;
        store.append(&c, Turn::tool_result("echo", "old result")).await;
        store.append(&c, Turn::assistant("a1")).await;
        store.append(&c, Turn::user("u2")).await;
        store.append(&c, Turn::tool_call("echo", "{}")).await;
        store.append(&c, Turn::tool_result("echo", "new result")).await;
        store.append(&c, Turn::assistant("a2")).await;

        store.prune(&c, 5).await;

        let stored = store.history(&c).await;
        assert_eq!(stored.len(), 5);
        assert_eq!(stored[0].content, "a1");
        assert_eq!(stored[1].content, "u2");
        assert_eq!(stored[3].content, CLEARED_TOOL_RESPONSE);
        assert_eq!(stored[3].tool_name.as_deref(), Some("echo"));
        assert_eq!(stored[4].content, "a2");
    }

    #[tokio::test]
    async fn prune_shorter_than_limit_only_scrubs() {
        let store = ConversationStore::new("");
        let c = id("c1");
        store.append(&c, Turn::user("u1")).await;
        store.append(&c, Turn::tool_result("echo", "payload")).await;

        store.prune(&c, 8).await;

        let stored = store.history(&c).await;
        assert_eq!(stored.len(), 2);
        assert_eq!(
            stored[1].content,
            "This function's response has been cleared to save on token usage"
        );
    }

    #[tokio::test]
    async fn prune_unknown_conversation_is_noop() {
        let store = ConversationStore::new("");
        store.prune(&id("ghost"), 2).await;
        assert_eq!(store.conversation_count().await, 0);
    }

    #[tokio::test]
    async fn concurrent_conversations_stay_isolated() {
        let store = Arc::new(ConversationStore::new("base"));

        let tasks = (0..50).map(|i| {
            let store = store.clone();
            async move {
                let (c, label) = if i % 2 == 0 { ("A", "a") } else { ("B", "b") };
                store.append(&id(c), Turn::user(format!("{label}{i}"))).await;
            }
        });
        futures::future::join_all(tasks).await;

        let a = store.history(&id("A")).await;
        let b = store.history(&id("B")).await;
        assert_eq!(a.len(), 25);
        assert_eq!(b.len(), 25);
        assert!(a.iter().all(|t| t.content.starts_with('a')));
        assert!(b.iter().all(|t| t.content.starts_with('b')));
    }

    #[tokio::test]
    async fn conversation_lock_serializes_runs() {
        let store = Arc::new(ConversationStore::new(""));
        let guard = store.conversation_lock(&id("c1")).await;

        let contender = {
            let store = store.clone();
            tokio::spawn(async move {
                let _guard = store.conversation_lock(&id("c1")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // A different conversation is not blocked
        let _other = store.conversation_lock(&id("c2")).await;

        drop(guard);
        contender.await.unwrap();
    }
}

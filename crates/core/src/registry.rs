//! Task registry: the keyed store of completed generations.
//!
//! Written by the webhook receiver (push channel) and the server-side
//! completion watcher (pull channel), read by the status endpoint. Writes
//! are last-write-wins with no merge; each key represents one task with one
//! expected terminal value.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::types::{CompletionRecord, TaskId};

/// Key-value store mapping task ids to completion records.
#[async_trait]
pub trait CompletionStore: Send + Sync {
    /// Associate `task_id` with `audio_url`, replacing any prior record.
    ///
    /// Returns the record that was replaced, if there was one.
    async fn put(&self, task_id: TaskId, audio_url: String) -> Option<CompletionRecord>;

    /// Look up the completion record for `task_id`.
    async fn get(&self, task_id: &TaskId) -> Option<CompletionRecord>;

    /// Number of recorded completions.
    async fn len(&self) -> usize;
}

/// Process-local [`CompletionStore`] guarded by a single `RwLock`.
///
/// Records live for the lifetime of the process.
// TODO: evict records older than a configurable TTL so long-running servers
// do not grow without bound.
#[derive(Default)]
pub struct InMemoryCompletionStore {
    records: RwLock<HashMap<TaskId, CompletionRecord>>,
}

impl InMemoryCompletionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompletionStore for InMemoryCompletionStore {
    async fn put(&self, task_id: TaskId, audio_url: String) -> Option<CompletionRecord> {
        let record = CompletionRecord::new(task_id.clone(), audio_url);
        let new_url = record.audio_url.clone();
        let previous = self.records.write().await.insert(task_id, record);

        match &previous {
            Some(prev) if prev.audio_url != new_url => {
                tracing::warn!(
                    task_id = %prev.task_id,
                    previous_url = %prev.audio_url,
                    audio_url = %new_url,
                    "Completion overwritten with a different audio URL",
                );
            }
            Some(prev) => {
                tracing::debug!(task_id = %prev.task_id, "Duplicate completion ignored");
            }
            None => {}
        }

        previous
    }

    async fn get(&self, task_id: &TaskId) -> Option<CompletionRecord> {
        self.records.read().await.get(task_id).cloned()
    }

    async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: &str) -> TaskId {
        TaskId::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn get_unknown_id_is_absent() {
        let store = InMemoryCompletionStore::new();
        store.put(id("known"), "https://cdn/a.mp3".into()).await;

        assert!(store.get(&id("never-written")).await.is_none());
    }

    #[tokio::test]
    async fn put_then_get_returns_url() {
        let store = InMemoryCompletionStore::new();

        let previous = store.put(id("abc123"), "https://cdn/x.mp3".into()).await;

        assert!(previous.is_none());
        let record = store.get(&id("abc123")).await.unwrap();
        assert_eq!(record.task_id, id("abc123"));
        assert_eq!(record.audio_url, "https://cdn/x.mp3");
    }

    #[tokio::test]
    async fn last_write_wins() {
        let store = InMemoryCompletionStore::new();
        store.put(id("abc123"), "https://cdn/first.mp3".into()).await;

        let previous = store.put(id("abc123"), "https://cdn/second.mp3".into()).await;

        assert_eq!(previous.unwrap().audio_url, "https://cdn/first.mp3");
        assert_eq!(
            store.get(&id("abc123")).await.unwrap().audio_url,
            "https://cdn/second.mp3"
        );
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn duplicate_push_is_idempotent() {
        let store = InMemoryCompletionStore::new();
        store.put(id("abc123"), "https://cdn/x.mp3".into()).await;
        store.put(id("abc123"), "https://cdn/x.mp3".into()).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(&id("abc123")).await.unwrap().audio_url, "https://cdn/x.mp3");
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let store = InMemoryCompletionStore::new();
        store.put(id("a"), "https://cdn/a.mp3".into()).await;
        store.put(id("b"), "https://cdn/b.mp3".into()).await;

        assert_eq!(store.get(&id("a")).await.unwrap().audio_url, "https://cdn/a.mp3");
        assert_eq!(store.get(&id("b")).await.unwrap().audio_url, "https://cdn/b.mp3");
        assert_eq!(store.len().await, 2);
    }
}

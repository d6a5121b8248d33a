//! Server-side completion watcher.
//!
//! [`CompletionWatcher`] runs one background poll per submitted task
//! against the provider and writes the result into the task registry, so
//! the status endpoint can answer even when the provider's callback never
//! reaches this server. Callbacks and the watcher feed the same store, and
//! whichever observes completion first wins: a watch consults the store
//! before every provider query and never overwrites a recorded URL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use songbridge_core::registry::CompletionStore;
use songbridge_core::types::TaskId;
use songbridge_provider::poller::{wait_for_completion, PollConfig, PollError};
use songbridge_provider::status::{StatusError, StatusReport, StatusSource};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// How long shutdown waits for each watch to exit.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Tracks and owns the background watch tasks.
///
/// Created once at startup; the returned `Arc` is shared through `AppState`.
pub struct CompletionWatcher {
    /// Running watches indexed by task id.
    watches: Arc<Mutex<HashMap<TaskId, ManagedWatch>>>,
    source: Arc<dyn StatusSource>,
    store: Arc<dyn CompletionStore>,
    config: PollConfig,
    /// Master cancellation token -- cancelled during shutdown.
    cancel: CancellationToken,
}

struct ManagedWatch {
    task_handle: tokio::task::JoinHandle<()>,
    /// Per-watch cancellation token (child of the master token).
    cancel: CancellationToken,
}

impl CompletionWatcher {
    pub fn new(
        source: Arc<dyn StatusSource>,
        store: Arc<dyn CompletionStore>,
        config: PollConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            watches: Arc::new(Mutex::new(HashMap::new())),
            source,
            store,
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Start watching `task_id` in the background.
    ///
    /// Returns `false` without spawning anything when the task is already
    /// watched or recorded, or the watcher has been shut down.
    pub async fn watch(&self, task_id: TaskId) -> bool {
        if self.cancel.is_cancelled() {
            tracing::debug!(task_id = %task_id, "Watcher shut down, not watching task");
            return false;
        }
        if self.store.get(&task_id).await.is_some() {
            tracing::debug!(task_id = %task_id, "Task already recorded, not watching");
            return false;
        }

        let mut watches = self.watches.lock().await;
        if watches.contains_key(&task_id) {
            tracing::debug!(task_id = %task_id, "Task already watched");
            return false;
        }

        let cancel = self.cancel.child_token();
        let source = RecordedFirst {
            store: Arc::clone(&self.store),
            inner: Arc::clone(&self.source),
        };
        let task_handle = tokio::spawn(run_watch(
            task_id.clone(),
            source,
            Arc::clone(&self.store),
            self.config,
            cancel.clone(),
            Arc::clone(&self.watches),
        ));

        watches.insert(task_id.clone(), ManagedWatch { task_handle, cancel });
        tracing::info!(task_id = %task_id, active = watches.len(), "Watching task");
        true
    }

    /// Cancel the watch for `task_id`, if one is running.
    ///
    /// Called once a callback has recorded the task. The watch removes
    /// itself from the map when it exits.
    pub async fn stop(&self, task_id: &TaskId) -> bool {
        match self.watches.lock().await.get(task_id) {
            Some(managed) => {
                managed.cancel.cancel();
                tracing::debug!(task_id = %task_id, "Watch stopped");
                true
            }
            None => false,
        }
    }

    /// Whether `task_id` currently has a running watch.
    pub async fn is_watching(&self, task_id: &TaskId) -> bool {
        self.watches.lock().await.contains_key(task_id)
    }

    pub async fn active_count(&self) -> usize {
        self.watches.lock().await.len()
    }

    /// Cancel every watch and wait up to 5 seconds for each to exit.
    pub async fn shutdown(&self) {
        tracing::info!("Shutting down completion watcher");
        self.cancel.cancel();

        // Watches remove themselves from the map on exit, so the lock must
        // not be held while awaiting them.
        let drained: Vec<(TaskId, ManagedWatch)> = self.watches.lock().await.drain().collect();

        for (task_id, managed) in drained {
            managed.cancel.cancel();
            if tokio::time::timeout(SHUTDOWN_GRACE, managed.task_handle)
                .await
                .is_err()
            {
                tracing::warn!(task_id = %task_id, "Watch did not stop in time");
            }
        }

        tracing::info!("Completion watcher shut down complete");
    }
}

/// Answers from the registry when the task is already recorded and only
/// then asks `inner`.
struct RecordedFirst {
    store: Arc<dyn CompletionStore>,
    inner: Arc<dyn StatusSource>,
}

#[async_trait]
impl StatusSource for RecordedFirst {
    async fn query(&self, task_id: &TaskId) -> Result<StatusReport, StatusError> {
        if let Some(record) = self.store.get(task_id).await {
            return Ok(StatusReport::Complete {
                audio_url: record.audio_url,
            });
        }
        self.inner.query(task_id).await
    }
}

async fn run_watch(
    task_id: TaskId,
    source: RecordedFirst,
    store: Arc<dyn CompletionStore>,
    config: PollConfig,
    cancel: CancellationToken,
    watches: Arc<Mutex<HashMap<TaskId, ManagedWatch>>>,
) {
    match wait_for_completion(&source, &task_id, &config, &cancel).await {
        Ok(_) if store.get(&task_id).await.is_some() => {
            tracing::debug!(task_id = %task_id, "Task recorded by callback, keeping stored URL");
        }
        Ok(audio_url) => {
            tracing::info!(task_id = %task_id, audio_url = %audio_url, "Watcher observed completion");
            store.put(task_id.clone(), audio_url).await;
        }
        Err(PollError::Cancelled) => {
            tracing::debug!(task_id = %task_id, "Watch cancelled");
        }
        Err(e) => {
            tracing::warn!(task_id = %task_id, error = %e, "Watch ended without completion");
        }
    }

    watches.lock().await.remove(&task_id);
}

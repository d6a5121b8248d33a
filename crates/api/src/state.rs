use std::sync::Arc;

use songbridge_core::registry::CompletionStore;
use songbridge_provider::lyrics::LyricsApi;
use songbridge_provider::MusicProviderApi;

use crate::config::ServerConfig;
use crate::engine::watcher::CompletionWatcher;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Task registry, written by callbacks and the watcher.
    pub store: Arc<dyn CompletionStore>,
    pub provider: Arc<MusicProviderApi>,
    /// `None` when no lyric model key is configured.
    pub lyrics: Option<Arc<LyricsApi>>,
    pub watcher: Arc<CompletionWatcher>,
}

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use songbridge_core::registry::InMemoryCompletionStore;
use songbridge_provider::lyrics::{LyricsApi, LyricsConfig};
use songbridge_provider::poller::PollConfig;
use songbridge_provider::{MusicProviderApi, ProviderConfig, ProviderStatusSource};
use tower::ServiceExt;

use songbridge_api::config::ServerConfig;
use songbridge_api::engine::watcher::CompletionWatcher;
use songbridge_api::router::build_app_router;
use songbridge_api::state::AppState;

/// Base URL nothing listens on; requests to it fail fast.
pub const UNREACHABLE_PROVIDER: &str = "http://127.0.0.1:9";

/// Build a test `ServerConfig` with safe defaults.
///
/// The provider points at `provider_url`; lyric generation is disabled
/// unless `lyrics_url` is given.
pub fn test_config(provider_url: &str, lyrics_url: Option<&str>) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        public_base_url: "https://bridge.example.com".to_string(),
        poll: PollConfig::new(Duration::from_millis(20), 3),
        provider: ProviderConfig::new(provider_url, "test-key"),
        lyrics: lyrics_url.map(|url| LyricsConfig::new(url, "lyrics-key")),
    }
}

/// Build the full application router from `config`, returning the state
/// alongside so tests can inspect the registry and watcher.
pub fn build_test_app_with(config: ServerConfig) -> (Router, AppState) {
    let provider = Arc::new(MusicProviderApi::new(config.provider.clone()));
    let lyrics = config
        .lyrics
        .clone()
        .map(|lyrics_config| Arc::new(LyricsApi::new(lyrics_config)));
    let store = Arc::new(InMemoryCompletionStore::new());
    let watcher = CompletionWatcher::new(
        Arc::new(ProviderStatusSource::new(Arc::clone(&provider))),
        store.clone(),
        config.poll,
    );

    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        provider,
        lyrics,
        watcher,
    };

    (build_app_router(state.clone(), &config), state)
}

/// Application with an unreachable provider and no lyric model.
pub fn build_test_app() -> (Router, AppState) {
    build_test_app_with(test_config(UNREACHABLE_PROVIDER, None))
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_raw(app, uri, "application/json", body.to_string()).await
}

pub async fn post_raw(
    app: Router,
    uri: &str,
    content_type: &str,
    body: impl Into<Body>,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", content_type)
        .body(body.into())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

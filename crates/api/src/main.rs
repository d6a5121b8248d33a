use std::net::SocketAddr;
use std::sync::Arc;

use songbridge_core::registry::InMemoryCompletionStore;
use songbridge_provider::lyrics::LyricsApi;
use songbridge_provider::{MusicProviderApi, ProviderStatusSource};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use songbridge_api::config::ServerConfig;
use songbridge_api::engine::watcher::CompletionWatcher;
use songbridge_api::router::build_app_router;
use songbridge_api::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "songbridge_api=debug,songbridge_provider=debug,tower_http=debug".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        callback_url = %config.callback_url(),
        lyrics_enabled = config.lyrics.is_some(),
        "Loaded server configuration",
    );

    // --- Provider clients ---
    // One connection pool for every outbound call.
    let http = reqwest::Client::new();
    let provider = Arc::new(MusicProviderApi::with_client(
        http.clone(),
        config.provider.clone(),
    ));
    let lyrics = config
        .lyrics
        .clone()
        .map(|lyrics_config| Arc::new(LyricsApi::with_client(http, lyrics_config)));

    // --- Task registry ---
    let store = Arc::new(InMemoryCompletionStore::new());

    // --- Completion watcher ---
    let watcher = CompletionWatcher::new(
        Arc::new(ProviderStatusSource::new(Arc::clone(&provider))),
        store.clone(),
        config.poll,
    );
    tracing::info!(
        interval_ms = config.poll.interval.as_millis() as u64,
        max_attempts = config.poll.max_attempts,
        "Completion watcher ready",
    );

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        store,
        provider,
        lyrics,
        watcher: Arc::clone(&watcher),
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(config.host.parse()?, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    watcher.shutdown().await;

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}

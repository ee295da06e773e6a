use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use siglabel_api::background::BackgroundFlusher;
use siglabel_api::config::ServerConfig;
use siglabel_api::routes;
use siglabel_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siglabel_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Storage ---
    let layout = siglabel_store::open(config.storage.clone())
        .expect("Failed to prepare storage directories");
    siglabel_store::health_check(&layout)
        .await
        .expect("Storage health check failed");
    tracing::info!(
        signals = %layout.signal_dir.display(),
        annotations = %layout.annotation_dir.display(),
        compiled = %layout.compiled_dir.display(),
        "Storage ready",
    );

    // --- App state ---
    let state = AppState::new(config.clone(), layout);

    // --- Background flusher ---
    let flush_cancel = CancellationToken::new();
    let flusher = BackgroundFlusher::new(
        Arc::clone(&state.pipeline),
        Duration::from_secs(config.flush_interval_secs),
    );
    let flush_cancel_clone = flush_cancel.clone();
    let flush_handle = tokio::spawn(async move {
        flusher.run(flush_cancel_clone).await;
    });

    // --- Router ---
    let app = routes::build_app(state);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, flushing buffered annotations");

    flush_cancel.cancel();
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    match tokio::time::timeout(shutdown_timeout, flush_handle).await {
        Ok(Ok(())) => tracing::info!("Annotation flusher stopped"),
        Ok(Err(e)) => tracing::error!(error = %e, "Annotation flusher task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = config.shutdown_timeout_secs,
            "Timed out waiting for the final flush",
        ),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
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

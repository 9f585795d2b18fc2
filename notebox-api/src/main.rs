//! Notebox API Server Entry Point
//!
//! Bootstraps configuration, opens the note repository and the key-value
//! client, and starts the Axum HTTP server.

use std::net::SocketAddr;
use std::sync::Arc;

use notebox_api::telemetry::{init_tracer, TelemetryConfig};
use notebox_api::{
    create_api_router, ApiConfig, ApiError, ApiResult, AppState, DbConfig, PgNoteRepository,
    StorageBackend,
};
use notebox_core::KvConfig;
use notebox_storage::{InMemoryNoteRepository, KvClient, NoteRepository};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let telemetry_config = TelemetryConfig::default();
    init_tracer(&telemetry_config)?;

    let api_config = ApiConfig::from_env()?;
    let kv_config = KvConfig::from_env()?;

    let repo: Arc<dyn NoteRepository> = match api_config.storage {
        StorageBackend::Postgres => {
            let repo = PgNoteRepository::from_config(&DbConfig::from_env())?;
            repo.ensure_schema().await?;
            Arc::new(repo)
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory note storage; notes are lost on restart");
            Arc::new(InMemoryNoteRepository::new())
        }
    };

    // The key-value store is optional; a bad URL only disables its features
    let kv = match KvClient::from_config(&kv_config) {
        Ok(kv) => kv,
        Err(e) => {
            tracing::warn!(error = %e, "Key-value store misconfigured; running without it");
            KvClient::disabled()
        }
    };
    tracing::info!(
        storage = api_config.storage.as_str(),
        key_value = kv.backend(),
        rate_limit = kv_config.rate_limit,
        rate_limit_window_secs = kv_config.rate_limit_window.as_secs(),
        "Backends configured"
    );

    let addr = api_config.bind_addr()?;
    let state = AppState::new(repo, kv, &kv_config, api_config);
    let app = create_api_router(state);

    tracing::info!(%addr, "Starting Notebox API server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ApiError::internal_error(format!("Failed to bind {}: {}", addr, e)))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| ApiError::internal_error(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

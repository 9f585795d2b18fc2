//! Shared harness for router-level tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use notebox_api::{create_api_router, ApiConfig, AppState, StorageBackend};
use notebox_core::KvConfig;
use notebox_storage::{InMemoryNoteRepository, KvClient, MemoryStore, NoteRepository};
use serde::de::DeserializeOwned;
use tower::ServiceExt; // for `oneshot`

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub kv: KvClient,
    pub repo: Arc<InMemoryNoteRepository>,
}

pub fn kv_config(rate_limit: u64) -> KvConfig {
    KvConfig::default().with_rate_limit(rate_limit, Duration::from_secs(60))
}

pub fn api_config() -> ApiConfig {
    ApiConfig {
        storage: StorageBackend::Memory,
        ..Default::default()
    }
}

/// Router over an in-memory repository and an in-memory key-value store.
pub fn test_app_with(kv_config: KvConfig, api_config: ApiConfig) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let kv = KvClient::new(store.clone());
    let repo = Arc::new(InMemoryNoteRepository::new());
    let state = AppState::new(
        repo.clone() as Arc<dyn NoteRepository>,
        kv.clone(),
        &kv_config,
        api_config,
    );
    TestApp {
        router: create_api_router(state),
        store,
        kv,
        repo,
    }
}

pub fn test_app() -> TestApp {
    test_app_with(kv_config(1000), api_config())
}

/// Router with no key-value store configured at all.
pub fn test_app_without_kv() -> (Router, Arc<InMemoryNoteRepository>) {
    let repo = Arc::new(InMemoryNoteRepository::new());
    let state = AppState::new(
        repo.clone() as Arc<dyn NoteRepository>,
        KvClient::disabled(),
        &KvConfig::disabled(),
        api_config(),
    );
    (create_api_router(state), repo)
}

pub fn request(
    method: Method,
    uri: &str,
    client_ip: Option<&str>,
    body: Option<serde_json::Value>,
) -> Result<Request<Body>, String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(ip) = client_ip {
        let addr: SocketAddr = format!("{}:50000", ip)
            .parse()
            .map_err(|e| format!("bad ip {}: {:?}", ip, e))?;
        builder = builder.extension(ConnectInfo(addr));
    }
    let body = match body {
        Some(json) => {
            builder = builder.header("content-type", "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };
    builder.body(body).map_err(|e| e.to_string())
}

pub async fn send(router: &Router, request: Request<Body>) -> Result<Response, String> {
    router
        .clone()
        .oneshot(request)
        .await
        .map_err(|e| format!("Request failed: {:?}", e))
}

pub async fn json_body<T: DeserializeOwned>(response: Response) -> Result<T, String> {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| {
        format!(
            "Invalid JSON ({}): {}",
            e,
            String::from_utf8_lossy(&bytes)
        )
    })
}

pub async fn expect_status(response: Response, expected: StatusCode) -> Result<Response, String> {
    if response.status() == expected {
        Ok(response)
    } else {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| e.to_string())?;
        Err(format!(
            "expected {}, got {}: {}",
            expected,
            status,
            String::from_utf8_lossy(&bytes)
        ))
    }
}

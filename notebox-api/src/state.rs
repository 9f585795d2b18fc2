//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use notebox_core::KvConfig;
use notebox_storage::{KvClient, KvServices, NoteRepository};

use crate::config::ApiConfig;
use crate::middleware::RateLimitState;
use crate::services::NoteService;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    /// Note operations (repository + cache + recently viewed).
    pub notes: NoteService,
    /// Persistence, used directly by readiness checks.
    pub repo: Arc<dyn NoteRepository>,
    /// Shared key-value client; all three key-value features go through it.
    pub kv: KvClient,
    pub rate_limit: RateLimitState,
    pub config: Arc<ApiConfig>,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the note service and rate limiter to one key-value client.
    pub fn new(
        repo: Arc<dyn NoteRepository>,
        kv: KvClient,
        kv_config: &KvConfig,
        config: ApiConfig,
    ) -> Self {
        let services = KvServices::new(kv, kv_config);
        let rate_limit = RateLimitState::new(
            services.limiter,
            config.rate_limit_enabled,
            config.trust_proxy_headers,
        );

        Self {
            notes: NoteService::new(repo.clone(), services.cache, services.recent),
            repo,
            kv: services.client,
            rate_limit,
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }
}

crate::impl_from_ref!(NoteService, notes);
crate::impl_from_ref!(Arc<dyn NoteRepository>, repo);
crate::impl_from_ref!(KvClient, kv);
crate::impl_from_ref!(RateLimitState, rate_limit);
crate::impl_from_ref!(Arc<ApiConfig>, config);
crate::impl_from_ref!(Instant, start_time);

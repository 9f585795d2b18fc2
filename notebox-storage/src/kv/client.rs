//! Shared key-value handle and the degradation adapter.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use notebox_core::KvConfig;
use tracing::warn;

use super::{KvResult, KvStore, RedisStore};

/// Process-wide handle to the key-value store.
///
/// Cheap to clone; every clone shares the same backend and degradation
/// counter. A client without a backend behaves exactly like one whose
/// backend is unreachable.
#[derive(Clone)]
pub struct KvClient {
    store: Option<Arc<dyn KvStore>>,
    degraded: Arc<AtomicU64>,
}

impl std::fmt::Debug for KvClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvClient")
            .field("backend", &self.backend())
            .field("degraded", &self.degraded_operations())
            .finish()
    }
}

impl KvClient {
    /// Wrap an existing backend.
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store: Some(store),
            degraded: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A client with no backend: every call degrades.
    pub fn disabled() -> Self {
        Self {
            store: None,
            degraded: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Build the Redis-backed client described by `config`.
    ///
    /// Only the address is parsed here; the connection is opened by the
    /// first command. A config without an address yields [`KvClient::disabled`].
    pub fn from_config(config: &KvConfig) -> KvResult<Self> {
        match config.url.as_deref() {
            Some(url) => {
                let store = RedisStore::open(url, config.command_timeout)?;
                Ok(Self::new(Arc::new(store)))
            }
            None => Ok(Self::disabled()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Backend name, or `"disabled"`.
    pub fn backend(&self) -> &'static str {
        self.store.as_ref().map_or("disabled", |s| s.backend())
    }

    /// Number of calls that degraded since startup.
    pub fn degraded_operations(&self) -> u64 {
        self.degraded.load(Ordering::Relaxed)
    }

    /// Run one store operation, swallowing every failure.
    ///
    /// Returns `None` when no backend is configured or the operation failed;
    /// failures are logged and counted. Callers map `None` to their own
    /// degraded result.
    pub async fn call<T, F, Fut>(&self, op: &'static str, f: F) -> Option<T>
    where
        F: FnOnce(Arc<dyn KvStore>) -> Fut,
        Fut: Future<Output = KvResult<T>>,
    {
        let Some(store) = self.store.clone() else {
            self.degraded.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        match f(store).await {
            Ok(value) => Some(value),
            Err(err) => {
                self.degraded.fetch_add(1, Ordering::Relaxed);
                warn!(op, error_kind = err.kind(), error = %err, "Key-value operation degraded");
                None
            }
        }
    }

    /// Reachability check for health endpoints. Not counted as degraded.
    pub async fn ping(&self) -> KvResult<()> {
        match &self.store {
            Some(store) => store.ping().await,
            None => Err(super::KvError::connection("key-value store not configured")),
        }
    }
}

//! Notebox Storage - Key-Value Layer and Note Persistence
//!
//! Three independent features share one key-value connection:
//!
//! - [`RecordCache`]: cache-aside note snapshots with a fixed TTL
//! - [`RateLimiter`]: fixed-window request counters per client
//! - [`RecentItemsTracker`]: bounded most-recently-viewed lists per client
//!
//! All three degrade silently through [`KvClient::call`] when the store is
//! unreachable or not configured. Note persistence sits behind
//! [`NoteRepository`].

pub mod cache;
pub mod kv;
pub mod rate_limit;
pub mod recent;
pub mod repository;

pub use cache::{record_key, CacheLookup, RecordCache};
pub use kv::{KvClient, KvError, KvResult, KvStore, MemoryStore, RedisStore, WindowCount};
pub use rate_limit::{rate_key, RateDecision, RateLimiter};
pub use recent::{recent_key, RecentItemsTracker};
pub use repository::{InMemoryNoteRepository, NoteRepository};

use notebox_core::KvConfig;

/// The three key-value backed features, wired to one shared client.
#[derive(Debug, Clone)]
pub struct KvServices {
    pub client: KvClient,
    pub cache: RecordCache,
    pub limiter: RateLimiter,
    pub recent: RecentItemsTracker,
}

impl KvServices {
    pub fn new(client: KvClient, config: &KvConfig) -> Self {
        Self {
            cache: RecordCache::new(client.clone(), config.cache_ttl),
            limiter: RateLimiter::new(client.clone(), config.rate_limit, config.rate_limit_window),
            recent: RecentItemsTracker::new(
                client.clone(),
                config.recent_limit,
                config.recent_window,
            ),
            client,
        }
    }
}

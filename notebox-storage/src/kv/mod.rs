//! Key-Value Store Layer
//!
//! A narrow command surface over the key-value store shared by the record
//! cache, the rate limiter and the recent-items tracker.
//!
//! # Architecture
//!
//! ```text
//! KvClient (Clone, degrade adapter)
//!   └── Arc<dyn KvStore>
//!         ├── RedisStore   <- lazily connected ConnectionManager, MULTI/EXEC batches
//!         └── MemoryStore  <- single mutex per batch, simulated outages
//! ```
//!
//! Multi-step operations are exposed as single trait methods so that each
//! backend can run them atomically.

mod client;
mod error;
mod memory;
mod redis_store;

use std::time::Duration;

use async_trait::async_trait;

pub use client::KvClient;
pub use error::{KvError, KvResult};
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

/// Result of an atomic increment-with-window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCount {
    /// Counter value after the increment.
    pub count: i64,
    /// Remaining lifetime of the window, if the store reported one.
    pub ttl: Option<Duration>,
}

/// Commands the key-value layer needs from a backend.
///
/// Implementations must be safe for concurrent use. Batch methods
/// (`incr_window`, `push_front_unique`) must be atomic with respect to every
/// other command on the same key.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Fetch a string value.
    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    /// Store a string value with an expiry, overwriting any previous value.
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()>;

    /// Remove a key. Returns whether it existed.
    async fn delete(&self, key: &str) -> KvResult<bool>;

    /// Increment a counter and start its expiry only if none is set.
    ///
    /// Equivalent to `INCR key; EXPIRE key window NX; TTL key` in one
    /// transaction. Later increments within the window never extend it.
    async fn incr_window(&self, key: &str, window: Duration) -> KvResult<WindowCount>;

    /// Move `member` to the head of a list, bounding its length and
    /// refreshing its expiry.
    ///
    /// Equivalent to `LREM key 0 member; LPUSH key member;
    /// LTRIM key 0 max_len-1; EXPIRE key ttl` in one transaction.
    async fn push_front_unique(
        &self,
        key: &str,
        member: &str,
        max_len: usize,
        ttl: Duration,
    ) -> KvResult<()>;

    /// Read up to `limit` list elements from the head.
    async fn range(&self, key: &str, limit: usize) -> KvResult<Vec<String>>;

    /// Remaining lifetime of a key. `None` when absent or without expiry.
    async fn ttl(&self, key: &str) -> KvResult<Option<Duration>>;

    /// Round-trip check.
    async fn ping(&self) -> KvResult<()>;
}

/// Expiry in whole seconds as the store expects; never zero.
pub(crate) fn expiry_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

/// Interpret a `TTL` reply: negative values mean "no key" or "no expiry".
///
/// The store rounds to whole seconds, so `0` is a key that expires in under
/// a second and maps to `Some(Duration::ZERO)`.
pub(crate) fn ttl_from_reply(reply: i64) -> Option<Duration> {
    u64::try_from(reply).ok().map(Duration::from_secs)
}

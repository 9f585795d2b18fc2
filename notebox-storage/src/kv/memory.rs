//! In-process key-value store.
//!
//! Mirrors the Redis semantics the rest of the crate relies on (string and
//! list values, per-key expiry, `EXPIRE ... NX`) so that the cache, the rate
//! limiter and the recent-items tracker can be exercised without a server.
//! Expiry uses [`tokio::time::Instant`], which follows a paused test clock.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::{expiry_secs, KvError, KvResult, KvStore, WindowCount};

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    List(VecDeque<String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }

    fn remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at.map(|at| at.saturating_duration_since(now))
    }
}

/// Key-value store held in process memory.
///
/// Every method takes the map lock exactly once, so batch methods are atomic
/// with respect to each other. [`MemoryStore::set_offline`] makes every
/// command fail with a connection error until it is cleared.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    offline: AtomicBool,
    commands: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the store becoming unreachable (or reachable again).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Commands attempted so far, including those rejected while offline.
    pub fn command_count(&self) -> u64 {
        self.commands.load(Ordering::Relaxed)
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|map| map.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lock the map for one command, dropping the key first if it expired.
    fn begin(&self, key: &str) -> KvResult<(MutexGuard<'_, HashMap<String, Entry>>, Instant)> {
        self.commands.fetch_add(1, Ordering::Relaxed);
        if self.is_offline() {
            return Err(KvError::connection("memory store is offline"));
        }
        let mut map = self
            .entries
            .lock()
            .map_err(|_| KvError::command("memory store lock poisoned"))?;
        let now = Instant::now();
        if map.get(key).is_some_and(|e| !e.is_live(now)) {
            map.remove(key);
        }
        Ok((map, now))
    }
}

fn wrong_type() -> KvError {
    KvError::command("WRONGTYPE Operation against a key holding the wrong kind of value")
}

#[async_trait]
impl KvStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let (map, _) = self.begin(key)?;
        match map.get(key).map(|e| &e.value) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.clone())),
            Some(Value::List(_)) => Err(wrong_type()),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        let (mut map, now) = self.begin(key)?;
        map.insert(
            key.to_string(),
            Entry {
                value: Value::Str(value.to_string()),
                expires_at: Some(now + Duration::from_secs(expiry_secs(ttl))),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        let (mut map, _) = self.begin(key)?;
        Ok(map.remove(key).is_some())
    }

    async fn incr_window(&self, key: &str, window: Duration) -> KvResult<WindowCount> {
        let (mut map, now) = self.begin(key)?;
        let entry = map.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Str("0".to_string()),
            expires_at: None,
        });

        let count = match &entry.value {
            Value::Str(s) => s
                .parse::<i64>()
                .map_err(|_| KvError::command("value is not an integer or out of range"))?,
            Value::List(_) => return Err(wrong_type()),
        }
        .checked_add(1)
        .ok_or_else(|| KvError::command("increment would overflow"))?;
        entry.value = Value::Str(count.to_string());

        // EXPIRE NX: only the first increment of a window sets the deadline.
        if entry.expires_at.is_none() {
            entry.expires_at = Some(now + Duration::from_secs(expiry_secs(window)));
        }

        Ok(WindowCount {
            count,
            ttl: entry.remaining(now),
        })
    }

    async fn push_front_unique(
        &self,
        key: &str,
        member: &str,
        max_len: usize,
        ttl: Duration,
    ) -> KvResult<()> {
        let (mut map, now) = self.begin(key)?;
        let entry = map.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::List(VecDeque::new()),
            expires_at: None,
        });
        let list = match &mut entry.value {
            Value::List(list) => list,
            Value::Str(_) => return Err(wrong_type()),
        };

        list.retain(|m| m != member);
        list.push_front(member.to_string());
        list.truncate(max_len.max(1));
        entry.expires_at = Some(now + Duration::from_secs(expiry_secs(ttl)));
        Ok(())
    }

    async fn range(&self, key: &str, limit: usize) -> KvResult<Vec<String>> {
        let (map, _) = self.begin(key)?;
        match map.get(key).map(|e| &e.value) {
            None => Ok(Vec::new()),
            Some(Value::List(list)) => Ok(list.iter().take(limit).cloned().collect()),
            Some(Value::Str(_)) => Err(wrong_type()),
        }
    }

    async fn ttl(&self, key: &str) -> KvResult<Option<Duration>> {
        let (map, now) = self.begin(key)?;
        Ok(map.get(key).and_then(|e| e.remaining(now)))
    }

    async fn ping(&self) -> KvResult<()> {
        self.commands.fetch_add(1, Ordering::Relaxed);
        if self.is_offline() {
            return Err(KvError::connection("memory store is offline"));
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_set_ex_expires() {
        let store = MemoryStore::new();
        store
            .set_ex("k", "v", Duration::from_secs(10))
            .await
            .expect("set should succeed");
        assert_eq!(store.get("k").await.expect("get"), Some("v".to_string()));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(store.get("k").await.expect("get"), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_incr_window_sets_expiry_once() {
        let store = MemoryStore::new();
        let window = Duration::from_secs(60);

        let first = store.incr_window("c", window).await.expect("incr");
        assert_eq!(first.count, 1);
        assert_eq!(first.ttl, Some(window));

        tokio::time::advance(Duration::from_secs(20)).await;
        let second = store.incr_window("c", window).await.expect("incr");
        assert_eq!(second.count, 2);
        assert_eq!(second.ttl, Some(Duration::from_secs(40)));

        tokio::time::advance(Duration::from_secs(40)).await;
        let fresh = store.incr_window("c", window).await.expect("incr");
        assert_eq!(fresh.count, 1);
    }

    #[tokio::test]
    async fn test_push_front_unique_dedupes_and_bounds() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(60);
        for member in ["1", "2", "3", "2"] {
            store
                .push_front_unique("l", member, 3, ttl)
                .await
                .expect("push");
        }
        assert_eq!(store.range("l", 10).await.expect("range"), vec!["2", "3", "1"]);

        store.push_front_unique("l", "4", 3, ttl).await.expect("push");
        assert_eq!(store.range("l", 10).await.expect("range"), vec!["4", "2", "3"]);
        assert_eq!(store.range("l", 2).await.expect("range"), vec!["4", "2"]);
    }

    #[tokio::test]
    async fn test_wrong_type_is_command_error() {
        let store = MemoryStore::new();
        store
            .set_ex("k", "v", Duration::from_secs(10))
            .await
            .expect("set");
        let err = store
            .push_front_unique("k", "1", 5, Duration::from_secs(10))
            .await
            .expect_err("list op on string must fail");
        assert_eq!(err.kind(), "command");
        assert!(store.incr_window("k", Duration::from_secs(1)).await.is_err());
    }

    #[tokio::test]
    async fn test_offline_rejects_commands() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.get("k").await,
            Err(KvError::Connection { .. })
        ));
        assert!(store.ping().await.is_err());
        assert_eq!(store.command_count(), 2);

        store.set_offline(false);
        assert!(store.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let store = MemoryStore::new();
        assert!(!store.delete("k").await.expect("delete"));
        store
            .set_ex("k", "v", Duration::from_secs(10))
            .await
            .expect("set");
        assert!(store.delete("k").await.expect("delete"));
        assert_eq!(store.ttl("k").await.expect("ttl"), None);
    }
}

//! Record Cache
//!
//! Cache-aside snapshots of notes keyed by id. Entries live for a fixed TTL
//! and may be stale by up to that long; absence never means the note does
//! not exist.

use std::time::Duration;

use notebox_core::{Note, NoteId};
use tracing::debug;

use crate::kv::KvClient;

/// Key under which a note snapshot is cached.
pub fn record_key(id: NoteId) -> String {
    format!("record:{}", id)
}

/// Outcome of a cache lookup, for callers that record hit ratios.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(Note),
    Miss,
    /// The entry existed but could not be decoded.
    Malformed,
    /// The store was unreachable or not configured.
    Unavailable,
}

impl CacheLookup {
    pub fn into_note(self) -> Option<Note> {
        match self {
            Self::Hit(note) => Some(note),
            _ => None,
        }
    }

    /// Label used in metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Hit(_) => "hit",
            Self::Miss => "miss",
            Self::Malformed => "malformed",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Best-effort note cache. No method returns an error.
#[derive(Debug, Clone)]
pub struct RecordCache {
    kv: KvClient,
    ttl: Duration,
}

impl RecordCache {
    pub fn new(kv: KvClient, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached copy of a note, if any.
    pub async fn get(&self, id: NoteId) -> Option<Note> {
        self.lookup(id).await.into_note()
    }

    /// Like [`RecordCache::get`] but reports why nothing was returned.
    pub async fn lookup(&self, id: NoteId) -> CacheLookup {
        let key = record_key(id);
        let raw = self
            .kv
            .call("cache.get", |store| async move { store.get(&key).await })
            .await;

        match raw {
            None => CacheLookup::Unavailable,
            Some(None) => CacheLookup::Miss,
            Some(Some(payload)) => match serde_json::from_str::<Note>(&payload) {
                Ok(note) => CacheLookup::Hit(note),
                Err(e) => {
                    debug!(note_id = id, error = %e, "Discarding malformed cached note");
                    CacheLookup::Malformed
                }
            },
        }
    }

    /// Store a snapshot, overwriting any previous one.
    pub async fn put(&self, note: &Note) {
        let payload = match serde_json::to_string(note) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(note_id = note.id, error = %e, "Note not cacheable");
                return;
            }
        };
        let key = record_key(note.id);
        let ttl = self.ttl;
        self.kv
            .call("cache.put", |store| async move {
                store.set_ex(&key, &payload, ttl).await
            })
            .await;
    }

    /// Drop a snapshot. A no-op when absent.
    pub async fn invalidate(&self, id: NoteId) {
        let key = record_key(id);
        self.kv
            .call("cache.invalidate", |store| async move { store.delete(&key).await })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{KvStore, MemoryStore};
    use chrono::Utc;
    use std::sync::Arc;

    fn note(id: NoteId) -> Note {
        let now = Utc::now();
        Note {
            id,
            title: format!("note {}", id),
            body: "body".to_string(),
            tags: vec!["a".to_string()],
            created_at: now,
            updated_at: now,
            is_deleted: false,
            deleted_at: None,
        }
    }

    fn cache_with_store() -> (RecordCache, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let cache = RecordCache::new(KvClient::new(store.clone()), Duration::from_secs(300));
        (cache, store)
    }

    #[test]
    fn test_record_key_format() {
        assert_eq!(record_key(42), "record:42");
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips() {
        let (cache, _) = cache_with_store();
        let n = note(1);
        cache.put(&n).await;
        assert_eq!(cache.get(1).await, Some(n));
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let (cache, _) = cache_with_store();
        cache.put(&note(1)).await;
        cache.invalidate(1).await;
        assert_eq!(cache.lookup(1).await, CacheLookup::Miss);
        // Invalidating again is harmless.
        cache.invalidate(1).await;
    }

    #[tokio::test]
    async fn test_malformed_payload_is_a_miss() {
        let (cache, store) = cache_with_store();
        store
            .set_ex(&record_key(9), "{not json", Duration::from_secs(60))
            .await
            .expect("seed");
        assert_eq!(cache.lookup(9).await, CacheLookup::Malformed);
        assert_eq!(cache.get(9).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let (cache, _) = cache_with_store();
        cache.put(&note(3)).await;
        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(3).await.is_some());
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(3).await.is_none());
    }

    #[tokio::test]
    async fn test_store_outage_is_silent() {
        let (cache, store) = cache_with_store();
        store.set_offline(true);
        cache.put(&note(1)).await;
        cache.invalidate(1).await;
        assert_eq!(cache.lookup(1).await, CacheLookup::Unavailable);
    }
}

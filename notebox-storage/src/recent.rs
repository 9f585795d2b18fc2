//! Recently viewed notes per client.
//!
//! A bounded, duplicate-free list of note ids, most recent first. Every push
//! refreshes the list's expiry, so it disappears once the client has been
//! idle for a full window.

use std::time::Duration;

use notebox_core::{ClientId, NoteId};
use tracing::debug;

use crate::kv::KvClient;

/// Key under which a client's recent list lives.
pub fn recent_key(client: &ClientId) -> String {
    format!("recent:ip:{}", client)
}

#[derive(Debug, Clone)]
pub struct RecentItemsTracker {
    kv: KvClient,
    max_len: usize,
    window: Duration,
}

impl RecentItemsTracker {
    pub fn new(kv: KvClient, max_len: usize, window: Duration) -> Self {
        Self {
            kv,
            max_len,
            window,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Record a view of `id`, moving it to the front if already present.
    pub async fn push(&self, client: &ClientId, id: NoteId) {
        let key = recent_key(client);
        let member = id.to_string();
        let (max_len, window) = (self.max_len, self.window);
        self.kv
            .call("recent.push", |store| async move {
                store.push_front_unique(&key, &member, max_len, window).await
            })
            .await;
    }

    /// Note ids viewed by `client`, most recent first. Empty when the store
    /// is unavailable.
    pub async fn list(&self, client: &ClientId) -> Vec<NoteId> {
        let key = recent_key(client);
        let max_len = self.max_len;
        let raw = self
            .kv
            .call("recent.list", |store| async move { store.range(&key, max_len).await })
            .await
            .unwrap_or_default();

        raw.into_iter()
            .filter_map(|entry| match entry.parse::<NoteId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    debug!(client = %client, entry = %entry, "Skipping unparsable recent entry");
                    None
                }
            })
            .collect()
    }
}

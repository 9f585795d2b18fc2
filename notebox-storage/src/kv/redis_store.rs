//! Redis-backed key-value store.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;
use tracing::info;

use super::{expiry_secs, ttl_from_reply, KvError, KvResult, KvStore, WindowCount};

/// Key-value store speaking the Redis protocol.
///
/// Construction only parses the address. The multiplexed connection is
/// opened on first use and shared by every caller afterwards; racing first
/// callers wait on a single attempt. A failed attempt leaves nothing cached,
/// so the next command tries again.
pub struct RedisStore {
    client: redis::Client,
    conn: OnceCell<ConnectionManager>,
    timeout: Duration,
}

impl RedisStore {
    /// Parse `url` without connecting. Every command, including the initial
    /// connect, is bounded by `timeout`.
    pub fn open(url: &str, timeout: Duration) -> KvResult<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| KvError::connection(format!("invalid key-value url: {}", e)))?;
        Ok(Self {
            client,
            conn: OnceCell::new(),
            timeout,
        })
    }

    async fn acquire(&self) -> KvResult<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let manager = self.client.get_connection_manager().await?;
                info!(backend = "redis", "Connected to key-value store");
                Ok::<_, KvError>(manager)
            })
            .await?;
        // ConnectionManager is a cheap handle onto the shared multiplexed connection.
        Ok(conn.clone())
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> KvResult<T>
    where
        F: Future<Output = KvResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(KvError::Timeout {
                op,
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl KvStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.bounded("GET", async {
            let mut conn = self.acquire().await?;
            let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
            Ok(value)
        })
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        self.bounded("SET", async {
            let mut conn = self.acquire().await?;
            let _: () = redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(expiry_secs(ttl))
                .query_async(&mut conn)
                .await?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &str) -> KvResult<bool> {
        self.bounded("DEL", async {
            let mut conn = self.acquire().await?;
            let removed: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            Ok(removed > 0)
        })
        .await
    }

    async fn incr_window(&self, key: &str, window: Duration) -> KvResult<WindowCount> {
        self.bounded("INCR/EXPIRE", async {
            let mut conn = self.acquire().await?;
            let mut pipe = redis::pipe();
            pipe.atomic()
                .cmd("INCR")
                .arg(key)
                .cmd("EXPIRE")
                .arg(key)
                .arg(expiry_secs(window))
                .arg("NX")
                .ignore()
                .cmd("TTL")
                .arg(key);
            let (count, ttl): (i64, i64) = pipe.query_async(&mut conn).await?;
            Ok(WindowCount {
                count,
                ttl: ttl_from_reply(ttl),
            })
        })
        .await
    }

    async fn push_front_unique(
        &self,
        key: &str,
        member: &str,
        max_len: usize,
        ttl: Duration,
    ) -> KvResult<()> {
        let stop = max_len.saturating_sub(1) as i64;
        self.bounded("LREM/LPUSH/LTRIM/EXPIRE", async {
            let mut conn = self.acquire().await?;
            let mut pipe = redis::pipe();
            pipe.atomic()
                .cmd("LREM")
                .arg(key)
                .arg(0)
                .arg(member)
                .ignore()
                .cmd("LPUSH")
                .arg(key)
                .arg(member)
                .ignore()
                .cmd("LTRIM")
                .arg(key)
                .arg(0)
                .arg(stop)
                .ignore()
                .cmd("EXPIRE")
                .arg(key)
                .arg(expiry_secs(ttl))
                .ignore();
            let _: () = pipe.query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }

    async fn range(&self, key: &str, limit: usize) -> KvResult<Vec<String>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.bounded("LRANGE", async {
            let mut conn = self.acquire().await?;
            let items: Vec<String> = redis::cmd("LRANGE")
                .arg(key)
                .arg(0)
                .arg(limit as i64 - 1)
                .query_async(&mut conn)
                .await?;
            Ok(items)
        })
        .await
    }

    async fn ttl(&self, key: &str) -> KvResult<Option<Duration>> {
        self.bounded("TTL", async {
            let mut conn = self.acquire().await?;
            let reply: i64 = redis::cmd("TTL").arg(key).query_async(&mut conn).await?;
            Ok(ttl_from_reply(reply))
        })
        .await
    }

    async fn ping(&self) -> KvResult<()> {
        self.bounded("PING", async {
            let mut conn = self.acquire().await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_malformed_url() {
        assert!(RedisStore::open("not a url", Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_open_does_not_connect() {
        let store = RedisStore::open("redis://127.0.0.1:1/0", Duration::from_millis(50))
            .expect("url should parse");
        assert!(!store.conn.initialized());
    }

    #[tokio::test]
    async fn test_unreachable_store_errors_and_retries() {
        let store = RedisStore::open("redis://127.0.0.1:1/0", Duration::from_millis(200))
            .expect("url should parse");

        assert!(store.get("record:1").await.is_err());
        assert!(!store.conn.initialized());

        // A second command makes a fresh attempt rather than reusing a failure.
        assert!(store.ping().await.is_err());
        assert!(!store.conn.initialized());
    }
}

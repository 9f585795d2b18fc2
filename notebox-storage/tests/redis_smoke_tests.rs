//! Smoke tests for the Redis batches against a live server.
//!
//! Enabled with `--features redis-tests`; the server address comes from
//! `REDIS_URL` (default `redis://localhost:6379/0`).
#![cfg(feature = "redis-tests")]

use std::sync::Arc;
use std::time::Duration;

use notebox_core::{ClientId, KvConfig};
use notebox_storage::{
    rate_key, recent_key, KvClient, KvError, KvResult, KvServices, KvStore, RateDecision,
    RedisStore,
};
use notebox_test_utils::fixtures;

fn live_store() -> KvResult<Arc<RedisStore>> {
    let config = KvConfig::from_env().map_err(|e| KvError::connection(e.to_string()))?;
    let url = config
        .url
        .ok_or_else(|| KvError::connection("REDIS_URL is empty"))?;
    Ok(Arc::new(RedisStore::open(&url, Duration::from_secs(2))?))
}

/// Distinct per run so repeated runs never share keys.
fn run_suffix() -> i64 {
    chrono::Utc::now().timestamp_micros()
}

#[tokio::test]
async fn smoke_test_window_counts_without_extending_ttl() -> KvResult<()> {
    let store = live_store()?;
    store.ping().await?;
    let config = KvConfig::disabled().with_rate_limit(3, Duration::from_secs(60));
    let kv = KvServices::new(KvClient::new(store.clone()), &config);
    let client = ClientId::new(format!("smoke-{}", run_suffix()));
    let key = rate_key(&client);

    assert_eq!(
        kv.limiter.check(&client).await,
        RateDecision::Allowed { count: 1, limit: 3 }
    );
    let first_ttl = store.ttl(&key).await?.ok_or_else(|| KvError::command("no ttl"))?;
    assert!(first_ttl <= Duration::from_secs(60));
    assert!(first_ttl >= Duration::from_secs(59));

    tokio::time::sleep(Duration::from_millis(1100)).await;
    for expected in 2..=3 {
        assert_eq!(
            kv.limiter.check(&client).await,
            RateDecision::Allowed {
                count: expected,
                limit: 3
            }
        );
    }
    let later_ttl = store.ttl(&key).await?.ok_or_else(|| KvError::command("no ttl"))?;
    assert!(later_ttl < first_ttl);

    match kv.limiter.check(&client).await {
        RateDecision::Limited {
            count, retry_after, ..
        } => {
            assert_eq!(count, 4);
            assert!(retry_after <= later_ttl);
        }
        other => panic!("expected limited, got {:?}", other),
    }

    store.delete(&key).await?;
    assert_eq!(kv.client.degraded_operations(), 0);
    Ok(())
}

#[tokio::test]
async fn smoke_test_recent_views_move_to_front() -> KvResult<()> {
    let store = live_store()?;
    let config = KvConfig::disabled().with_recent(5, Duration::from_secs(600));
    let kv = KvServices::new(KvClient::new(store.clone()), &config);
    let client = ClientId::new(format!("smoke-{}", run_suffix()));

    for id in 1..=6 {
        kv.recent.push(&client, id).await;
    }
    assert_eq!(kv.recent.list(&client).await, vec![6, 5, 4, 3, 2]);

    kv.recent.push(&client, 3).await;
    assert_eq!(kv.recent.list(&client).await, vec![3, 6, 5, 4, 2]);

    let key = recent_key(&client);
    let ttl = store.ttl(&key).await?.ok_or_else(|| KvError::command("no ttl"))?;
    assert!(ttl <= Duration::from_secs(600));
    assert!(ttl > Duration::from_secs(590));

    store.delete(&key).await?;
    assert_eq!(kv.client.degraded_operations(), 0);
    Ok(())
}

#[tokio::test]
async fn smoke_test_cache_round_trip_then_invalidate() -> KvResult<()> {
    let store = live_store()?;
    let kv = KvServices::new(KvClient::new(store.clone()), &KvConfig::disabled());
    let note = fixtures::note(run_suffix());

    assert_eq!(kv.cache.get(note.id).await, None);
    kv.cache.put(&note).await;
    assert_eq!(kv.cache.get(note.id).await, Some(note.clone()));

    kv.cache.invalidate(note.id).await;
    assert_eq!(kv.cache.get(note.id).await, None);
    assert_eq!(kv.client.degraded_operations(), 0);
    Ok(())
}

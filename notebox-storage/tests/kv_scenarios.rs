//! Scenario tests for the key-value features running against the in-memory
//! store on a paused clock.

use std::sync::Arc;
use std::time::Duration;

use notebox_core::{KvConfig, NewNote, NoteFilter};
use notebox_storage::{
    rate_key, InMemoryNoteRepository, KvClient, KvServices, KvStore, MemoryStore, NoteRepository,
    RateDecision,
};
use notebox_test_utils::fixtures;

fn services(config: &KvConfig) -> (KvServices, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let services = KvServices::new(KvClient::new(store.clone()), config);
    (services, store)
}

#[tokio::test(start_paused = true)]
async fn test_three_per_minute_limit() {
    let config = KvConfig::disabled().with_rate_limit(3, Duration::from_secs(60));
    let (kv, _) = services(&config);
    let client = fixtures::client("203.0.113.7");

    for expected in 1..=3 {
        assert_eq!(
            kv.limiter.check(&client).await,
            RateDecision::Allowed {
                count: expected,
                limit: 3
            }
        );
    }
    let fourth = kv.limiter.check(&client).await;
    assert!(!fourth.is_allowed());

    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(
        kv.limiter.check(&client).await,
        RateDecision::Allowed { count: 1, limit: 3 }
    );
}

#[tokio::test(start_paused = true)]
async fn test_window_not_extended_by_later_requests() {
    let config = KvConfig::disabled().with_rate_limit(100, Duration::from_secs(60));
    let (kv, store) = services(&config);
    let client = fixtures::client("203.0.113.8");
    let key = rate_key(&client);

    kv.limiter.check(&client).await;
    assert_eq!(
        store.ttl(&key).await.expect("ttl"),
        Some(Duration::from_secs(60))
    );

    tokio::time::advance(Duration::from_secs(30)).await;
    kv.limiter.check(&client).await;
    kv.limiter.check(&client).await;
    assert_eq!(
        store.ttl(&key).await.expect("ttl"),
        Some(Duration::from_secs(30))
    );
}

#[tokio::test]
async fn test_recent_views_scenario() {
    let config = KvConfig::disabled().with_recent(5, Duration::from_secs(600));
    let (kv, _) = services(&config);
    let client = fixtures::client("198.51.100.1");

    for id in 1..=6 {
        kv.recent.push(&client, id).await;
    }
    assert_eq!(kv.recent.list(&client).await, vec![6, 5, 4, 3, 2]);

    kv.recent.push(&client, 3).await;
    assert_eq!(kv.recent.list(&client).await, vec![3, 6, 5, 4, 2]);
}

#[tokio::test]
async fn test_features_share_one_store() {
    let (kv, store) = services(&KvConfig::disabled());
    let client = fixtures::client("198.51.100.2");

    kv.cache.put(&fixtures::note(1)).await;
    kv.limiter.check(&client).await;
    kv.recent.push(&client, 1).await;

    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn test_outage_degrades_every_feature() {
    let (kv, store) = services(&KvConfig::disabled());
    let repo = InMemoryNoteRepository::new();
    let client = fixtures::client("192.0.2.1");
    store.set_offline(true);

    let note = repo
        .create(NewNote::new("Outage", "still persisted"))
        .await
        .expect("persistence is unaffected");

    kv.cache.put(&note).await;
    assert_eq!(kv.cache.get(note.id).await, None);
    assert_eq!(kv.limiter.check(&client).await, RateDecision::Bypassed);
    kv.recent.push(&client, note.id).await;
    assert!(kv.recent.list(&client).await.is_empty());
    assert!(kv.client.degraded_operations() >= 5);

    let listed = repo.list(&NoteFilter::default()).await.expect("list");
    assert_eq!(listed.len(), 1);

    // Recovery needs no intervention.
    store.set_offline(false);
    kv.cache.put(&note).await;
    assert_eq!(kv.cache.get(note.id).await, Some(note));
}

#[tokio::test]
async fn test_disabled_client_behaves_like_outage() {
    let kv = KvServices::new(KvClient::disabled(), &KvConfig::disabled());
    let client = fixtures::client("192.0.2.2");

    kv.cache.put(&fixtures::note(1)).await;
    assert_eq!(kv.cache.get(1).await, None);
    assert_eq!(kv.limiter.check(&client).await, RateDecision::Bypassed);
    kv.recent.push(&client, 1).await;
    assert!(kv.recent.list(&client).await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_checks_count_exactly() {
    let config = KvConfig::disabled().with_rate_limit(50, Duration::from_secs(60));
    let (kv, _) = services(&config);
    let client = fixtures::client("192.0.2.3");

    let mut handles = Vec::new();
    for _ in 0..80 {
        let limiter = kv.limiter.clone();
        let client = client.clone();
        handles.push(tokio::spawn(async move { limiter.check(&client).await }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.expect("task panicked").is_allowed() {
            allowed += 1;
        }
    }
    assert_eq!(allowed, 50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_pushes_stay_bounded() {
    let config = KvConfig::disabled().with_recent(5, Duration::from_secs(600));
    let (kv, _) = services(&config);
    let client = fixtures::client("192.0.2.4");

    let mut handles = Vec::new();
    for id in 0..40i64 {
        let recent = kv.recent.clone();
        let client = client.clone();
        handles.push(tokio::spawn(async move { recent.push(&client, id % 8).await }));
    }
    for handle in handles {
        handle.await.expect("task panicked");
    }

    let list = kv.recent.list(&client).await;
    notebox_test_utils::assertions::assert_recent_list_bounded(&list, 5);
    assert_eq!(list.len(), 5);
}

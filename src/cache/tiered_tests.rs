use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::distributed::DistributedCache;
use super::envelope::{Envelope, now_millis};
use super::memory::{EvictionListener, MemoryTierConfig};
use super::tiered::MultiTierCache;
use super::types::{CacheTier, SetOptions};
use crate::store::MemoryStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Court {
    id: u32,
    name: String,
}

fn court(id: u32) -> Court {
    Court {
        id,
        name: format!("Court {id}"),
    }
}

fn tiered(max_size: u64) -> (MultiTierCache<Court, MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    let cache = MultiTierCache::new(
        "courts",
        DistributedCache::with_store(store.clone()),
        MemoryTierConfig::new(max_size, Duration::from_secs(60)),
    );
    (cache, store)
}

#[tokio::test]
async fn test_set_writes_both_tiers() {
    let (cache, store) = tiered(10);

    assert!(cache.set("1", &court(1), &SetOptions::default()).await);

    assert_eq!(cache.memory().get("1"), Some(court(1)));
    assert!(store.raw("courts:1").is_some());
}

#[tokio::test]
async fn test_get_serves_from_memory_first() {
    let (cache, store) = tiered(10);
    cache.set("1", &court(1), &SetOptions::default()).await;

    let before = store.round_trips();
    let hit = cache.get("1").await.expect("hit");
    assert_eq!(hit.tier, CacheTier::Memory);
    assert_eq!(hit.data, court(1));
    assert_eq!(store.round_trips(), before);
}

#[tokio::test]
async fn test_distributed_hit_is_promoted() {
    let (cache, store) = tiered(10);
    cache.set("1", &court(1), &SetOptions::default()).await;
    cache.memory().clear();

    let first = cache.get("1").await.expect("hit");
    assert_eq!(first.tier, CacheTier::Distributed);

    let before = store.round_trips();
    let second = cache.get("1").await.expect("hit");
    assert_eq!(second.tier, CacheTier::Memory);
    assert_eq!(store.round_trips(), before);

    let metrics = cache.metrics();
    assert_eq!(metrics.promotions, 1);
    assert_eq!(metrics.tier2_hits, 1);
    assert_eq!(metrics.tier1_hits, 1);
    assert_eq!(metrics.tier1_misses, 1);
}

#[tokio::test]
async fn test_get_miss_on_both_tiers() {
    let (cache, _) = tiered(10);

    assert!(cache.get("404").await.is_none());
    let metrics = cache.metrics();
    assert_eq!(metrics.tier1_misses, 1);
    assert_eq!(metrics.tier2_misses, 1);
    assert_eq!(metrics.computes, 0);
}

#[tokio::test]
async fn test_get_or_compute_walks_tiers() {
    let (cache, _) = tiered(10);
    let calls = Arc::new(AtomicU32::new(0));

    let compute = |calls: Arc<AtomicU32>| async move {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(court(5))
    };

    let first = cache
        .get_or_compute("5", || compute(Arc::clone(&calls)), SetOptions::default())
        .await
        .unwrap();
    assert_eq!(first.tier, CacheTier::Computed);
    assert!(!first.cached);

    let second = cache
        .get_or_compute("5", || compute(Arc::clone(&calls)), SetOptions::default())
        .await
        .unwrap();
    assert_eq!(second.tier, CacheTier::Memory);
    assert!(second.cached);

    cache.memory().clear();
    let third = cache
        .get_or_compute("5", || compute(Arc::clone(&calls)), SetOptions::default())
        .await
        .unwrap();
    assert_eq!(third.tier, CacheTier::Distributed);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.metrics().computes, 1);
}

#[tokio::test]
async fn test_compute_error_caches_nothing() {
    let (cache, store) = tiered(10);

    let result = cache
        .get_or_compute(
            "1",
            || async { Err::<Court, _>("boom".to_string()) },
            SetOptions::default(),
        )
        .await;

    assert_eq!(result.unwrap_err(), "boom");
    assert!(cache.memory().get("1").is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_batch_get_only_fetches_memory_misses() {
    let (cache, store) = tiered(10);
    cache.set("a", &court(1), &SetOptions::default()).await;
    cache.set("b", &court(2), &SetOptions::default()).await;
    cache.memory().remove("b");

    let before = store.round_trips();
    let results = cache.batch_get(&["a", "b", "c"]).await;
    assert_eq!(store.round_trips() - before, 1);

    assert_eq!(
        results,
        vec![
            ("a".to_string(), Some(court(1))),
            ("b".to_string(), Some(court(2))),
            ("c".to_string(), None),
        ]
    );
    assert_eq!(cache.memory().get("b"), Some(court(2)));

    let metrics = cache.metrics();
    assert_eq!(metrics.tier1_hits, 1);
    assert_eq!(metrics.tier1_misses, 2);
    assert_eq!(metrics.tier2_hits, 1);
    assert_eq!(metrics.tier2_misses, 1);
    assert_eq!(metrics.promotions, 1);
}

#[tokio::test]
async fn test_batch_get_all_in_memory_skips_store() {
    let (cache, store) = tiered(10);
    cache.set("a", &court(1), &SetOptions::default()).await;

    let before = store.round_trips();
    let results = cache.batch_get(&["a"]).await;
    assert_eq!(store.round_trips(), before);
    assert_eq!(results[0].1, Some(court(1)));
}

#[tokio::test]
async fn test_batch_set_fills_both_tiers() {
    let (cache, store) = tiered(10);
    let entries = vec![("1".to_string(), court(1)), ("2".to_string(), court(2))];

    assert!(cache.batch_set(&entries, &SetOptions::default()).await);
    assert_eq!(cache.memory().get("2"), Some(court(2)));
    assert!(store.raw("courts:1").is_some());
    assert!(store.raw("courts:2").is_some());
}

#[tokio::test]
async fn test_invalidate_by_tag_clears_memory_too() {
    let (cache, store) = tiered(10);
    let tagged = SetOptions::default().tag("judge:7");

    cache.set("1", &court(1), &tagged).await;
    cache.set("2", &court(2), &tagged).await;
    cache.set("3", &court(3), &SetOptions::default()).await;

    assert_eq!(cache.invalidate_by_tag("judge:7").await, 2);

    assert!(cache.memory().get("1").is_none());
    assert!(cache.memory().get("2").is_none());
    assert_eq!(cache.memory().get("3"), Some(court(3)));
    assert!(store.raw("courts:1").is_none());
}

#[tokio::test]
async fn test_delete_and_clear_namespace() {
    let (cache, store) = tiered(10);
    cache.set("1", &court(1), &SetOptions::default()).await;
    cache.set("2", &court(2), &SetOptions::default()).await;

    assert!(cache.delete("1").await);
    assert!(cache.get("1").await.is_none());

    assert_eq!(cache.clear_namespace().await, 1);
    cache.run_pending_tasks();
    assert!(cache.memory().is_empty());
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_lru_eviction_is_counted_and_reported() {
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);
    let on_evict: EvictionListener<Court> = Arc::new(move |key: &str, _: &Court| {
        sink.lock().push(key.to_string());
    });

    let cache = MultiTierCache::with_eviction_callback(
        "courts",
        DistributedCache::with_store(MemoryStore::new()),
        MemoryTierConfig::new(2, Duration::from_secs(60)),
        on_evict,
    );

    cache.set("a", &court(1), &SetOptions::default()).await;
    cache.set("b", &court(2), &SetOptions::default()).await;
    cache.run_pending_tasks();
    assert!(cache.get("a").await.is_some());
    cache.run_pending_tasks();
    cache.set("c", &court(3), &SetOptions::default()).await;
    cache.run_pending_tasks();

    assert!(cache.memory().get("b").is_none());
    assert!(cache.memory().get("a").is_some());
    assert_eq!(cache.metrics().evictions, 1);
    assert_eq!(*evicted.lock(), vec!["b".to_string()]);

    // Evicted from memory, still served by the distributed tier.
    let hit = cache.get("b").await.expect("hit");
    assert_eq!(hit.tier, CacheTier::Distributed);
}

#[tokio::test]
async fn test_writes_past_capacity_evict_without_manual_maintenance() {
    let evicted = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&evicted);
    let on_evict: EvictionListener<Court> = Arc::new(move |key: &str, value: &Court| {
        sink.lock().push((key.to_string(), value.id));
    });

    let cache = MultiTierCache::with_eviction_callback(
        "courts",
        DistributedCache::with_store(MemoryStore::new()),
        MemoryTierConfig::new(2, Duration::from_secs(60)),
        on_evict,
    );

    cache.set("x", &court(1), &SetOptions::default()).await;
    cache.set("y", &court(2), &SetOptions::default()).await;
    cache.set("z", &court(3), &SetOptions::default()).await;

    assert_eq!(cache.metrics().evictions, 1);
    assert_eq!(*evicted.lock(), vec![("x".to_string(), 1)]);

    let hit = cache.get("x").await.expect("hit");
    assert_ne!(hit.tier, CacheTier::Memory);
    assert_eq!(hit.data, court(1));
    assert!(cache.memory().len() <= 2);
}

#[tokio::test]
async fn test_hit_rate_and_reset() {
    let (cache, _) = tiered(10);
    cache.set("1", &court(1), &SetOptions::default()).await;

    for _ in 0..3 {
        cache.get("1").await;
    }
    cache.get("missing").await;

    let rates = cache.hit_rate();
    assert_eq!(rates.tier1, 0.75);
    assert_eq!(rates.tier2, 0.0);
    assert_eq!(rates.overall, 0.6);

    cache.log_stats();
    cache.reset_metrics();
    assert_eq!(cache.metrics(), Default::default());
}

#[tokio::test]
async fn test_swr_stale_distributed_hit_is_promoted_and_refreshed() {
    let (cache, store) = tiered(10);
    let envelope = Envelope::new(court(1), now_millis() - 7_000, 10, 4);
    store.insert_raw("courts:1", &serde_json::to_string(&envelope).unwrap());

    let refreshed = Court {
        id: 1,
        name: "Renamed".to_string(),
    };
    let fresh = refreshed.clone();

    let outcome = cache
        .get_or_compute_swr(
            "1",
            move || async move { Ok::<_, String>(fresh) },
            SetOptions::swr(10, 4),
        )
        .await
        .unwrap();

    assert_eq!(outcome.tier, CacheTier::Distributed);
    assert!(outcome.was_stale);
    assert_eq!(outcome.data, court(1));
    assert_eq!(cache.memory().get("1"), Some(court(1)));
    assert_eq!(cache.metrics().promotions, 1);

    tokio::time::sleep(Duration::from_millis(100)).await;
    let raw = store.raw("courts:1").unwrap();
    let stored: Envelope<Court> = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored.data, refreshed);
}

#[tokio::test]
async fn test_swr_miss_computes_without_promotion() {
    let (cache, store) = tiered(10);

    let outcome = cache
        .get_or_compute_swr(
            "1",
            || async { Ok::<_, String>(court(1)) },
            SetOptions::swr(60, 10),
        )
        .await
        .unwrap();

    assert_eq!(outcome.tier, CacheTier::Computed);
    assert_eq!(cache.memory().get("1"), Some(court(1)));
    assert!(store.raw("courts:1").is_some());

    let metrics = cache.metrics();
    assert_eq!(metrics.computes, 1);
    assert_eq!(metrics.promotions, 0);

    let again = cache
        .get_or_compute_swr(
            "1",
            || async { Err::<Court, _>("unused".to_string()) },
            SetOptions::swr(60, 10),
        )
        .await
        .unwrap();
    assert_eq!(again.tier, CacheTier::Memory);
}

#[tokio::test]
async fn test_degraded_mode_uses_memory_only() {
    let cache: MultiTierCache<Court, MemoryStore> = MultiTierCache::new(
        "courts",
        DistributedCache::unavailable(),
        MemoryTierConfig::default(),
    );

    assert!(!cache.set("1", &court(1), &SetOptions::default()).await);
    let hit = cache.get("1").await.expect("memory still works");
    assert_eq!(hit.tier, CacheTier::Memory);

    let outcome = cache
        .get_or_compute(
            "2",
            || async { Ok::<_, String>(court(2)) },
            SetOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(outcome.tier, CacheTier::Computed);
    assert_eq!(cache.invalidate_by_tag("judge:1").await, 0);
}

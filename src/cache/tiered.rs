//! Tiered cache: in-process tier 1 + distributed tier 2.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument};

use super::distributed::DistributedCache;
use super::memory::{EvictionListener, MemoryTier, MemoryTierConfig};
use super::metrics::{CacheMetrics, HitRates, MetricsSnapshot};
use super::types::{CacheTier, GetOptions, SetOptions, TieredHit, TieredOutcome};
use crate::constants::strip_namespace;
use crate::store::{RemoteStore, RestStore};

/// One namespace's cache: a private [`MemoryTier`] in front of a shared
/// [`DistributedCache`].
///
/// Lookups check tier 1, then tier 2 (promoting hits into tier 1), then fall
/// back to the caller's compute function. Writes go to tier 1 first, then
/// tier 2.
pub struct MultiTierCache<T, S = RestStore> {
    namespace: String,
    memory: MemoryTier<T>,
    distributed: DistributedCache<S>,
    metrics: Arc<CacheMetrics>,
}

impl<T, S> std::fmt::Debug for MultiTierCache<T, S>
where
    T: Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MultiTierCache")
            .field("namespace", &self.namespace)
            .field("memory", &self.memory)
            .field("distributed", &self.distributed)
            .finish()
    }
}

impl<T, S> MultiTierCache<T, S>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    S: RemoteStore,
{
    pub fn new(
        namespace: impl Into<String>,
        distributed: DistributedCache<S>,
        config: MemoryTierConfig,
    ) -> Self {
        Self::build(namespace.into(), distributed, config, None)
    }

    /// Like [`new`](Self::new), calling `on_evict` for every tier-1 eviction.
    pub fn with_eviction_callback(
        namespace: impl Into<String>,
        distributed: DistributedCache<S>,
        config: MemoryTierConfig,
        on_evict: EvictionListener<T>,
    ) -> Self {
        Self::build(namespace.into(), distributed, config, Some(on_evict))
    }

    fn build(
        namespace: String,
        distributed: DistributedCache<S>,
        config: MemoryTierConfig,
        on_evict: Option<EvictionListener<T>>,
    ) -> Self {
        let metrics = Arc::new(CacheMetrics::new());
        let listener_metrics = Arc::clone(&metrics);
        let listener: EvictionListener<T> = Arc::new(move |key: &str, value: &T| {
            listener_metrics.record_eviction();
            if let Some(on_evict) = &on_evict {
                on_evict(key, value);
            }
        });

        Self {
            namespace,
            memory: MemoryTier::with_eviction_listener(config, listener),
            distributed,
            metrics,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn memory(&self) -> &MemoryTier<T> {
        &self.memory
    }

    pub fn distributed(&self) -> &DistributedCache<S> {
        &self.distributed
    }

    /// Pure read: tier 1, then tier 2 with promotion. Never computes.
    #[instrument(skip(self), fields(namespace = %self.namespace))]
    pub async fn get(&self, key: &str) -> Option<TieredHit<T>> {
        if let Some(data) = self.memory.get(key) {
            self.metrics.record_tier1_hit();
            debug!("Tier 1 hit");
            return Some(TieredHit {
                data,
                tier: CacheTier::Memory,
                was_stale: false,
            });
        }
        self.metrics.record_tier1_miss();

        let lookup = self
            .distributed
            .get::<T>(&self.namespace, key, &GetOptions::default())
            .await;

        match lookup.data {
            Some(data) => {
                self.promote(key, &data);
                self.metrics.record_tier2_hit();
                debug!(stale = lookup.is_stale, "Tier 2 hit, promoted");
                Some(TieredHit {
                    data,
                    tier: CacheTier::Distributed,
                    was_stale: lookup.is_stale,
                })
            }
            None => {
                self.metrics.record_tier2_miss();
                debug!("Miss on both tiers");
                None
            }
        }
    }

    /// Returns the cached value or computes, writes through, and returns it.
    ///
    /// A compute error is returned as-is and nothing is cached.
    pub async fn get_or_compute<F, Fut, E>(
        &self,
        key: &str,
        compute: F,
        options: SetOptions,
    ) -> Result<TieredOutcome<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(TieredOutcome::from_hit(hit));
        }

        self.metrics.record_compute();
        let data = compute().await?;
        self.set(key, &data, &options).await;
        Ok(TieredOutcome::computed(data))
    }

    /// Stale-while-revalidate variant of [`get_or_compute`](Self::get_or_compute).
    ///
    /// Staleness and background refresh are handled by the distributed tier.
    /// A distributed hit (fresh or stale) is promoted into tier 1; a freshly
    /// computed value was already written to tier 2 and is stored in tier 1
    /// without counting a promotion.
    pub async fn get_or_compute_swr<F, Fut, E>(
        &self,
        key: &str,
        compute: F,
        options: SetOptions,
    ) -> Result<TieredOutcome<T>, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        if let Some(data) = self.memory.get(key) {
            self.metrics.record_tier1_hit();
            return Ok(TieredOutcome {
                data,
                tier: CacheTier::Memory,
                cached: true,
                was_stale: false,
            });
        }
        self.metrics.record_tier1_miss();

        let outcome = self
            .distributed
            .get_or_compute(&self.namespace, key, compute, options)
            .await;

        match outcome {
            Ok(outcome) if outcome.cached => {
                self.promote(key, &outcome.data);
                self.metrics.record_tier2_hit();
                Ok(TieredOutcome {
                    data: outcome.data,
                    tier: CacheTier::Distributed,
                    cached: true,
                    was_stale: outcome.was_stale,
                })
            }
            Ok(outcome) => {
                self.metrics.record_tier2_miss();
                self.metrics.record_compute();
                self.memory.insert(key, outcome.data.clone());
                Ok(TieredOutcome::computed(outcome.data))
            }
            Err(e) => {
                self.metrics.record_tier2_miss();
                self.metrics.record_compute();
                Err(e)
            }
        }
    }

    /// Write-through: tier 1 synchronously, then tier 2.
    ///
    /// Returns whether tier 2 accepted the write.
    pub async fn set(&self, key: &str, data: &T, options: &SetOptions) -> bool {
        self.memory.insert(key, data.clone());
        self.distributed
            .set(&self.namespace, key, data, options)
            .await
    }

    /// Removes `key` from both tiers; `true` if tier 2 held it.
    pub async fn delete(&self, key: &str) -> bool {
        self.memory.remove(key);
        self.distributed.delete(&self.namespace, key).await
    }

    /// Looks up several keys, sending only tier-1 misses to tier 2 in one batch.
    ///
    /// Results follow the order of `keys`; misses are `None`.
    #[instrument(skip(self, keys), fields(namespace = %self.namespace, count = keys.len()))]
    pub async fn batch_get<K: AsRef<str>>(&self, keys: &[K]) -> Vec<(String, Option<T>)> {
        let mut results: Vec<(String, Option<T>)> = Vec::with_capacity(keys.len());
        let mut missing: Vec<(usize, String)> = Vec::new();

        for key in keys {
            let key = key.as_ref();
            match self.memory.get(key) {
                Some(data) => {
                    self.metrics.record_tier1_hit();
                    results.push((key.to_string(), Some(data)));
                }
                None => {
                    self.metrics.record_tier1_miss();
                    missing.push((results.len(), key.to_string()));
                    results.push((key.to_string(), None));
                }
            }
        }

        if missing.is_empty() {
            return results;
        }

        let missing_keys: Vec<&str> = missing.iter().map(|(_, key)| key.as_str()).collect();
        let fetched = self
            .distributed
            .batch_get::<T, _>(&self.namespace, missing_keys.as_slice())
            .await;

        for ((index, key), (_, data)) in missing.iter().zip(fetched) {
            match data {
                Some(data) => {
                    self.promote(key, &data);
                    self.metrics.record_tier2_hit();
                    results[*index].1 = Some(data);
                }
                None => self.metrics.record_tier2_miss(),
            }
        }

        results
    }

    /// Writes every entry to tier 1, then all of them to tier 2 in one batch.
    pub async fn batch_set(&self, entries: &[(String, T)], options: &SetOptions) -> bool {
        for (key, data) in entries {
            self.memory.insert(key, data.clone());
        }
        self.distributed
            .batch_set(&self.namespace, entries, options)
            .await
    }

    /// Invalidates `tag` in tier 2 and drops the affected keys from tier 1.
    ///
    /// Returns the number of tier-2 keys deleted.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        let invalidation = self.distributed.invalidate_by_tag_keys(tag).await;
        for full_key in &invalidation.keys {
            if let Some(key) = strip_namespace(&self.namespace, full_key) {
                self.memory.remove(key);
            }
        }
        invalidation.deleted
    }

    /// Empties tier 1 and deletes this namespace from tier 2.
    pub async fn clear_namespace(&self) -> usize {
        self.memory.clear();
        self.distributed.clear_namespace(&self.namespace).await
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn hit_rate(&self) -> HitRates {
        self.metrics.snapshot().hit_rates()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Emits one `info` event with counters, hit rates and tier-1 size.
    pub fn log_stats(&self) {
        let m = self.metrics.snapshot();
        let rates = m.hit_rates();
        info!(
            namespace = %self.namespace,
            tier1_hits = m.tier1_hits,
            tier1_misses = m.tier1_misses,
            tier2_hits = m.tier2_hits,
            tier2_misses = m.tier2_misses,
            computes = m.computes,
            promotions = m.promotions,
            evictions = m.evictions,
            tier1_hit_rate = rates.tier1,
            tier2_hit_rate = rates.tier2,
            overall_hit_rate = rates.overall,
            memory_entries = self.memory.len(),
            "Cache stats"
        );
    }

    /// Runs pending tier-1 maintenance (evictions and eviction callbacks).
    pub fn run_pending_tasks(&self) {
        self.memory.run_pending_tasks();
    }

    fn promote(&self, key: &str, data: &T) {
        self.memory.insert(key, data.clone());
        self.metrics.record_promotion();
    }
}

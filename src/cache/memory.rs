//! Tier 1: bounded in-process cache.
//!
//! Backed by a moka sync cache with the LRU eviction policy and a tier-wide
//! time to live. Each process (each [`super::MultiTierCache`]) owns its own
//! instance; nothing here is shared across processes.

use std::sync::Arc;
use std::time::Duration;

use moka::notification::RemovalCause;
use moka::policy::EvictionPolicy;
use moka::sync::Cache;

use crate::constants::{DEFAULT_L1_CAPACITY, DEFAULT_L1_TTL_SECS};

/// Callback invoked with the key and value of every evicted entry.
pub type EvictionListener<T> = Arc<dyn Fn(&str, &T) + Send + Sync + 'static>;

/// Size and lifetime of a [`MemoryTier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryTierConfig {
    /// Max entries before least-recently-used entries are evicted.
    pub max_size: u64,
    /// Lifetime of an entry, independent of tier 2.
    pub ttl: Duration,
}

impl Default for MemoryTierConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_L1_CAPACITY,
            ttl: Duration::from_secs(DEFAULT_L1_TTL_SECS),
        }
    }
}

impl MemoryTierConfig {
    pub fn new(max_size: u64, ttl: Duration) -> Self {
        Self { max_size, ttl }
    }

    pub fn max_size(mut self, max_size: u64) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// In-memory LRU cache keyed by the namespace-local key.
///
/// Clones share the same entries.
#[derive(Clone)]
pub struct MemoryTier<T> {
    entries: Cache<String, T>,
    config: MemoryTierConfig,
}

impl<T: Clone + Send + Sync + 'static> MemoryTier<T> {
    pub fn new(config: MemoryTierConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates a tier that reports size- and TTL-driven evictions to `listener`.
    ///
    /// Explicit removals and replacements are not reported.
    pub fn with_eviction_listener(config: MemoryTierConfig, listener: EvictionListener<T>) -> Self {
        Self::build(config, Some(listener))
    }

    fn build(config: MemoryTierConfig, listener: Option<EvictionListener<T>>) -> Self {
        let mut builder = Cache::builder()
            .max_capacity(config.max_size)
            .time_to_live(config.ttl)
            .eviction_policy(EvictionPolicy::lru());

        if let Some(listener) = listener {
            builder = builder.eviction_listener(
                move |key: Arc<String>, value: T, cause: RemovalCause| {
                    if cause.was_evicted() {
                        listener(key.as_str(), &value);
                    }
                },
            );
        }

        Self {
            entries: builder.build(),
            config,
        }
    }

    pub fn config(&self) -> &MemoryTierConfig {
        &self.config
    }

    /// Returns a clone of the value and marks it most recently used.
    #[inline]
    pub fn get(&self, key: &str) -> Option<T> {
        self.entries.get(key)
    }

    /// Inserts `value` and runs maintenance so the size bound holds on return.
    ///
    /// Evictions caused by this insert are reported before it returns.
    #[inline]
    pub fn insert(&self, key: &str, value: T) {
        self.entries.insert(key.to_string(), value);
        self.entries.run_pending_tasks();
    }

    #[inline]
    pub fn remove(&self, key: &str) -> Option<T> {
        self.entries.remove(key)
    }

    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of entries (approximate until pending tasks run).
    #[inline]
    pub fn len(&self) -> u64 {
        self.entries.entry_count()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.entry_count() == 0
    }

    #[inline]
    pub fn clear(&self) {
        self.entries.invalidate_all();
    }

    /// Runs pending maintenance (evictions, listener delivery).
    #[inline]
    pub fn run_pending_tasks(&self) {
        self.entries.run_pending_tasks();
    }

    /// Returns the currently stored keys.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(|(k, _)| k.as_ref().clone())
    }
}

impl<T: Clone + Send + Sync + 'static> std::fmt::Debug for MemoryTier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTier")
            .field("entries", &self.entries.entry_count())
            .field("config", &self.config)
            .finish()
    }
}

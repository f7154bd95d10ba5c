//! Docket cache library crate.
//!
//! # Public API Surface
//!
//! ## Entry Point
//! - [`CacheContext`] - Built once from [`Config`]; hands out caches sharing one
//!   remote client
//!
//! ## Cache Tiers
//! - [`MultiTierCache`] - In-process tier 1 in front of distributed tier 2
//! - [`DistributedCache`] - Namespaced envelopes with SWR, tags and batching
//! - [`MemoryTier`], [`MemoryTierConfig`] - Bounded LRU tier (moka)
//! - [`Envelope`] - JSON wire format of tier-2 entries
//! - [`CacheMetrics`], [`MetricsSnapshot`], [`HitRates`] - Hit/miss counters
//!
//! ## Remote Store
//! - [`RemoteCacheClient`] - Typed commands, degrades to no-ops when unconfigured
//! - [`RemoteStore`] - Backend trait; [`RestStore`] speaks the Upstash REST protocol
//! - [`StoreError`] - Transport and command failures
//!
//! ## Constants
//! TTL and stale-window presets live in [`constants::ttl`] and
//! [`constants::stale`]; namespaces and key builders in [`keys`].
//!
//! ## Test/Mock Support
//! [`MemoryStore`] is available behind `#[cfg(any(test, feature = "mock"))]`.

pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod keys;
pub mod store;

pub use cache::{
    CacheMetrics, CacheTier, ComputeOutcome, DistributedCache, DistributedLookup, Envelope,
    EvictionListener, GetOptions, HitRates, Invalidation, MemoryTier, MemoryTierConfig,
    MetricsSnapshot, MultiTierCache, SetOptions, TieredHit, TieredOutcome,
};
pub use config::{Config, ConfigError, RemoteConfig};
pub use constants::{stale, ttl};
pub use context::CacheContext;
pub use keys::{court_tag, judge_tag, search_key};
#[cfg(any(test, feature = "mock"))]
pub use store::MemoryStore;
pub use store::{
    Command, ExpireCondition, RemoteCacheClient, RemoteStore, Reply, RestStore, StoreError,
    StoreResult,
};

//! Cache tiers: envelope format, distributed tier, in-process tier, and the
//! orchestrator that stacks them.

pub mod distributed;
pub mod envelope;
pub mod memory;
pub mod metrics;
pub mod tiered;
pub mod types;

#[cfg(test)]
mod tiered_tests;

pub use distributed::{DistributedCache, Invalidation};
pub use envelope::{Envelope, now_millis};
pub use memory::{EvictionListener, MemoryTier, MemoryTierConfig};
pub use metrics::{CacheMetrics, HitRates, MetricsSnapshot};
pub use tiered::MultiTierCache;
pub use types::{
    CacheTier, ComputeOutcome, DistributedLookup, GetOptions, SetOptions, TieredHit,
    TieredOutcome,
};

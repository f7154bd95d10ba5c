//! Hit/miss counters for the multi-tier cache.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters, reset only by [`CacheMetrics::reset`].
#[derive(Debug, Default)]
pub struct CacheMetrics {
    tier1_hits: AtomicU64,
    tier1_misses: AtomicU64,
    tier2_hits: AtomicU64,
    tier2_misses: AtomicU64,
    computes: AtomicU64,
    promotions: AtomicU64,
    evictions: AtomicU64,
}

macro_rules! counter {
    ($record:ident, $field:ident) => {
        #[inline]
        pub fn $record(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_tier1_hit, tier1_hits);
    counter!(record_tier1_miss, tier1_misses);
    counter!(record_tier2_hit, tier2_hits);
    counter!(record_tier2_miss, tier2_misses);
    counter!(record_compute, computes);
    counter!(record_promotion, promotions);
    counter!(record_eviction, evictions);

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tier1_hits: self.tier1_hits.load(Ordering::Relaxed),
            tier1_misses: self.tier1_misses.load(Ordering::Relaxed),
            tier2_hits: self.tier2_hits.load(Ordering::Relaxed),
            tier2_misses: self.tier2_misses.load(Ordering::Relaxed),
            computes: self.computes.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.tier1_hits,
            &self.tier1_misses,
            &self.tier2_hits,
            &self.tier2_misses,
            &self.computes,
            &self.promotions,
            &self.evictions,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Point-in-time copy of [`CacheMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub tier1_hits: u64,
    pub tier1_misses: u64,
    pub tier2_hits: u64,
    pub tier2_misses: u64,
    pub computes: u64,
    pub promotions: u64,
    pub evictions: u64,
}

impl MetricsSnapshot {
    /// Derives hit rates; each is 0.0 when its denominator is 0.
    pub fn hit_rates(&self) -> HitRates {
        let tier1_total = self.tier1_hits + self.tier1_misses;
        let tier2_total = self.tier2_hits + self.tier2_misses;
        HitRates {
            tier1: ratio(self.tier1_hits, tier1_total),
            tier2: ratio(self.tier2_hits, tier2_total),
            overall: ratio(
                self.tier1_hits + self.tier2_hits,
                tier1_total + tier2_total,
            ),
        }
    }
}

/// Hit rates in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct HitRates {
    pub tier1: f64,
    pub tier2: f64,
    pub overall: f64,
}

#[inline]
fn ratio(hits: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        hits as f64 / total as f64
    }
}

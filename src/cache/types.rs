use crate::constants::{stale, ttl};

/// Where a value was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// In-process tier.
    Memory = 1,
    /// Remote tier.
    Distributed = 2,
    /// Neither tier; produced by the compute function.
    Computed = 3,
}

impl CacheTier {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTier::Memory => "HIT_MEMORY",
            CacheTier::Distributed => "HIT_DISTRIBUTED",
            CacheTier::Computed => "COMPUTED",
        }
    }

    /// Numeric tier (1, 2, or 3).
    #[inline]
    pub fn level(&self) -> u8 {
        *self as u8
    }

    #[inline]
    pub fn is_hit(&self) -> bool {
        !matches!(self, CacheTier::Computed)
    }
}

impl std::fmt::Display for CacheTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Write options for tier 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOptions {
    /// Total lifetime in seconds.
    pub ttl: u64,
    /// Seconds before expiry during which the entry is served stale (0 = off).
    pub stale_window: u64,
    /// Invalidation groups.
    pub tags: Vec<String>,
    /// Schema marker stored alongside the value.
    pub version: Option<String>,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self {
            ttl: ttl::MEDIUM,
            stale_window: 0,
            tags: Vec::new(),
            version: None,
        }
    }
}

impl SetOptions {
    pub fn with_ttl(ttl: u64) -> Self {
        Self {
            ttl,
            ..Default::default()
        }
    }

    /// `ttl` with a stale window; the common SWR setup.
    pub fn swr(ttl: u64, stale_window: u64) -> Self {
        Self {
            ttl,
            stale_window,
            ..Default::default()
        }
    }

    /// Long TTL with a long stale window (profile pages).
    pub fn profile() -> Self {
        Self::swr(ttl::LONG, stale::LONG)
    }

    pub fn stale_window(mut self, secs: u64) -> Self {
        self.stale_window = secs;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Read options for tier 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetOptions {
    /// Report `is_stale` from the envelope. When `false`, hits are always fresh.
    pub check_stale: bool,
    /// Treat envelopes carrying a different version as misses.
    pub expect_version: Option<String>,
}

impl Default for GetOptions {
    fn default() -> Self {
        Self {
            check_stale: true,
            expect_version: None,
        }
    }
}

impl GetOptions {
    pub fn ignore_staleness() -> Self {
        Self {
            check_stale: false,
            ..Default::default()
        }
    }

    pub fn expect_version(mut self, version: impl Into<String>) -> Self {
        self.expect_version = Some(version.into());
        self
    }
}

/// Result of a tier-2 read.
#[derive(Debug, Clone, PartialEq)]
pub struct DistributedLookup<T> {
    pub data: Option<T>,
    pub is_stale: bool,
    pub cached: bool,
}

impl<T> DistributedLookup<T> {
    pub fn miss() -> Self {
        Self {
            data: None,
            is_stale: false,
            cached: false,
        }
    }

    pub fn hit(data: T, is_stale: bool) -> Self {
        Self {
            data: Some(data),
            is_stale,
            cached: true,
        }
    }
}

/// Result of a tier-2 `get_or_compute`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeOutcome<T> {
    pub data: T,
    /// `false` when `data` was just computed.
    pub cached: bool,
    /// The cached entry was stale; a background refresh was started.
    pub was_stale: bool,
}

/// A hit in one of the two tiers.
#[derive(Debug, Clone, PartialEq)]
pub struct TieredHit<T> {
    pub data: T,
    pub tier: CacheTier,
    pub was_stale: bool,
}

/// Result of a multi-tier `get_or_compute`.
#[derive(Debug, Clone, PartialEq)]
pub struct TieredOutcome<T> {
    pub data: T,
    pub tier: CacheTier,
    pub cached: bool,
    pub was_stale: bool,
}

impl<T> TieredOutcome<T> {
    pub(crate) fn from_hit(hit: TieredHit<T>) -> Self {
        Self {
            data: hit.data,
            tier: hit.tier,
            cached: true,
            was_stale: hit.was_stale,
        }
    }

    pub(crate) fn computed(data: T) -> Self {
        Self {
            data,
            tier: CacheTier::Computed,
            cached: false,
            was_stale: false,
        }
    }
}

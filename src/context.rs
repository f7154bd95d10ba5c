//! Process-wide cache registry.
//!
//! Build one [`CacheContext`] at startup and hand out caches from it; every
//! cache it creates shares the same remote client.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::cache::{DistributedCache, MemoryTierConfig, MultiTierCache};
use crate::config::{Config, ConfigError};
use crate::store::{RemoteCacheClient, RemoteStore, RestStore};

/// Owns the shared remote client and the default tier-1 sizing.
pub struct CacheContext<S = RestStore> {
    client: Arc<RemoteCacheClient<S>>,
    memory: MemoryTierConfig,
}

impl<S> Clone for CacheContext<S> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            memory: self.memory.clone(),
        }
    }
}

impl<S> std::fmt::Debug for CacheContext<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheContext")
            .field("client", &self.client)
            .field("memory", &self.memory)
            .finish()
    }
}

impl CacheContext<RestStore> {
    /// Loads [`Config`] from the environment and builds the context.
    ///
    /// Missing remote credentials are not an error; the context runs degraded.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::from_config(&Config::from_env()?))
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            client: Arc::new(RemoteCacheClient::from_config(config)),
            memory: MemoryTierConfig::new(config.l1_capacity, config.l1_ttl),
        }
    }
}

impl<S: RemoteStore> CacheContext<S> {
    /// Context backed by an explicit store (tests, custom backends).
    pub fn with_store(store: S) -> Self {
        Self {
            client: Arc::new(RemoteCacheClient::new(store)),
            memory: MemoryTierConfig::default(),
        }
    }

    /// Context without a remote store; caches run on tier 1 only.
    pub fn unavailable() -> Self {
        Self {
            client: Arc::new(RemoteCacheClient::unavailable()),
            memory: MemoryTierConfig::default(),
        }
    }

    /// Overrides the tier-1 sizing used by [`tiered`](Self::tiered).
    pub fn with_memory_config(mut self, memory: MemoryTierConfig) -> Self {
        self.memory = memory;
        self
    }

    pub fn memory_config(&self) -> &MemoryTierConfig {
        &self.memory
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    /// Tier-2 cache sharing this context's client.
    pub fn distributed(&self) -> DistributedCache<S> {
        DistributedCache::new(Arc::clone(&self.client))
    }

    /// Multi-tier cache for `namespace` with the default tier-1 sizing.
    pub fn tiered<T>(&self, namespace: impl Into<String>) -> MultiTierCache<T, S>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        self.tiered_with(namespace, self.memory.clone())
    }

    /// Multi-tier cache for `namespace` with explicit tier-1 sizing.
    pub fn tiered_with<T>(
        &self,
        namespace: impl Into<String>,
        memory: MemoryTierConfig,
    ) -> MultiTierCache<T, S>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        MultiTierCache::new(namespace, self.distributed(), memory)
    }

    /// `PING`s the remote store.
    pub async fn health_check(&self) -> bool {
        self.distributed().health_check().await
    }
}

//! Tier 2: namespaced envelopes in the remote store.
//!
//! [`DistributedCache`] holds no state of its own; everything lives in the
//! remote store under `namespace:key`. Every method swallows store failures
//! (logging them) and reports a miss or a no-op instead, so a broken store only
//! costs latency.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{Instrument, debug, error, info_span, instrument, warn};

use super::envelope::Envelope;
use super::types::{ComputeOutcome, DistributedLookup, GetOptions, SetOptions};
use crate::constants::{
    TAG_INDEX_GRACE_SECS, TAG_KEY_PREFIX, namespace_pattern, namespaced_key, tag_index_key,
};
use crate::store::{Command, ExpireCondition, RemoteCacheClient, RemoteStore, RestStore};

const DELETE_CHUNK: usize = 500;

/// Outcome of a tag invalidation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invalidation {
    /// Member keys the store actually deleted.
    pub deleted: usize,
    /// Fully-qualified keys listed under the tag.
    pub keys: Vec<String>,
}

/// Stateless façade over a [`RemoteCacheClient`]; clones share the client.
pub struct DistributedCache<S = RestStore> {
    client: Arc<RemoteCacheClient<S>>,
}

impl<S> Clone for DistributedCache<S> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<S> std::fmt::Debug for DistributedCache<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributedCache")
            .field("client", &self.client)
            .finish()
    }
}

impl<S: RemoteStore> DistributedCache<S> {
    pub fn new(client: Arc<RemoteCacheClient<S>>) -> Self {
        Self { client }
    }

    /// Convenience constructor owning `store`.
    pub fn with_store(store: S) -> Self {
        Self::new(Arc::new(RemoteCacheClient::new(store)))
    }

    /// A cache with no remote store; every read misses, every write is dropped.
    pub fn unavailable() -> Self {
        Self::new(Arc::new(RemoteCacheClient::unavailable()))
    }

    pub fn client(&self) -> &RemoteCacheClient<S> {
        &self.client
    }

    pub fn is_available(&self) -> bool {
        self.client.is_available()
    }

    /// Reads and decodes `namespace:key`.
    #[instrument(skip(self, options), fields(backend = self.client.backend_name()))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        namespace: &str,
        key: &str,
        options: &GetOptions,
    ) -> DistributedLookup<T> {
        let full_key = namespaced_key(namespace, key);
        match self.client.get(&full_key).await {
            Ok(Some(raw)) => decode(namespace, key, &raw, options),
            Ok(None) => {
                debug!("Distributed cache miss");
                DistributedLookup::miss()
            }
            Err(e) => {
                warn!(namespace, key, error = %e, "Distributed cache read failed");
                DistributedLookup::miss()
            }
        }
    }

    /// Writes `data` under `namespace:key` and indexes it under its tags.
    ///
    /// Returns `true` when the entry itself was stored. Tag index failures are
    /// logged but do not fail the write.
    #[instrument(skip(self, data, options), fields(ttl = options.ttl, tags = options.tags.len()))]
    pub async fn set<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        data: &T,
        options: &SetOptions,
    ) -> bool {
        if !self.client.is_available() {
            return false;
        }

        let Some(commands) = entry_commands(namespace, key, data, options) else {
            return false;
        };

        if commands.len() == 1 {
            let Some(Command::Set { key, value, ttl_secs }) = commands.into_iter().next() else {
                return false;
            };
            return match self.client.set(&key, value, ttl_secs).await {
                Ok(stored) => stored,
                Err(e) => {
                    warn!(namespace, key = %key, error = %e, "Distributed cache write failed");
                    false
                }
            };
        }

        match self.client.pipeline(commands).await {
            Ok(results) => results.first().is_some_and(|r| r.is_ok()),
            Err(e) => {
                warn!(namespace, key, error = %e, "Distributed cache write failed");
                false
            }
        }
    }

    /// Deletes `namespace:key`; `true` if it existed.
    pub async fn delete(&self, namespace: &str, key: &str) -> bool {
        let full_key = namespaced_key(namespace, key);
        match self.client.del(vec![full_key]).await {
            Ok(deleted) => deleted > 0,
            Err(e) => {
                warn!(namespace, key, error = %e, "Distributed cache delete failed");
                false
            }
        }
    }

    pub async fn exists(&self, namespace: &str, key: &str) -> bool {
        let full_key = namespaced_key(namespace, key);
        match self.client.exists(&full_key).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(namespace, key, error = %e, "Distributed cache exists check failed");
                false
            }
        }
    }

    /// Deletes every key indexed under `tag` and the index itself.
    ///
    /// Returns the number of tagged keys deleted; 0 for an unknown tag.
    pub async fn invalidate_by_tag(&self, tag: &str) -> usize {
        self.invalidate_by_tag_keys(tag).await.deleted
    }

    /// Like [`invalidate_by_tag`](Self::invalidate_by_tag), also returning the
    /// keys that were listed under the tag.
    #[instrument(skip(self))]
    pub async fn invalidate_by_tag_keys(&self, tag: &str) -> Invalidation {
        let index_key = tag_index_key(tag);
        let keys = match self.client.smembers(&index_key).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(tag, error = %e, "Failed to read tag index");
                return Invalidation::default();
            }
        };

        if keys.is_empty() {
            debug!("Tag index empty or absent");
            return Invalidation::default();
        }

        // The index goes only once its members are gone, so a failed delete
        // can be retried through the same tag.
        let deleted = match self.client.del(keys.clone()).await {
            Ok(n) => n as usize,
            Err(e) => {
                warn!(tag, error = %e, "Failed to delete tagged keys; keeping tag index");
                return Invalidation::default();
            }
        };

        if let Err(e) = self.client.del(vec![index_key]).await {
            warn!(tag, error = %e, "Failed to delete tag index");
        }

        debug!(deleted, listed = keys.len(), "Tag invalidated");
        Invalidation { deleted, keys }
    }

    /// Deletes every key under `namespace:*`, returning how many were removed.
    #[instrument(skip(self))]
    pub async fn clear_namespace(&self, namespace: &str) -> usize {
        if namespace == TAG_KEY_PREFIX {
            warn!(namespace, "Refusing to clear the tag index namespace");
            return 0;
        }

        let pattern = namespace_pattern(namespace);
        let keys = match self.client.scan_match(&pattern).await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(namespace, error = %e, "Failed to list namespace keys");
                return 0;
            }
        };

        let mut deleted = 0usize;
        for chunk in keys.chunks(DELETE_CHUNK) {
            match self.client.del(chunk.to_vec()).await {
                Ok(n) => deleted += n as usize,
                Err(e) => {
                    warn!(namespace, error = %e, deleted, "Namespace clear interrupted");
                    break;
                }
            }
        }

        debug!(deleted, "Namespace cleared");
        deleted
    }

    /// Reads several keys in one round trip.
    ///
    /// Every requested key appears in the result, in request order, with
    /// `None` for misses and undecodable entries.
    #[instrument(skip(self, keys), fields(count = keys.len()))]
    pub async fn batch_get<T, K>(&self, namespace: &str, keys: &[K]) -> Vec<(String, Option<T>)>
    where
        T: DeserializeOwned,
        K: AsRef<str>,
    {
        let commands: Vec<Command> = keys
            .iter()
            .map(|k| Command::Get {
                key: namespaced_key(namespace, k.as_ref()),
            })
            .collect();

        let mut replies = match self.client.pipeline(commands).await {
            Ok(replies) => replies.into_iter(),
            Err(e) => {
                warn!(namespace, error = %e, "Distributed batch read failed");
                Vec::new().into_iter()
            }
        };

        let options = GetOptions::ignore_staleness();
        keys.iter()
            .map(|k| {
                let key = k.as_ref();
                let data = match replies.next() {
                    Some(Ok(reply)) => match reply.into_opt_string() {
                        Ok(Some(raw)) => decode::<T>(namespace, key, &raw, &options).data,
                        Ok(None) => None,
                        Err(e) => {
                            warn!(namespace, key, error = %e, "Unexpected batch reply");
                            None
                        }
                    },
                    _ => None,
                };
                (key.to_string(), data)
            })
            .collect()
    }

    /// Writes several entries (and their tag indices) in one round trip.
    ///
    /// Returns `true` when every entry was stored.
    #[instrument(skip(self, entries, options), fields(count = entries.len()))]
    pub async fn batch_set<T: Serialize>(
        &self,
        namespace: &str,
        entries: &[(String, T)],
        options: &SetOptions,
    ) -> bool {
        if !self.client.is_available() || entries.is_empty() {
            return false;
        }

        let mut commands = Vec::new();
        let mut set_slots = Vec::with_capacity(entries.len());
        for (key, data) in entries {
            let Some(entry) = entry_commands(namespace, key, data, options) else {
                return false;
            };
            set_slots.push(commands.len());
            commands.extend(entry);
        }

        match self.client.pipeline(commands).await {
            Ok(results) => set_slots
                .iter()
                .all(|slot| results.get(*slot).is_some_and(|r| r.is_ok())),
            Err(e) => {
                warn!(namespace, error = %e, "Distributed batch write failed");
                false
            }
        }
    }

    /// Returns the cached value, computing and caching it on a miss.
    ///
    /// A stale hit is returned immediately and `compute` runs in a detached
    /// task that rewrites the entry; that task's failures are only logged. On
    /// a miss `compute` runs inline and its error is returned.
    #[instrument(skip(self, compute, options))]
    pub async fn get_or_compute<T, F, Fut, E>(
        &self,
        namespace: &str,
        key: &str,
        compute: F,
        options: SetOptions,
    ) -> Result<ComputeOutcome<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let lookup = self
            .get::<T>(namespace, key, &GetOptions::default())
            .await;

        if let Some(data) = lookup.data {
            if lookup.is_stale {
                self.spawn_refresh(namespace, key, compute, options);
            }
            return Ok(ComputeOutcome {
                data,
                cached: true,
                was_stale: lookup.is_stale,
            });
        }

        let data = compute().await?;
        self.set(namespace, key, &data, &options).await;

        Ok(ComputeOutcome {
            data,
            cached: false,
            was_stale: false,
        })
    }

    /// Runs `compute` in a detached task and rewrites the entry on success.
    fn spawn_refresh<T, F, Fut, E>(&self, namespace: &str, key: &str, compute: F, options: SetOptions)
    where
        T: Serialize + Send + Sync + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        E: std::fmt::Display + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(namespace, key, "No async runtime; skipping background refresh");
            return;
        };

        let cache = self.clone();
        let namespace = namespace.to_string();
        let key = key.to_string();
        let span = info_span!("swr_refresh", namespace = %namespace, key = %key);

        runtime.spawn(
            async move {
                let refreshed = AssertUnwindSafe(async move { compute().await })
                    .catch_unwind()
                    .await;

                match refreshed {
                    Ok(Ok(data)) => {
                        if cache.set(&namespace, &key, &data, &options).await {
                            debug!("Background refresh stored");
                        }
                    }
                    Ok(Err(e)) => warn!(error = %e, "Background refresh failed"),
                    Err(_) => error!("Background refresh panicked"),
                }
            }
            .instrument(span),
        );
    }

    /// `PING`s the store. `false` when unavailable or unreachable.
    pub async fn health_check(&self) -> bool {
        match self.client.ping().await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(error = %e, "Distributed cache health check failed");
                false
            }
        }
    }
}

fn decode<T: DeserializeOwned>(
    namespace: &str,
    key: &str,
    raw: &str,
    options: &GetOptions,
) -> DistributedLookup<T> {
    let envelope: Envelope<T> = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(namespace, key, error = %e, "Discarding undecodable cache entry");
            return DistributedLookup::miss();
        }
    };

    if let Some(expected) = options.expect_version.as_deref()
        && envelope.version.as_deref() != Some(expected)
    {
        debug!(
            namespace,
            key,
            expected,
            found = envelope.version.as_deref(),
            "Cache entry version mismatch"
        );
        return DistributedLookup::miss();
    }

    let is_stale = options.check_stale && envelope.is_stale();
    DistributedLookup::hit(envelope.data, is_stale)
}

/// `SET` plus, per tag, `SADD` and the two conditional `EXPIRE`s that keep the
/// index alive at least `ttl + grace` without ever shortening it.
fn entry_commands<T: Serialize>(
    namespace: &str,
    key: &str,
    data: &T,
    options: &SetOptions,
) -> Option<Vec<Command>> {
    if options.ttl == 0 {
        warn!(namespace, key, "Refusing to cache with a zero TTL");
        return None;
    }

    let full_key = namespaced_key(namespace, key);
    let envelope = Envelope::now(data, options.ttl, options.stale_window)
        .with_tags(options.tags.clone())
        .with_version(options.version.clone());

    let value = match serde_json::to_string(&envelope) {
        Ok(value) => value,
        Err(e) => {
            warn!(namespace, key, error = %e, "Failed to encode cache entry");
            return None;
        }
    };

    let index_ttl = options.ttl.saturating_add(TAG_INDEX_GRACE_SECS);
    let mut commands = Vec::with_capacity(1 + options.tags.len() * 3);
    commands.push(Command::Set {
        key: full_key.clone(),
        value,
        ttl_secs: options.ttl,
    });

    for tag in &options.tags {
        let index_key = tag_index_key(tag);
        commands.push(Command::SAdd {
            key: index_key.clone(),
            members: vec![full_key.clone()],
        });
        commands.push(Command::Expire {
            key: index_key.clone(),
            secs: index_ttl,
            condition: Some(ExpireCondition::IfNone),
        });
        commands.push(Command::Expire {
            key: index_key,
            secs: index_ttl,
            condition: Some(ExpireCondition::IfGreater),
        });
    }

    Some(commands)
}

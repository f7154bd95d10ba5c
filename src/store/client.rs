//! Typed command helpers with degraded-mode handling.

use tracing::{info, warn};

use super::RemoteStore;
use super::command::{Command, ExpireCondition, Reply};
use super::error::StoreResult;
use super::rest::RestStore;
use crate::config::Config;

const SCAN_PAGE_SIZE: u64 = 100;

/// Remote store client that may be unconfigured.
///
/// When built without a store every operation succeeds as a no-op and reports
/// the "not cached" value: `None` for reads, `false`/`0` for writes, empty
/// collections for listings.
pub struct RemoteCacheClient<S = RestStore> {
    store: Option<S>,
}

impl RemoteCacheClient<RestStore> {
    /// Builds a REST client from `config`, or an unavailable client when the
    /// remote URL/token are absent or the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Self {
        let Some(remote) = config.remote.as_ref() else {
            return Self::unavailable();
        };

        match RestStore::new(
            &remote.url,
            &remote.token,
            config.request_timeout,
            config.request_retries,
        ) {
            Ok(store) => {
                info!(url = %store.url(), "Remote cache client ready");
                Self::new(store)
            }
            Err(e) => {
                warn!(error = %e, "Failed to build remote cache client");
                Self::unavailable()
            }
        }
    }
}

impl<S: RemoteStore> RemoteCacheClient<S> {
    pub fn new(store: S) -> Self {
        Self { store: Some(store) }
    }

    /// A client with no backing store. Logs once, here.
    pub fn unavailable() -> Self {
        warn!("Remote cache not configured; tier 2 disabled");
        Self { store: None }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    /// Returns the backing store, if any.
    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }

    /// Backend name for log fields (`"unavailable"` when unconfigured).
    pub fn backend_name(&self) -> &'static str {
        self.store.as_ref().map_or("unavailable", |s| s.name())
    }

    pub async fn execute(&self, command: Command) -> StoreResult<Option<Reply>> {
        match &self.store {
            Some(store) => store.execute(command).await.map(Some),
            None => Ok(None),
        }
    }

    /// Runs `commands` in one round trip.
    ///
    /// Failed slots are logged and kept; an unavailable client returns an empty
    /// vector.
    pub async fn pipeline(&self, commands: Vec<Command>) -> StoreResult<Vec<StoreResult<Reply>>> {
        let Some(store) = &self.store else {
            return Ok(Vec::new());
        };
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        let names: Vec<&'static str> = commands.iter().map(Command::name).collect();
        let results = store.pipeline(commands).await?;

        for (index, (name, result)) in names.iter().zip(&results).enumerate() {
            if let Err(e) = result {
                warn!(index, command = name, error = %e, "Pipelined command failed");
            }
        }

        Ok(results)
    }

    pub async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        match self.execute(Command::Get { key: key.to_string() }).await? {
            Some(reply) => reply.into_opt_string(),
            None => Ok(None),
        }
    }

    /// Overwrites `key` with `value`, expiring after `ttl_secs`.
    pub async fn set(&self, key: &str, value: String, ttl_secs: u64) -> StoreResult<bool> {
        let reply = self
            .execute(Command::Set {
                key: key.to_string(),
                value,
                ttl_secs,
            })
            .await?;
        Ok(reply.is_some())
    }

    /// Deletes `keys`, returning how many existed.
    pub async fn del(&self, keys: Vec<String>) -> StoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        match self.execute(Command::Del { keys }).await? {
            Some(reply) => Ok(reply.into_int()?.max(0) as u64),
            None => Ok(0),
        }
    }

    pub async fn exists(&self, key: &str) -> StoreResult<bool> {
        match self.execute(Command::Exists { key: key.to_string() }).await? {
            Some(reply) => Ok(reply.into_int()? > 0),
            None => Ok(false),
        }
    }

    pub async fn sadd(&self, key: &str, members: Vec<String>) -> StoreResult<u64> {
        match self
            .execute(Command::SAdd {
                key: key.to_string(),
                members,
            })
            .await?
        {
            Some(reply) => Ok(reply.into_int()?.max(0) as u64),
            None => Ok(0),
        }
    }

    pub async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        match self
            .execute(Command::SMembers { key: key.to_string() })
            .await?
        {
            Some(reply) => reply.into_string_vec(),
            None => Ok(Vec::new()),
        }
    }

    pub async fn expire(
        &self,
        key: &str,
        secs: u64,
        condition: Option<ExpireCondition>,
    ) -> StoreResult<bool> {
        match self
            .execute(Command::Expire {
                key: key.to_string(),
                secs,
                condition,
            })
            .await?
        {
            Some(reply) => Ok(reply.into_int()? > 0),
            None => Ok(false),
        }
    }

    /// Collects every key matching `pattern` by walking the `SCAN` cursor.
    pub async fn scan_match(&self, pattern: &str) -> StoreResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut cursor = 0u64;
        loop {
            let Some(reply) = self
                .execute(Command::Scan {
                    cursor,
                    pattern: pattern.to_string(),
                    count: SCAN_PAGE_SIZE,
                })
                .await?
            else {
                return Ok(keys);
            };

            let (next, page) = reply.into_scan_page()?;
            keys.extend(page);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    /// `PING`; `false` when unavailable.
    pub async fn ping(&self) -> StoreResult<bool> {
        Ok(self.execute(Command::Ping).await?.is_some())
    }
}

impl<S> std::fmt::Debug for RemoteCacheClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCacheClient")
            .field("available", &self.store.is_some())
            .finish()
    }
}

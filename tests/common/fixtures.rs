//! Test fixtures for integration tests.

use docket::{CacheContext, Envelope, MemoryStore, MemoryTierConfig, MultiTierCache};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const JUDGE_ID: u32 = 42;

pub const COURT_ID: &str = "ca9";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeProfile {
    pub id: u32,
    pub name: String,
    pub court: String,
    pub decisions: u32,
}

#[derive(Default)]
pub struct JudgeProfileBuilder {
    id: Option<u32>,
    name: Option<String>,
    court: Option<String>,
    decisions: Option<u32>,
}

impl JudgeProfileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: u32) -> Self {
        self.id = Some(id);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn court(mut self, court: impl Into<String>) -> Self {
        self.court = Some(court.into());
        self
    }

    pub fn decisions(mut self, decisions: u32) -> Self {
        self.decisions = Some(decisions);
        self
    }

    pub fn build(self) -> JudgeProfile {
        let id = self.id.unwrap_or(JUDGE_ID);
        JudgeProfile {
            id,
            name: self.name.unwrap_or_else(|| format!("Judge {id}")),
            court: self.court.unwrap_or_else(|| COURT_ID.to_string()),
            decisions: self.decisions.unwrap_or(0),
        }
    }
}

pub fn profile(id: u32) -> JudgeProfile {
    JudgeProfileBuilder::new().id(id).build()
}

/// Context over a fresh in-memory store, plus a handle for inspecting it.
pub fn mock_context() -> (CacheContext<MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    (CacheContext::with_store(store.clone()), store)
}

pub fn small_tiered(
    context: &CacheContext<MemoryStore>,
    namespace: &str,
    max_size: u64,
) -> MultiTierCache<JudgeProfile, MemoryStore> {
    context.tiered_with(
        namespace,
        MemoryTierConfig::new(max_size, Duration::from_secs(60)),
    )
}

/// Stores an envelope written `age_ms` ago, bypassing the cache API.
pub fn insert_aged_entry(
    store: &MemoryStore,
    full_key: &str,
    data: &JudgeProfile,
    age_ms: i64,
    ttl: u64,
    stale_window: u64,
) {
    let envelope = Envelope::new(data, docket::cache::now_millis() - age_ms, ttl, stale_window);
    let raw = serde_json::to_string(&envelope).expect("envelope serializes");
    store.insert_raw(full_key, &raw);
}

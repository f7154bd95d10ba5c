//! In-memory Redis subset used by tests and the `mock` feature.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use super::RemoteStore;
use super::command::{Command, ExpireCondition, Reply};
use super::error::{StoreError, StoreResult};

#[derive(Debug, Clone)]
enum Data {
    Str(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Slot {
    data: Data,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Default)]
struct Shared {
    slots: Mutex<HashMap<String, Slot>>,
    failing: Mutex<HashSet<&'static str>>,
    offline: AtomicBool,
    round_trips: AtomicU64,
}

/// Cloneable in-memory store with native expiry and fault injection.
///
/// Clones share state, so a test can keep one handle for inspection while the
/// cache owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `execute`/`pipeline` calls served so far.
    pub fn round_trips(&self) -> u64 {
        self.shared.round_trips.load(Ordering::Relaxed)
    }

    /// Makes every round trip fail with a transport error while `offline`.
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::Relaxed);
    }

    /// Makes every command named `name` (e.g. `"GET"`) fail until cleared.
    pub fn fail_command(&self, name: &'static str) {
        self.shared.failing.lock().insert(name);
    }

    pub fn clear_failures(&self) {
        self.shared.failing.lock().clear();
    }

    /// Stores a raw string without expiry, bypassing the envelope format.
    pub fn insert_raw(&self, key: &str, value: &str) {
        self.shared.slots.lock().insert(
            key.to_string(),
            Slot {
                data: Data::Str(value.to_string()),
                expires_at: None,
            },
        );
    }

    /// Returns the raw string at `key` if present and not expired.
    pub fn raw(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        match self.shared.slots.lock().get(key) {
            Some(slot) if slot.is_live(now) => match &slot.data {
                Data::Str(s) => Some(s.clone()),
                Data::Set(_) => None,
            },
            _ => None,
        }
    }

    /// Remaining time to live of `key`, if it has one.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.shared
            .slots
            .lock()
            .get(key)
            .filter(|slot| slot.is_live(now))
            .and_then(|slot| slot.expires_at)
            .map(|at| at.saturating_duration_since(now))
    }

    /// Number of live keys.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.shared
            .slots
            .lock()
            .values()
            .filter(|slot| slot.is_live(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.shared.offline.load(Ordering::Relaxed) {
            return Err(StoreError::Http {
                url: "memory://".to_string(),
                message: "store offline".to_string(),
            });
        }
        Ok(())
    }

    fn apply(&self, command: Command) -> StoreResult<Reply> {
        if self.shared.failing.lock().contains(command.name()) {
            return Err(StoreError::Command {
                command: command.name(),
                message: "injected failure".to_string(),
            });
        }

        let now = Instant::now();
        let mut slots = self.shared.slots.lock();
        slots.retain(|_, slot| slot.is_live(now));

        let reply = match command {
            Command::Get { key } => match slots.get(&key) {
                Some(Slot {
                    data: Data::Str(s), ..
                }) => Reply::Bulk(s.clone()),
                Some(_) => return Err(wrong_type("GET")),
                None => Reply::Nil,
            },
            Command::Set {
                key,
                value,
                ttl_secs,
            } => {
                slots.insert(
                    key,
                    Slot {
                        data: Data::Str(value),
                        expires_at: Some(now + Duration::from_secs(ttl_secs)),
                    },
                );
                Reply::Status("OK".to_string())
            }
            Command::Del { keys } => {
                let removed = keys
                    .iter()
                    .filter(|k| slots.remove(k.as_str()).is_some())
                    .count();
                Reply::Int(removed as i64)
            }
            Command::Exists { key } => Reply::Int(i64::from(slots.contains_key(&key))),
            Command::SAdd { key, members } => {
                let slot = slots.entry(key).or_insert_with(|| Slot {
                    data: Data::Set(BTreeSet::new()),
                    expires_at: None,
                });
                let Data::Set(set) = &mut slot.data else {
                    return Err(wrong_type("SADD"));
                };
                let added = members.into_iter().filter(|m| set.insert(m.clone())).count();
                Reply::Int(added as i64)
            }
            Command::SMembers { key } => match slots.get(&key) {
                Some(Slot {
                    data: Data::Set(set),
                    ..
                }) => Reply::Array(set.iter().cloned().map(Reply::Bulk).collect()),
                Some(_) => return Err(wrong_type("SMEMBERS")),
                None => Reply::Array(Vec::new()),
            },
            Command::Expire {
                key,
                secs,
                condition,
            } => {
                let Some(slot) = slots.get_mut(&key) else {
                    return Ok(Reply::Int(0));
                };
                let new_at = now + Duration::from_secs(secs);
                let apply = match (condition, slot.expires_at) {
                    (None, _) => true,
                    (Some(ExpireCondition::IfNone), current) => current.is_none(),
                    // A key without expiry counts as infinite for GT.
                    (Some(ExpireCondition::IfGreater), None) => false,
                    (Some(ExpireCondition::IfGreater), Some(current)) => new_at > current,
                };
                if apply {
                    slot.expires_at = Some(new_at);
                }
                Reply::Int(i64::from(apply))
            }
            Command::Scan { pattern, .. } => {
                let mut keys: Vec<String> = slots
                    .keys()
                    .filter(|k| glob_match(&pattern, k))
                    .cloned()
                    .collect();
                keys.sort();
                Reply::Array(vec![
                    Reply::Bulk("0".to_string()),
                    Reply::Array(keys.into_iter().map(Reply::Bulk).collect()),
                ])
            }
            Command::Ping => Reply::Status("PONG".to_string()),
        };

        Ok(reply)
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("keys", &self.len())
            .field("round_trips", &self.round_trips())
            .finish()
    }
}

fn wrong_type(command: &'static str) -> StoreError {
    StoreError::Command {
        command,
        message: "WRONGTYPE Operation against a key holding the wrong kind of value".to_string(),
    }
}

/// Redis-style glob supporting `*`, `?` and backslash escapes.
fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        let escaped = pi + 1 < p.len() && p[pi] == '\\';
        if escaped && p[pi + 1] == t[ti] {
            pi += 2;
            ti += 1;
        } else if !escaped && pi < p.len() && (p[pi] == '?' || (p[pi] != '*' && p[pi] == t[ti])) {
            pi += 1;
            ti += 1;
        } else if !escaped && pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star_pi, star_ti)) = backtrack {
            pi = star_pi + 1;
            ti = star_ti + 1;
            backtrack = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|c| *c == '*')
}

impl RemoteStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn execute(&self, command: Command) -> StoreResult<Reply> {
        self.shared.round_trips.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        self.apply(command)
    }

    async fn pipeline(&self, commands: Vec<Command>) -> StoreResult<Vec<StoreResult<Reply>>> {
        self.shared.round_trips.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        Ok(commands.into_iter().map(|c| self.apply(c)).collect())
    }
}

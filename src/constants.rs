//! Shared cache presets.
//!
//! Callers pick a TTL and a stale window from these presets instead of
//! inventing per-call numbers. All values are seconds.

/// Time-to-live presets.
pub mod ttl {
    pub const SHORT: u64 = 60;
    pub const MEDIUM: u64 = 300;
    pub const LONG: u64 = 3_600;
    pub const DAY: u64 = 86_400;
    pub const WEEK: u64 = 604_800;
}

/// Stale-window presets: how long before expiry an entry is served as stale.
pub mod stale {
    pub const SHORT: u64 = 30;
    pub const MEDIUM: u64 = 120;
    pub const LONG: u64 = 600;
}

/// Extra lifetime given to a tag index beyond the TTL of the entry that
/// last extended it.
pub const TAG_INDEX_GRACE_SECS: u64 = 300;

/// Prefix of tag index keys (`tag:<tag>`).
pub const TAG_KEY_PREFIX: &str = "tag";

/// Separator between namespace and key.
pub const KEY_SEPARATOR: char = ':';

pub const DEFAULT_L1_CAPACITY: u64 = 1_000;
pub const DEFAULT_L1_TTL_SECS: u64 = ttl::MEDIUM;

/// Builds the fully-qualified remote key `namespace:key`.
#[inline]
pub fn namespaced_key(namespace: &str, key: &str) -> String {
    format!("{namespace}{KEY_SEPARATOR}{key}")
}

/// Builds the tag index key `tag:<tag>`.
#[inline]
pub fn tag_index_key(tag: &str) -> String {
    format!("{TAG_KEY_PREFIX}{KEY_SEPARATOR}{tag}")
}

/// Escapes Redis glob metacharacters (`*`, `?`, `[`, `]` and backslash) in `literal`.
pub fn escape_glob(literal: &str) -> String {
    let mut escaped = String::with_capacity(literal.len());
    for c in literal.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `SCAN MATCH` pattern covering exactly the keys of `namespace`.
#[inline]
pub fn namespace_pattern(namespace: &str) -> String {
    format!("{}{KEY_SEPARATOR}*", escape_glob(namespace))
}

/// Strips `namespace:` from a fully-qualified key, if it belongs to `namespace`.
#[inline]
pub fn strip_namespace<'a>(namespace: &str, full_key: &'a str) -> Option<&'a str> {
    full_key
        .strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix(KEY_SEPARATOR))
}

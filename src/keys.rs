//! Namespaces, tag names and derived keys used by the data-access layer.

use blake3::Hasher;

/// Cache namespaces (the `<namespace>` part of `<namespace>:<key>`).
pub mod namespace {
    pub const JUDGES: &str = "judges";
    pub const COURTS: &str = "courts";
    pub const CASES: &str = "cases";
    pub const DECISIONS: &str = "decisions";
    pub const SEARCH: &str = "search";
    pub const ANALYTICS: &str = "analytics";
}

/// Hex characters kept from the BLAKE3 digest in [`search_key`].
pub const SEARCH_KEY_LEN: usize = 16;

/// Tag shared by every entry derived from judge `id`.
#[inline]
pub fn judge_tag(id: impl std::fmt::Display) -> String {
    format!("judge:{id}")
}

/// Tag shared by every entry derived from court `id`.
#[inline]
pub fn court_tag(id: impl std::fmt::Display) -> String {
    format!("court:{id}")
}

/// Lowercases `query` and collapses runs of whitespace.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Derives a short, stable key for a search request.
///
/// The query is normalized first and filters are sorted, so equivalent
/// requests share a key regardless of casing, spacing or filter order.
pub fn search_key(query: &str, filters: &[(&str, &str)]) -> String {
    let mut sorted = filters.to_vec();
    sorted.sort_unstable();

    let mut hasher = Hasher::new();
    hasher.update(normalize_query(query).as_bytes());
    for (name, value) in sorted {
        hasher.update(b"\0");
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
    }

    let mut key = hasher.finalize().to_hex().to_string();
    key.truncate(SEARCH_KEY_LEN);
    key
}

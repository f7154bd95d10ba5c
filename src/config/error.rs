//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric variable could not be parsed.
    #[error("failed to parse {name}='{value}': {source}")]
    InvalidNumber {
        name: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },

    /// A value parsed but is outside its allowed range.
    #[error("invalid {name}: {reason}")]
    OutOfRange {
        name: &'static str,
        reason: &'static str,
    },

    /// The remote store URL is not an http(s) URL.
    #[error("invalid remote cache URL '{value}': expected http:// or https://")]
    InvalidUrl { value: String },
}

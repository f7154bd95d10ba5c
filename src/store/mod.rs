//! Remote key/value store access (tier 2 transport).
//!
//! [`RemoteStore`] is the pluggable seam: [`RestStore`] speaks the Upstash REST
//! protocol, [`MemoryStore`] is an in-memory Redis subset for tests. Callers
//! go through [`RemoteCacheClient`], which degrades to no-ops when no store is
//! configured.

pub mod client;
pub mod command;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod rest;


pub use client::RemoteCacheClient;
pub use command::{Command, ExpireCondition, Reply};
pub use error::{StoreError, StoreResult};
#[cfg(any(test, feature = "mock"))]
pub use memory::MemoryStore;
pub use rest::RestStore;

/// A Redis-compatible store reachable asynchronously.
pub trait RemoteStore: Send + Sync + 'static {
    /// Short backend name used in log fields.
    fn name(&self) -> &'static str;

    /// Executes a single command.
    fn execute(
        &self,
        command: Command,
    ) -> impl std::future::Future<Output = StoreResult<Reply>> + Send;

    /// Executes `commands` in one round trip.
    ///
    /// The outer error means the round trip itself failed. Inner results are in
    /// request order; one failing command does not affect the others.
    fn pipeline(
        &self,
        commands: Vec<Command>,
    ) -> impl std::future::Future<Output = StoreResult<Vec<StoreResult<Reply>>>> + Send;
}

//! Backend capability consumed by the router
//!
//! Every node is bound to something implementing [`CacheBackend`]: an
//! in-memory map, a single Redis connection, or a round-robin pool of
//! equivalent clients.

pub mod memory;
pub mod pool;
pub mod redis_client;

pub use memory::MemoryBackend;
pub use pool::ClientPool;
pub use redis_client::RedisClient;

use crate::common::{OpContext, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// Operations a single node's client must provide.
///
/// Implementations must be `Send + Sync`; one instance is shared by every
/// request routed to its node. Each call receives the caller's context and
/// should bound its own I/O by `ctx.remaining()`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a value. A missing key is `Error::KeyNotFound`.
    async fn get(&self, ctx: &OpContext, key: &str) -> Result<String>;

    async fn set(&self, ctx: &OpContext, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Whether a missing key is an error is up to the backend.
    async fn delete(&self, ctx: &OpContext, key: &str) -> Result<()>;

    /// Probe liveness. Failure is usually `Error::CacheUnavailable`.
    async fn health_check(&self, ctx: &OpContext) -> Result<()>;

    /// Release connections. Further calls may fail.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Shared handle to a backend
pub type DynBackend = Arc<dyn CacheBackend>;

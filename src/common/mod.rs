//! Common utilities and types shared across shardcache

pub mod config;
pub mod context;
pub mod error;
pub mod hash;
pub mod tracing_middleware;

pub use config::{BackendKind, Config, NodeConfig, RedisConfig, RingConfig, ServerConfig};
pub use context::{CancelHandle, OpContext};
pub use error::{Error, Result};
pub use hash::{ring_hash, HashRing, SharedRing, DEFAULT_VIRTUAL_NODES};

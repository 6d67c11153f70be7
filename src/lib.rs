//! # shardcache
//!
//! A sharding and routing layer for a distributed key-value cache:
//! - Consistent hashing with virtual nodes (SHA-256 ring positions)
//! - Single-node dispatch of get/set/delete to the owning backend
//! - Cluster health that tolerates partial outages
//! - Pluggable backends: in-memory, Redis, round-robin pools
//!
//! ## Architecture
//!
//! ```text
//!            HTTP  /cache/:key  /health
//!                     │
//!          ┌──────────▼───────────┐
//!          │    CacheService      │
//!          │  validate → ring →   │
//!          │  registry → backend  │
//!          └───┬────────┬─────┬───┘
//!              │        │     │
//!        ┌─────▼──┐ ┌───▼──┐ ┌▼───────┐
//!        │ node1  │ │node2 │ │ node3  │
//!        │ (pool) │ │      │ │        │
//!        └────────┘ └──────┘ └────────┘
//! ```
//!
//! ## Usage
//!
//! ### Start a router
//! ```bash
//! shardcache-server serve \
//!   --bind 0.0.0.0:8080 \
//!   --backend redis \
//!   --node node1=redis://10.0.0.1:6379 \
//!   --node node2=redis://10.0.0.2:6379,redis://10.0.0.3:6379
//! ```
//!
//! ### Use the CLI
//! ```bash
//! shardcache set my-key my-value --server http://localhost:8080
//! shardcache get my-key
//! shardcache delete my-key
//! shardcache health
//! ```

pub mod backend;
pub mod client;
pub mod common;
pub mod router;

// Re-export commonly used types
pub use backend::{CacheBackend, DynBackend};
pub use common::{Config, Error, HashRing, OpContext, Result, SharedRing};
pub use router::{CacheServer, CacheService, NodeRegistry, ServiceConfig};

/// Current version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

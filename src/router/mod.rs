//! Key routing layer
//!
//! The router is responsible for:
//! - Consistent-hash placement of keys onto nodes
//! - Dispatching get/set/delete to the owning node's client
//! - Aggregating cluster health
//! - Serving the HTTP API

pub mod http;
pub mod registry;
pub mod server;
pub mod service;

pub use registry::NodeRegistry;
pub use server::CacheServer;
pub use service::{CacheService, HealthReport, NodeHealth, ServiceConfig};

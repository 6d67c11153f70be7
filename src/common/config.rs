//! Configuration for shardcache
//!
//! Sources, lowest priority first: built-in defaults, an optional TOML file,
//! then `SHARDCACHE__*` environment variables (`__` separates sections, e.g.
//! `SHARDCACHE__SERVER__BIND_ADDR=127.0.0.1:9000`).

use crate::common::hash::DEFAULT_VIRTUAL_NODES;
use crate::common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Environment prefix for overrides
pub const ENV_PREFIX: &str = "SHARDCACHE";

/// Global configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,

    pub ring: RingConfig,

    /// Which backend serves each node
    pub backend: BackendKind,

    pub redis: RedisConfig,

    /// Logical shards; one client (or pool) per node
    pub nodes: Vec<NodeConfig>,

    /// Logging level, used when RUST_LOG is unset
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ring: RingConfig::default(),
            backend: BackendKind::Memory,
            redis: RedisConfig::default(),
            nodes: Vec::new(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Memory,
    Redis,
}

/// HTTP adapter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address for HTTP API
    pub bind_addr: SocketAddr,

    /// Deadline for get/set/delete
    pub request_timeout_ms: u64,

    /// Deadline for cluster health checks
    pub health_timeout_ms: u64,

    /// Maximum request body size
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            request_timeout_ms: 5_000,
            health_timeout_ms: 10_000,
            max_body_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Ring positions per node
    pub virtual_nodes: usize,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
        }
    }
}

/// Redis client settings, shared by every node
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    /// Upper bound for a single command
    pub timeout_ms: u64,

    pub connect_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            connect_timeout_ms: 5_000,
        }
    }
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub name: String,

    /// Equivalent endpoints for this node, used round-robin
    #[serde(default)]
    pub urls: Vec<String>,
}

impl NodeConfig {
    pub fn new(name: impl Into<String>, urls: Vec<String>) -> Self {
        Self {
            name: name.into(),
            urls,
        }
    }

    /// Parse `name=url[,url...]`; a bare `name` has no URLs.
    pub fn parse(spec: &str) -> Result<Self> {
        let (name, urls) = match spec.split_once('=') {
            Some((name, urls)) => (
                name.trim(),
                urls.split(',')
                    .map(str::trim)
                    .filter(|u| !u.is_empty())
                    .map(String::from)
                    .collect(),
            ),
            None => (spec.trim(), Vec::new()),
        };
        if name.is_empty() {
            return Err(Error::InvalidConfig(format!("empty node name in '{}'", spec)));
        }
        Ok(Self::new(name, urls))
    }
}

impl Config {
    /// Load defaults, then `path` (if any), then environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        );

        let config: Config = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::InvalidConfig("no nodes configured".into()));
        }

        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.name.is_empty() {
                return Err(Error::InvalidConfig("node name cannot be empty".into()));
            }
            if !seen.insert(node.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate node name: {}",
                    node.name
                )));
            }
            if self.backend == BackendKind::Redis && node.urls.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "node {} has no redis URLs",
                    node.name
                )));
            }
        }

        if self.ring.virtual_nodes == 0 {
            return Err(Error::InvalidConfig(
                "ring.virtual_nodes must be positive".into(),
            ));
        }
        if self.server.request_timeout_ms == 0 || self.server.health_timeout_ms == 0 {
            return Err(Error::InvalidConfig("server timeouts must be positive".into()));
        }
        if self.backend == BackendKind::Redis
            && (self.redis.timeout_ms == 0 || self.redis.connect_timeout_ms == 0)
        {
            return Err(Error::InvalidConfig("redis timeouts must be positive".into()));
        }

        Ok(())
    }
}

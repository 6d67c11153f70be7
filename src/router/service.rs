//! Cache routing service
//!
//! Resolves each key to its owning node on the hash ring and forwards the
//! operation to that node's client. Inputs are validated before any routing,
//! routing failures are reported before any I/O, and backend errors come back
//! to the caller untouched.
//!
//! The ring is shared and may change at runtime while the client registry is
//! fixed at construction. A node added to the ring without a client therefore
//! resolves but fails with [`Error::ClientNotFound`].

use crate::backend::DynBackend;
use crate::common::{Error, HashRing, OpContext, Result, SharedRing, DEFAULT_VIRTUAL_NODES};
use crate::router::registry::NodeRegistry;
use futures_util::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::Span;

/// Construction input for [`CacheService`].
pub struct ServiceConfig {
    /// Nodes placed on the ring
    pub nodes: Vec<String>,

    /// Client per node
    pub clients: NodeRegistry,

    /// Ring positions per node
    pub virtual_nodes: usize,

    /// Parent span for every event the service emits
    pub span: Option<Span>,
}

impl ServiceConfig {
    pub fn new(nodes: Vec<String>, clients: NodeRegistry) -> Self {
        Self {
            nodes,
            clients,
            virtual_nodes: DEFAULT_VIRTUAL_NODES,
            span: None,
        }
    }

    pub fn virtual_nodes(mut self, virtual_nodes: usize) -> Self {
        self.virtual_nodes = virtual_nodes;
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// Outcome of one node's health probe.
#[derive(Debug, Clone, Serialize)]
pub struct NodeHealth {
    pub node: String,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Cluster health when at least one node answered.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub healthy: usize,
    pub total: usize,
    /// Sorted by node name
    pub nodes: Vec<NodeHealth>,
}

impl HealthReport {
    /// Some, but not all, nodes failed.
    pub fn is_degraded(&self) -> bool {
        self.healthy < self.total
    }
}

pub struct CacheService {
    ring: SharedRing,
    clients: NodeRegistry,
    span: Span,
}

impl CacheService {
    /// Build the ring from `config.nodes` and bind the registry.
    ///
    /// Fails with `InvalidConfig` when there are no nodes or no clients.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        if config.nodes.is_empty() {
            return Err(Error::InvalidConfig("no nodes provided".into()));
        }
        if config.clients.is_empty() {
            return Err(Error::InvalidConfig("no clients provided".into()));
        }
        if config.virtual_nodes == 0 {
            return Err(Error::InvalidConfig("virtual node count must be positive".into()));
        }

        let span = config
            .span
            .unwrap_or_else(|| tracing::info_span!("cache_service"));
        let ring = HashRing::from_nodes(&config.nodes, config.virtual_nodes);

        for node in ring.nodes() {
            if !config.clients.contains(&node) {
                tracing::warn!(parent: &span, %node, "node has no client bound");
            }
        }

        tracing::info!(
            parent: &span,
            node_count = ring.node_count(),
            client_count = config.clients.len(),
            virtual_nodes = config.virtual_nodes,
            "cache service created"
        );

        Ok(Self {
            ring: SharedRing::new(ring),
            clients: config.clients,
            span,
        })
    }

    /// Handle to the live ring. Membership changes made through it take
    /// effect for the next routed call; the client registry does not follow.
    pub fn ring(&self) -> &SharedRing {
        &self.ring
    }

    /// Owning node and its client for `key`.
    fn route(&self, key: &str) -> Result<(Arc<str>, &DynBackend)> {
        let node = match self.ring.get_node(key) {
            Some(node) => node,
            None => {
                tracing::error!(parent: &self.span, key, "no node available for key");
                return Err(Error::NoNodesAvailable);
            }
        };

        match self.clients.get(&node) {
            Some(client) => Ok((node, client)),
            None => {
                tracing::error!(parent: &self.span, node = %node, key, "client not found for node");
                Err(Error::ClientNotFound(node.to_string()))
            }
        }
    }

    /// Node that currently owns `key`, if any.
    pub fn node_for(&self, key: &str) -> Option<String> {
        self.ring.get_node(key).map(|n| n.to_string())
    }

    pub async fn get(&self, ctx: &OpContext, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }
        let (node, client) = self.route(key)?;

        tracing::debug!(parent: &self.span, key, node = %node, "routing get operation");
        match ctx.run(client.get(ctx, key)).await {
            Ok(value) => {
                tracing::debug!(parent: &self.span, key, node = %node, "retrieved key");
                Ok(value)
            }
            Err(e) => {
                self.log_failure("get", key, &node, &e);
                Err(e)
            }
        }
    }

    pub async fn set(&self, ctx: &OpContext, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }
        if value.is_empty() {
            return Err(Error::InvalidValue);
        }
        let (node, client) = self.route(key)?;

        tracing::debug!(parent: &self.span, key, node = %node, "routing set operation");
        if let Err(e) = ctx.run(client.set(ctx, key, value)).await {
            self.log_failure("set", key, &node, &e);
            return Err(e);
        }
        tracing::debug!(parent: &self.span, key, node = %node, "stored key");
        Ok(())
    }

    pub async fn delete(&self, ctx: &OpContext, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }
        let (node, client) = self.route(key)?;

        tracing::debug!(parent: &self.span, key, node = %node, "routing delete operation");
        if let Err(e) = ctx.run(client.delete(ctx, key)).await {
            self.log_failure("delete", key, &node, &e);
            return Err(e);
        }
        tracing::debug!(parent: &self.span, key, node = %node, "deleted key");
        Ok(())
    }

    fn log_failure(&self, op: &str, key: &str, node: &str, err: &Error) {
        match err {
            // Misses are an expected outcome, not a fault.
            Error::KeyNotFound(_) => {
                tracing::debug!(parent: &self.span, op, key, node, "key not found")
            }
            _ => {
                tracing::error!(parent: &self.span, op, key, node, error = %err, "cache operation failed")
            }
        }
    }

    /// Probe every registered client concurrently.
    ///
    /// Succeeds while at least one client is healthy. When all fail, returns
    /// `AllNodesUnhealthy` wrapping the last error observed.
    pub async fn health_check(&self, ctx: &OpContext) -> Result<HealthReport> {
        let probes = self.clients.iter().map(|(node, client)| async move {
            let res = ctx.run(client.health_check(ctx)).await;
            (node, res)
        });
        let results = join_all(probes).await;

        let total = results.len();
        let mut healthy = 0;
        let mut last_err = None;
        let mut nodes = Vec::with_capacity(total);

        for (node, res) in results {
            match res {
                Ok(()) => {
                    healthy += 1;
                    tracing::debug!(parent: &self.span, node, "health check passed");
                    nodes.push(NodeHealth {
                        node: node.to_string(),
                        healthy: true,
                        error: None,
                    });
                }
                Err(e) => {
                    tracing::error!(parent: &self.span, node, error = %e, "health check failed for client");
                    nodes.push(NodeHealth {
                        node: node.to_string(),
                        healthy: false,
                        error: Some(e.to_string()),
                    });
                    last_err = Some(e);
                }
            }
        }

        if healthy == 0 {
            tracing::error!(parent: &self.span, total, "all clients failed health check");
            let source = last_err.unwrap_or(Error::NoNodesAvailable);
            return Err(Error::AllNodesUnhealthy {
                total,
                source: Box::new(source),
            });
        }

        nodes.sort_by(|a, b| a.node.cmp(&b.node));
        tracing::info!(
            parent: &self.span,
            healthy_clients = healthy,
            total_clients = total,
            "health check completed"
        );
        Ok(HealthReport {
            healthy,
            total,
            nodes,
        })
    }

    /// Node names with a bound client, in no particular order.
    pub fn get_nodes(&self) -> Vec<String> {
        self.clients.names()
    }

    /// Close every client. Errors are logged and the first one returned.
    pub async fn close(&self) -> Result<()> {
        let mut first_err = None;
        for (node, client) in self.clients.iter() {
            if let Err(e) = client.close().await {
                tracing::warn!(parent: &self.span, node, error = %e, "failed to close client");
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

//! Round-robin pool of equivalent clients for one node

use crate::backend::{CacheBackend, DynBackend, RedisClient};
use crate::common::{Error, OpContext, RedisConfig, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Rotates requests over clients that all front the same data.
///
/// The pool is itself a [`CacheBackend`], so a node can be bound to a pool
/// exactly like to a single client.
pub struct ClientPool {
    clients: Vec<DynBackend>,
    next: AtomicUsize,
    closed: AtomicBool,
}

impl ClientPool {
    pub fn new(clients: Vec<DynBackend>) -> Result<Self> {
        if clients.is_empty() {
            return Err(Error::InvalidConfig("no clients provided for pool".into()));
        }
        Ok(Self {
            clients,
            next: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        })
    }

    /// Connect one Redis client per URL.
    ///
    /// If any connection fails, the clients already created are closed before
    /// the error is returned.
    pub async fn connect_redis(urls: &[String], config: &RedisConfig) -> Result<Self> {
        if urls.is_empty() {
            return Err(Error::InvalidConfig("no redis URLs provided".into()));
        }

        let mut clients: Vec<DynBackend> = Vec::with_capacity(urls.len());
        for url in urls {
            match RedisClient::connect(url, config.timeout(), config.connect_timeout()).await {
                Ok(client) => {
                    clients.push(Arc::new(client));
                    tracing::debug!(pool_size = clients.len(), "redis client added to pool");
                }
                Err(e) => {
                    tracing::error!(error = %e, "failed to create redis client during pool initialization");
                    for (i, client) in clients.iter().enumerate() {
                        if let Err(close_err) = client.close().await {
                            tracing::warn!(client_index = i, error = %close_err, "failed to close redis client during cleanup");
                        }
                    }
                    return Err(e);
                }
            }
        }

        tracing::info!(total_clients = clients.len(), "redis pool created");
        Self::new(clients)
    }

    /// Next client in rotation.
    pub fn next_client(&self) -> Result<DynBackend> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::PoolClosed);
        }
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.clients.len();
        Ok(self.clients[idx].clone())
    }

    pub fn size(&self) -> usize {
        self.clients.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CacheBackend for ClientPool {
    async fn get(&self, ctx: &OpContext, key: &str) -> Result<String> {
        self.next_client()?.get(ctx, key).await
    }

    async fn set(&self, ctx: &OpContext, key: &str, value: &str) -> Result<()> {
        self.next_client()?.set(ctx, key, value).await
    }

    async fn delete(&self, ctx: &OpContext, key: &str) -> Result<()> {
        self.next_client()?.delete(ctx, key).await
    }

    /// Every member must be healthy.
    async fn health_check(&self, ctx: &OpContext) -> Result<()> {
        if self.is_closed() {
            return Err(Error::PoolClosed);
        }
        for (i, client) in self.clients.iter().enumerate() {
            if let Err(e) = client.health_check(ctx).await {
                tracing::error!(client_index = i, error = %e, "pool member health check failed");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Close every member. Closing twice is a no-op.
    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        tracing::info!(client_count = self.clients.len(), "closing client pool");
        let mut errors = Vec::new();
        for (i, client) in self.clients.iter().enumerate() {
            if let Err(e) = client.close().await {
                tracing::error!(client_index = i, error = %e, "failed to close client");
                errors.push(e.to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Other(format!(
                "errors closing clients: {}",
                errors.join("; ")
            )))
        }
    }
}

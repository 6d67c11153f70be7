//! Cache router server

use crate::backend::{ClientPool, DynBackend, MemoryBackend};
use crate::common::{BackendKind, Config, Error, Result};
use crate::router::http::{create_router, AppState};
use crate::router::registry::NodeRegistry;
use crate::router::service::{CacheService, ServiceConfig};
use std::net::SocketAddr;
use std::sync::Arc;

pub struct CacheServer {
    config: Config,
}

impl CacheServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Create one client per configured node.
    ///
    /// On failure, clients created so far are closed before returning.
    pub async fn build_registry(config: &Config) -> Result<NodeRegistry> {
        let mut registry = NodeRegistry::new();
        for node in &config.nodes {
            let client: DynBackend = match config.backend {
                BackendKind::Memory => Arc::new(MemoryBackend::new(node.name.clone())),
                BackendKind::Redis => match ClientPool::connect_redis(&node.urls, &config.redis).await {
                    Ok(pool) => Arc::new(pool),
                    Err(e) => {
                        tracing::error!(node = %node.name, error = %e, "failed to connect node");
                        for (name, client) in registry.iter() {
                            if let Err(close_err) = client.close().await {
                                tracing::warn!(node = name, error = %close_err, "failed to close client during cleanup");
                            }
                        }
                        return Err(e);
                    }
                },
            };
            registry.insert(node.name.clone(), client);
        }
        Ok(registry)
    }

    /// Build the routing service for `config`.
    pub async fn build_service(config: &Config) -> Result<CacheService> {
        config.validate()?;
        let registry = Self::build_registry(config).await?;
        CacheService::new(
            ServiceConfig::new(config.node_names(), registry)
                .virtual_nodes(config.ring.virtual_nodes),
        )
    }

    pub fn app_state(&self, service: Arc<CacheService>) -> AppState {
        AppState {
            service,
            request_timeout: self.config.server.request_timeout(),
            health_timeout: self.config.server.health_timeout(),
            max_body_bytes: self.config.server.max_body_bytes,
        }
    }

    /// Serve until Ctrl-C, then close every backend.
    pub async fn serve(self) -> Result<()> {
        tracing::info!("Starting shardcache router");
        tracing::info!("  HTTP API: {}", self.config.server.bind_addr);
        tracing::info!("  Backend: {:?}", self.config.backend);
        tracing::info!("  Nodes: {}", self.config.node_names().join(", "));
        tracing::info!("  Virtual nodes: {}", self.config.ring.virtual_nodes);

        let service = Arc::new(Self::build_service(&self.config).await?);
        let router = create_router(self.app_state(service.clone()));

        let listener = tokio::net::TcpListener::bind(self.config.server.bind_addr).await?;
        tracing::info!("✓ Router ready on {}", listener.local_addr()?);

        let res = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await;

        if let Err(e) = service.close().await {
            tracing::warn!(error = %e, "error closing backends");
        }
        res.map_err(Error::from)?;

        tracing::info!("Router stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        // Without a signal handler, run until the process is killed.
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

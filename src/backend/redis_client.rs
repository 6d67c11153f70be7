//! Redis-backed node client

use crate::backend::CacheBackend;
use crate::common::{Error, OpContext, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisResult};
use std::future::Future;
use std::time::Duration;

/// One multiplexed connection to a Redis server.
///
/// The connection is cloned per command, so concurrent requests pipeline over
/// a single socket.
pub struct RedisClient {
    addr: String,
    conn: MultiplexedConnection,
    timeout: Duration,
}

impl RedisClient {
    /// Connect and verify the server answers PING.
    pub async fn connect(url: &str, timeout: Duration, connect_timeout: Duration) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| Error::InvalidConfig(format!("invalid redis URL: {}", e)))?;
        // Log the address only; the URL may carry credentials.
        let addr = client.get_connection_info().addr.to_string();

        let mut conn = match tokio::time::timeout(
            connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => {
                tracing::error!(%addr, error = %e, "failed to connect to redis");
                return Err(e.into());
            }
            Err(_) => {
                tracing::error!(%addr, "redis connect timed out");
                return Err(Error::Timeout(format!("connecting to redis at {}", addr)));
            }
        };

        let pong: RedisResult<String> = match tokio::time::timeout(
            connect_timeout,
            redis::cmd("PING").query_async(&mut conn),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => return Err(Error::Timeout(format!("pinging redis at {}", addr))),
        };
        if let Err(e) = pong {
            tracing::error!(%addr, error = %e, "failed to ping redis server");
            return Err(e.into());
        }

        tracing::info!(%addr, timeout_ms = timeout.as_millis() as u64, "redis client connected");
        Ok(Self {
            addr,
            conn,
            timeout,
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Command budget: the client timeout, capped by the caller's deadline.
    fn budget(&self, ctx: &OpContext) -> Duration {
        ctx.remaining()
            .map_or(self.timeout, |remaining| remaining.min(self.timeout))
    }

    async fn bounded<T, F>(&self, ctx: &OpContext, op: &str, fut: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.budget(ctx), fut).await {
            Ok(res) => res.map_err(|e| {
                tracing::error!(addr = %self.addr, op, error = %e, "redis operation failed");
                Error::from(e)
            }),
            Err(_) => Err(Error::Timeout(format!("redis {} on {}", op, self.addr))),
        }
    }
}

#[async_trait]
impl CacheBackend for RedisClient {
    async fn get(&self, ctx: &OpContext, key: &str) -> Result<String> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        let mut conn = self.conn.clone();
        let value: Option<String> = self.bounded(ctx, "GET", conn.get(key)).await?;
        match value {
            Some(value) => {
                tracing::debug!(key, "cache hit");
                Ok(value)
            }
            None => {
                tracing::debug!(key, "cache miss");
                Err(Error::KeyNotFound(key.to_string()))
            }
        }
    }

    async fn set(&self, ctx: &OpContext, key: &str, value: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }
        if value.is_empty() {
            return Err(Error::InvalidValue);
        }

        let mut conn = self.conn.clone();
        self.bounded::<(), _>(ctx, "SET", conn.set(key, value))
            .await?;
        tracing::debug!(key, "cache set successful");
        Ok(())
    }

    async fn delete(&self, ctx: &OpContext, key: &str) -> Result<()> {
        if key.is_empty() {
            return Err(Error::InvalidKey);
        }

        let mut conn = self.conn.clone();
        let _removed: i64 = self.bounded(ctx, "DEL", conn.del(key)).await?;
        tracing::debug!(key, "cache delete successful");
        Ok(())
    }

    async fn health_check(&self, ctx: &OpContext) -> Result<()> {
        let mut conn = self.conn.clone();
        let ping = redis::cmd("PING");
        match self
            .bounded::<String, _>(ctx, "PING", ping.query_async(&mut conn))
            .await
        {
            Ok(_) => Ok(()),
            Err(Error::Timeout(msg)) => Err(Error::Timeout(msg)),
            Err(e) => {
                tracing::warn!(addr = %self.addr, error = %e, "redis health check failed");
                Err(Error::CacheUnavailable(self.addr.clone()))
            }
        }
    }

    async fn close(&self) -> Result<()> {
        // Multiplexed connections shut down once the last clone is dropped.
        tracing::info!(addr = %self.addr, "redis client closed");
        Ok(())
    }
}

//! Redis backend tests
//!
//! Need a Redis server at `REDIS_URL` (default `redis://127.0.0.1:6379`).
//! Run with `cargo test -- --ignored`.

use shardcache::backend::{CacheBackend, ClientPool, RedisClient};
use shardcache::common::RedisConfig;
use shardcache::{Error, OpContext};
use std::time::Duration;

fn redis_url() -> String {
    std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string())
}

#[tokio::test]
#[ignore]
async fn test_redis_roundtrip() {
    let client = RedisClient::connect(&redis_url(), Duration::from_secs(2), Duration::from_secs(2))
        .await
        .unwrap();
    let ctx = OpContext::with_timeout(Duration::from_secs(5));

    client.set(&ctx, "shardcache:test:k", "v").await.unwrap();
    assert_eq!(client.get(&ctx, "shardcache:test:k").await.unwrap(), "v");

    client.delete(&ctx, "shardcache:test:k").await.unwrap();
    assert!(matches!(
        client.get(&ctx, "shardcache:test:k").await,
        Err(Error::KeyNotFound(_))
    ));
    client.health_check(&ctx).await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_redis_pool() {
    let urls = vec![redis_url(), redis_url()];
    let pool = ClientPool::connect_redis(&urls, &RedisConfig::default())
        .await
        .unwrap();
    assert_eq!(pool.size(), 2);

    let ctx = OpContext::background();
    pool.set(&ctx, "shardcache:test:pool", "1").await.unwrap();
    // Both members share one server, so any of them sees the write.
    assert_eq!(pool.get(&ctx, "shardcache:test:pool").await.unwrap(), "1");
    pool.close().await.unwrap();
    assert!(matches!(pool.get(&ctx, "x").await, Err(Error::PoolClosed)));
}

#[tokio::test]
async fn test_redis_unreachable() {
    // Nothing listens on port 1.
    let res = RedisClient::connect(
        "redis://127.0.0.1:1",
        Duration::from_millis(200),
        Duration::from_millis(200),
    )
    .await;
    assert!(res.is_err());
}

//! Integration tests against a real Redis instance.
//!
//! Tests use testcontainers to spin up Redis, so they need a container
//! runtime and are ignored by default: `cargo test -- --ignored`.

use readthru_cache::{
    ConnectPolicy, ConnectionManager, ConnectionStatus, Connector, LocalStore, ReadThroughCache,
    RedisConnector,
};
use std::sync::Arc;
use std::time::Duration;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn test_redis_store_commands() {
    let connector = RedisConnector::new(Some(get_redis_url().await));
    let store = connector.connect().await.expect("connect");
    store.ping().await.expect("ping");

    store.set_ex("redis:test:crud", "[1,2]", 60).await.unwrap();
    assert_eq!(
        store.get("redis:test:crud").await.unwrap().as_deref(),
        Some("[1,2]")
    );
    let ttl = store.ttl("redis:test:crud").await.unwrap();
    assert!(ttl > 0 && ttl <= 60);

    store.delete("redis:test:crud").await.unwrap();
    assert_eq!(store.get("redis:test:crud").await.unwrap(), None);
    assert_eq!(store.ttl("redis:test:crud").await.unwrap(), -2);
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn test_read_through_against_redis() {
    let connector = Arc::new(RedisConnector::new(Some(get_redis_url().await)));
    let connections = Arc::new(ConnectionManager::new(connector, ConnectPolicy::default()));
    let cache = ReadThroughCache::new(connections, LocalStore::new());

    let first = cache
        .read_through("redis:test:users", || async { Ok::<_, String>(vec!["Bret".to_string()]) })
        .await
        .unwrap();
    assert!(!first.cache.cache_hit);
    assert_eq!(cache.backend_status(), ConnectionStatus::Ready);

    let second = cache
        .read_through("redis:test:users", || async {
            Err::<Vec<String>, _>("origin must not be called".to_string())
        })
        .await
        .unwrap();
    assert!(second.cache.cache_hit);
    assert_eq!(second.data, vec!["Bret".to_string()]);
    let ttl = second.cache.remaining_ttl_seconds.unwrap();
    assert!((59..=60).contains(&ttl));
}

#[tokio::test]
#[ignore = "requires a container runtime"]
async fn test_redis_expiry() {
    let connector = RedisConnector::new(Some(get_redis_url().await));
    let store = connector.connect().await.expect("connect");

    store.set_ex("redis:test:ttl", "temporary", 1).await.unwrap();
    assert!(store.get("redis:test:ttl").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(store.get("redis:test:ttl").await.unwrap().is_none());
}

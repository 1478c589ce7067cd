#![allow(dead_code)]

use readthru_cache::{ConnectPolicy, ConnectionManager, LocalStore, ReadThroughCache, RedisConnector};
use readthru_server::{CachedApi, OriginClient};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

/// API wired to `origin_url` with no Redis URL, so every read degrades to the local store.
pub fn api_without_backend(origin_url: &str) -> CachedApi {
    let origin = OriginClient::new(origin_url, Duration::from_secs(5)).expect("origin client");
    let connections = Arc::new(ConnectionManager::new(
        Arc::new(RedisConnector::new(None)),
        ConnectPolicy::default(),
    ));
    CachedApi::new(origin, ReadThroughCache::new(connections, LocalStore::new()))
}

pub fn user_json(id: u64) -> Value {
    json!({
        "id": id,
        "name": "Leanne Graham",
        "username": "Bret",
        "email": "Sincere@april.biz",
        "address": {
            "street": "Kulas Light",
            "suite": "Apt. 556",
            "city": "Gwenborough",
            "zipcode": "92998-3874",
            "geo": { "lat": "-37.3159", "lng": "81.1496" }
        },
        "phone": "1-770-736-8031 x56442",
        "website": "hildegard.org",
        "company": {
            "name": "Romaguera-Crona",
            "catchPhrase": "Multi-layered client-server neural-net",
            "bs": "harness real-time e-markets"
        }
    })
}

pub fn post_json(user_id: u64, id: u64) -> Value {
    json!({
        "userId": user_id,
        "id": id,
        "title": "sunt aut facere repellat provident",
        "body": "quia et suscipit"
    })
}

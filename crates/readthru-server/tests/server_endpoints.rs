mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use common::{api_without_backend, post_json, user_json};
use readthru_server::{AppState, build_app};
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_users_endpoint_reports_cache_metadata() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([user_json(1)])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = build_app(AppState::new(api_without_backend(&mock_server.uri())));

    let (status, body) = get_json(&app, "/api/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["username"], "Bret");
    assert_eq!(body["data"][0]["company"]["catchPhrase"], "Multi-layered client-server neural-net");
    assert_eq!(body["cache"]["cacheHit"], false);
    assert!(body["cache"].get("ttl").is_none());
    assert!(body["cache"]["elapsedMillis"].is_u64());

    let (status, body) = get_json(&app, "/api/users").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cache"]["cacheHit"], true);
    assert!(body["cache"]["ttl"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_user_and_posts_endpoints() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(2)))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/2/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([post_json(2, 11)])))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([post_json(1, 1), post_json(2, 11)])),
        )
        .mount(&mock_server)
        .await;

    let app = build_app(AppState::new(api_without_backend(&mock_server.uri())));

    let (status, body) = get_json(&app, "/api/users/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], 2);

    let (status, body) = get_json(&app, "/api/users/2/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["userId"], 2);

    let (status, body) = get_json(&app, "/api/posts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_origin_failure_is_500_with_error_body() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let app = build_app(AppState::new(api_without_backend(&mock_server.uri())));

    let (status, body) = get_json(&app, "/api/users").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to fetch users" }));
}

#[tokio::test]
async fn test_benchmark_endpoint() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([user_json(1)]))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .mount(&mock_server)
        .await;

    let app = build_app(AppState::new(api_without_backend(&mock_server.uri())));

    let (status, body) = get_json(&app, "/api/benchmark").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["originMillis"].as_u64().unwrap() >= 100);
    assert!(body["cacheMillis"].is_u64());
    assert!(body["differenceMillis"].is_i64());
    assert!(body["percentFaster"].is_f64());
}

#[tokio::test]
async fn test_health_reports_backend_state() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let app = build_app(AppState::new(api_without_backend(&mock_server.uri())));

    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "backend": "pending" }));

    // The first read attempts the connection, which fails without a Redis URL.
    get_json(&app, "/api/posts").await;

    let (_, body) = get_json(&app, "/health").await;
    assert_eq!(body["backend"], "unavailable");
}

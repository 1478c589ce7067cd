use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use readthru_cache::{ConnectionManager, LocalStore, ReadThroughCache, RedisConnector, redact_url};
use tower_http::trace::TraceLayer;

use crate::api::CachedApi;
use crate::config::AppConfig;
use crate::handlers;
use crate::origin::{OriginClient, OriginError};

#[derive(Clone)]
pub struct AppState {
    pub api: Arc<CachedApi>,
}

impl AppState {
    pub fn new(api: CachedApi) -> Self {
        Self { api: Arc::new(api) }
    }
}

pub struct ReadthruServer {
    addr: SocketAddr,
    app: Router,
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/api/users", get(handlers::users))
        .route("/api/users/{id}", get(handlers::user))
        .route("/api/users/{id}/posts", get(handlers::user_posts))
        .route("/api/posts", get(handlers::posts))
        .route("/api/benchmark", get(handlers::benchmark))
        .route_layer(middleware::from_fn(track_metrics))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http.request",
                        http.method = %req.method(),
                        http.target = %req.uri(),
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            http.status = %res.status().as_u16(),
                            elapsed_ms = %latency.as_millis(),
                            "request handled"
                        );
                    },
                ),
        )
        .with_state(state)
}

async fn track_metrics(req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let started = std::time::Instant::now();
    let response = next.run(req).await;
    crate::metrics::record_http_request(&path, response.status().as_u16(), started.elapsed());
    response
}

/// Wire the origin client, connection manager and cache from configuration.
///
/// No connection to the backend is made here; the first request establishes it.
pub fn build_api(cfg: &AppConfig) -> Result<CachedApi, OriginError> {
    let origin = OriginClient::from_config(&cfg.origin)?;

    match cfg.redis.url.as_deref() {
        Some(url) => tracing::info!(url = %redact_url(url), "Redis cache backend configured"),
        None => tracing::warn!("No Redis URL configured, responses will be cached in-process only"),
    }

    let connector =
        Arc::new(RedisConnector::new(cfg.redis.url.clone()).with_insecure_tls(cfg.redis.tls_insecure));
    let connections = Arc::new(ConnectionManager::new(
        connector,
        cfg.redis.connect_policy(),
    ));
    let cache = ReadThroughCache::new(connections, LocalStore::new())
        .with_default_ttl(cfg.cache.default_ttl_secs);

    Ok(CachedApi::new(origin, cache))
}

pub struct ServerBuilder {
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.config = cfg;
        self
    }

    pub fn build(self) -> Result<ReadthruServer, OriginError> {
        let api = build_api(&self.config)?;
        Ok(ReadthruServer {
            addr: self.config.addr(),
            app: build_app(AppState::new(api)),
        })
    }
}

impl ReadthruServer {
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = tokio::net::TcpListener::bind(self.addr).await?;
        tracing::info!("listening on {}", self.addr);
        axum::serve(listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

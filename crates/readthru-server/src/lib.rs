pub mod api;
pub mod config;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod origin;
pub mod server;

pub use api::CachedApi;
pub use config::{AppConfig, CacheConfig, LoggingConfig, OriginConfig, RedisConfig, ServerConfig};
pub use handlers::ApiError;
pub use models::{Address, Company, Geo, Post, User};
pub use observability::init_tracing;
pub use origin::{OriginClient, OriginError};
pub use server::{AppState, ReadthruServer, ServerBuilder, build_api, build_app};

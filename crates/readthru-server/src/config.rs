use readthru_cache::ConnectPolicy;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Origin data source
    #[serde(default)]
    pub origin: OriginConfig,
    /// Redis cache backend
    #[serde(default)]
    pub redis: RedisConfig,
    /// Read-through cache settings
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.origin.timeout_ms == 0 {
            return Err("origin.timeout_ms must be > 0".into());
        }
        if url::Url::parse(&self.origin.base_url).is_err() {
            return Err(format!(
                "origin.base_url is not a valid URL: {}",
                self.origin.base_url
            ));
        }
        if self.redis.connect_timeout_ms == 0 {
            return Err("redis.connect_timeout_ms must be > 0".into());
        }
        if self.redis.command_timeout_ms == 0 {
            return Err("redis.command_timeout_ms must be > 0".into());
        }
        if self.redis.max_attempts == 0 {
            return Err("redis.max_attempts must be > 0".into());
        }
        if self.cache.default_ttl_secs == 0 {
            return Err("cache.default_ttl_secs must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Origin HTTP endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginConfig {
    /// Base URL the resource paths are appended to
    #[serde(default = "default_origin_base_url")]
    pub base_url: String,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_origin_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_origin_base_url() -> String {
    "https://jsonplaceholder.typicode.com".to_string()
}

fn default_origin_timeout_ms() -> u64 {
    10_000
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            base_url: default_origin_base_url(),
            timeout_ms: default_origin_timeout_ms(),
        }
    }
}

/// Redis configuration
///
/// A missing `url` does not fail startup; the cache runs on the local store
/// and logs the configuration error on every connection attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis connection URL (e.g., "redis://localhost:6379").
    /// Falls back to the `REDIS_URL` environment variable.
    #[serde(default)]
    pub url: Option<String>,

    /// Timeout for one connect-and-ping attempt in milliseconds
    #[serde(default = "default_redis_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Connection attempts before the backend is reported unavailable
    #[serde(default = "default_redis_max_attempts")]
    pub max_attempts: u32,

    /// Backoff increment per failed attempt in milliseconds
    #[serde(default = "default_redis_retry_step_ms")]
    pub retry_step_ms: u64,

    /// Backoff ceiling in milliseconds
    #[serde(default = "default_redis_retry_cap_ms")]
    pub retry_cap_ms: u64,

    /// Upper bound for a single GET, TTL or SETEX in milliseconds
    #[serde(default = "default_redis_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// Skip certificate verification for `rediss://` URLs
    #[serde(default)]
    pub tls_insecure: bool,
}

fn default_redis_connect_timeout_ms() -> u64 {
    10_000
}

fn default_redis_max_attempts() -> u32 {
    3
}

fn default_redis_retry_step_ms() -> u64 {
    50
}

fn default_redis_retry_cap_ms() -> u64 {
    2_000
}

fn default_redis_command_timeout_ms() -> u64 {
    2_000
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_ms: default_redis_connect_timeout_ms(),
            max_attempts: default_redis_max_attempts(),
            retry_step_ms: default_redis_retry_step_ms(),
            retry_cap_ms: default_redis_retry_cap_ms(),
            command_timeout_ms: default_redis_command_timeout_ms(),
            tls_insecure: false,
        }
    }
}

impl RedisConfig {
    pub fn connect_policy(&self) -> ConnectPolicy {
        ConnectPolicy::new()
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_max_attempts(self.max_attempts)
            .with_backoff(
                Duration::from_millis(self.retry_step_ms),
                Duration::from_millis(self.retry_cap_ms),
            )
            .with_command_timeout(Duration::from_millis(self.command_timeout_ms))
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for cached origin responses in seconds
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    readthru_cache::DEFAULT_TTL_SECS
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::AppConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Conventional variable for the backend connection string.
    pub const REDIS_URL_ENV: &str = "REDIS_URL";

    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut cfg = load_config_without_env_fallback(path)?;
        if cfg.redis.url.is_none() {
            cfg.redis.url = std::env::var(REDIS_URL_ENV).ok().filter(|url| !url.is_empty());
        }
        Ok(cfg)
    }

    /// Loads file and `READTHRU__*` overrides, ignoring `REDIS_URL`.
    pub fn load_config_without_env_fallback(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or("readthru.toml"));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., READTHRU__CACHE__DEFAULT_TTL_SECS=30
        builder = builder.add_source(
            Environment::with_prefix("READTHRU")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

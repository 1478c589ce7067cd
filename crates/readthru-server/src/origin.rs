//! HTTP client for the origin data source.
//!
//! The origin is an opaque JSON API (JSONPlaceholder-compatible) exposing
//! `/users`, `/users/{id}`, `/posts` and `/users/{id}/posts`. Every call here
//! is a real network round trip; caching happens one layer up.

use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

use crate::config::OriginConfig;
use crate::models::{Post, User};

/// Errors that can occur while fetching from the origin.
#[derive(Debug, thiserror::Error)]
pub enum OriginError {
    /// The base URL or a derived request URL is invalid.
    #[error("Invalid origin URL: {0}")]
    InvalidUrl(String),

    /// A network error occurred while sending the request.
    #[error("Network error: {0}")]
    Network(String),

    /// The origin answered with a non-success status code.
    #[error("HTTP error: status {0}")]
    Http(u16),

    /// The response body could not be decoded.
    #[error("Failed to parse origin response: {0}")]
    Parse(String),
}

/// Typed client for the origin endpoints.
#[derive(Debug, Clone)]
pub struct OriginClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl OriginClient {
    /// Creates a client for `base_url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`OriginError::InvalidUrl`] if `base_url` does not parse, and
    /// [`OriginError::Network`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, OriginError> {
        let base_url =
            Url::parse(base_url).map_err(|e| OriginError::InvalidUrl(format!("{base_url}: {e}")))?;
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OriginError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn from_config(config: &OriginConfig) -> Result<Self, OriginError> {
        Self::new(&config.base_url, Duration::from_millis(config.timeout_ms))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn users(&self) -> Result<Vec<User>, OriginError> {
        self.get_json("users").await
    }

    pub async fn user(&self, id: u64) -> Result<User, OriginError> {
        self.get_json(&format!("users/{id}")).await
    }

    pub async fn posts(&self) -> Result<Vec<Post>, OriginError> {
        self.get_json("posts").await
    }

    pub async fn posts_by_user(&self, user_id: u64) -> Result<Vec<Post>, OriginError> {
        self.get_json(&format!("users/{user_id}/posts")).await
    }

    /// Builds `{base_url}/{path}`, keeping any path prefix of the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, OriginError> {
        let mut url = self.base_url.clone();
        let prefix = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{prefix}/{path}"));
        if url.cannot_be_a_base() {
            return Err(OriginError::InvalidUrl(url.to_string()));
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, OriginError> {
        let url = self.endpoint(path)?;

        let response = self
            .http_client
            .get(url.as_str())
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(url = %url, error = %e, "Origin request failed");
                OriginError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "Origin returned error status");
            return Err(OriginError::Http(status.as_u16()));
        }

        let body = response.json::<T>().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to parse origin response");
            OriginError::Parse(e.to_string())
        })?;

        tracing::debug!(url = %url, "Fetched from origin");
        Ok(body)
    }
}

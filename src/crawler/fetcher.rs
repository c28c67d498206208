//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the mirror:
//! - Building the HTTP client with the mirror's user agent and timeouts
//! - GET requests for pages and resources
//! - Error classification (HTTP status vs. transport)

use crate::FetchError;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use std::time::Duration;
use url::Url;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("sumi-mirror/", env!("CARGO_PKG_VERSION"));

/// Result of a successful fetch
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// Final URL after redirects
    pub url: Url,

    /// Response body
    pub content: Vec<u8>,

    /// Content-Type header value, empty when the server sent none
    pub content_type: String,
}

/// Downloads documents for the scheduler
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url`; responses with status 400 and above are errors
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Fetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client()?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchResult, FetchError> {
        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let content = response.bytes().await.map_err(transport)?.to_vec();

        tracing::debug!(
            "Fetched {} ({} bytes, {})",
            final_url,
            content.len(),
            if content_type.is_empty() {
                "no content type"
            } else {
                content_type.as_str()
            }
        );

        Ok(FetchResult {
            url: final_url,
            content,
            content_type,
        })
    }
}

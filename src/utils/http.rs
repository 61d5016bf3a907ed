//! HTTP client utilities with built-in request pacing.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;

/// Shared HTTP client with sensible defaults and optional per-client pacing
#[derive(Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("rate_limited", &self.limiter.is_some())
            .finish()
    }
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::build(None)
    }

    /// Create a client that spaces its requests to at most
    /// `requests_per_second` calls per second
    pub fn with_rate_limit(requests_per_second: NonZeroU32) -> Result<Self, SourceError> {
        Self::build(Some(requests_per_second))
    }

    fn build(requests_per_second: Option<NonZeroU32>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let limiter = requests_per_second
            .map(|rps| Arc::new(RateLimiter::direct(Quota::per_second(rps))));

        Ok(Self {
            client: Arc::new(client),
            limiter,
        })
    }

    /// Start a GET request; the request waits for the client's rate limiter
    /// (if any) before hitting the network
    pub fn get(&self, url: &str) -> RateLimitedRequestBuilder {
        RateLimitedRequestBuilder {
            inner: self.client.get(url),
            limiter: self.limiter.clone(),
        }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// A GET request paced by the owning client's rate limiter
pub struct RateLimitedRequestBuilder {
    inner: reqwest::RequestBuilder,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl RateLimitedRequestBuilder {
    /// Add a header to the request
    pub fn header(mut self, key: &'static str, value: &str) -> Self {
        self.inner = self.inner.header(key, value);
        self
    }

    /// Send the request, waiting on the rate limiter first
    pub async fn send(self) -> reqwest::Result<reqwest::Response> {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        self.inner.send().await
    }
}

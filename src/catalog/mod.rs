//! # Catalog Integration Module
//!
//! HTTP layer between the provider and the self-hosted cloud music catalog
//! API. Every logical request goes through [`CatalogClient::get_data`], which
//! consults the durable cache first and only then waits for a slot on the
//! shared rate limiter and hits the network.
//!
//! ```text
//! Provider (artist / album / track / lyrics)
//!          ↓
//! Catalog Layer
//!     ├── search   (typed first-result lookups)
//!     └── lyrics   (song id lookup, LRC normalization)
//!          ↓
//! CatalogClient::get_data  →  DiskCache (hit: return)
//!          ↓ miss
//! governor rate limiter (one start per 100 ms, process wide)
//!          ↓
//! reqwest (5s timeout, certificate validation off)
//! ```
//!
//! ## Failure policy
//!
//! Nothing raised below this module ever reaches the host. Non-200 statuses,
//! timeouts, connection failures and undecodable bodies are logged and turned
//! into `None`. There are no retries.

pub mod lyrics;
pub mod search;

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use crate::{cache::DiskCache, debug, warning};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
pub const COVER_TIMEOUT: Duration = Duration::from_secs(3);
/// Minimum spacing between two request starts. With a burst of one this
/// keeps any rolling one-second window at ten starts or fewer.
pub const REQUEST_SPACING: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("response is not valid json: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Builds the HTTP client shared by catalog calls and cover downloads.
///
/// Self-hosted catalog deployments commonly run with self-signed
/// certificates, so certificate validation is turned off.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .danger_accept_invalid_certs(true)
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Process-wide limiter: one catalog request start per [`REQUEST_SPACING`],
/// no burst, so at most ten requests start within any rolling second.
pub fn build_rate_limiter() -> Arc<DefaultDirectRateLimiter> {
    let quota = Quota::with_period(REQUEST_SPACING)
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(quota))
}

#[derive(Clone)]
pub struct CatalogClient {
    http: Client,
    base_url: String,
    limiter: Arc<DefaultDirectRateLimiter>,
    cache: DiskCache,
}

impl CatalogClient {
    pub fn new(
        http: Client,
        base_url: impl Into<String>,
        limiter: Arc<DefaultDirectRateLimiter>,
        cache: DiskCache,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            limiter,
            cache,
        }
    }

    /// `GET {base_url}/{endpoint}?{params}`, cached and throttled.
    ///
    /// Returns the parsed JSON body verbatim, or `None` for any failure.
    pub async fn get_data(&self, endpoint: &str, params: &[(String, String)]) -> Option<Value> {
        if self.base_url.is_empty() {
            return None;
        }

        match self.cache.get(endpoint, params).await {
            Ok(Some(value)) => {
                debug!("Cache hit for {} {:?}", endpoint, params);
                return Some(value);
            }
            Ok(None) => debug!("Cache miss for {} {:?}", endpoint, params),
            Err(e) => warning!("Ignoring unreadable cache entry for {}: {}", endpoint, e),
        }

        self.limiter.until_ready().await;

        match self.fetch(endpoint, params).await {
            Ok(value) => {
                if let Err(e) = self.cache.put(endpoint, params, &value).await {
                    warning!("Cannot cache response for {}: {}", endpoint, e);
                }
                Some(value)
            }
            Err(e) => {
                warning!("Catalog request to {} failed: {}", endpoint, e);
                None
            }
        }
    }

    async fn fetch(&self, endpoint: &str, params: &[(String, String)]) -> Result<Value, FetchError> {
        let api_url = format!(
            "{uri}/{endpoint}",
            uri = self.base_url,
            endpoint = endpoint.trim_start_matches('/')
        );

        let response = self.http.get(&api_url).query(params).send().await?;
        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Downloads a cover image with a short timeout. Not cached and not
/// throttled; any failure yields `None`.
pub async fn fetch_cover(http: &Client, url: &str) -> Option<Vec<u8>> {
    let response = match http.get(url).timeout(COVER_TIMEOUT).send().await {
        Ok(resp) => resp,
        Err(e) => {
            debug!("Cover download failed for {}: {}", url, e);
            return None;
        }
    };

    let response = match response.error_for_status() {
        Ok(resp) => resp,
        Err(e) => {
            debug!("Cover download failed for {}: {}", url, e);
            return None;
        }
    };

    match response.bytes().await {
        Ok(bytes) if !bytes.is_empty() => Some(bytes.to_vec()),
        Ok(_) => None,
        Err(e) => {
            debug!("Cover download failed for {}: {}", url, e);
            None
        }
    }
}

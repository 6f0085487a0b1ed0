use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::{header, Client, StatusCode};
use thiserror::Error;
use tracing::debug;

/// Rotated per request so successive fetches do not share one identity.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Firefox/120.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) Chrome/120.0",
];

/// Fixed backoff after a 429 before moving on; the category is skipped
/// for the rest of the cycle, never retried inline.
pub const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("rate limited (429)")]
    RateLimited,
    #[error("access forbidden (403)")]
    Blocked,
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transient(String),
}

/// Page-fetch seam between the crawler and the HTTP client, so the monitor
/// loop and tests can substitute canned bodies.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
        }
    }
}

pub fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .expect("failed to build http client")
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let ua = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        debug!(url, ua, "HTTP GET");

        let resp = self
            .client
            .get(url)
            .header(header::USER_AGENT, ua)
            .header(header::ACCEPT_LANGUAGE, "lv,en-US;q=0.9,en;q=0.8")
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        match resp.status() {
            StatusCode::TOO_MANY_REQUESTS => Err(FetchError::RateLimited),
            StatusCode::FORBIDDEN => Err(FetchError::Blocked),
            s if s.is_success() => resp
                .text()
                .await
                .map_err(|e| FetchError::Transient(e.to_string())),
            s => Err(FetchError::Status(s.as_u16())),
        }
    }
}

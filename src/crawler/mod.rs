use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::config::Config;
use crate::crawler::fetcher::{FetchError, PageFetcher, RATE_LIMIT_BACKOFF};
use crate::crawler::models::Listing;

pub mod fetcher;
pub mod models;
pub mod parser;

#[derive(Debug, Error)]
pub enum CrawlError {
    /// Every category fetch failed this cycle. Distinguishable from a
    /// successful cycle that found zero rows.
    #[error("all category fetches failed")]
    TotalFailure,
}

/// Detail-page fuel hints keyed by listing id, fetched at most once per id.
#[derive(Default)]
pub struct FuelHintCache {
    inner: Mutex<HashMap<String, String>>,
}

impl FuelHintCache {
    pub async fn get(&self, id: &str) -> Option<String> {
        self.inner.lock().await.get(id).cloned()
    }

    pub async fn put(&self, id: &str, hint: String) {
        self.inner.lock().await.insert(id.to_string(), hint);
    }
}

/// One fetch pass over all monitored categories. Failures are handled per
/// category; the pass only errors when no category succeeded at all.
pub async fn crawl_categories(
    fetcher: &dyn PageFetcher,
    cfg: &Config,
    fuel_cache: &FuelHintCache,
) -> Result<Vec<Listing>, CrawlError> {
    let mut all: Vec<Listing> = Vec::new();
    let mut batch_ids: HashSet<String> = HashSet::new();
    let mut any_success = false;

    for (i, category) in cfg.categories().into_iter().enumerate() {
        if i > 0 {
            jitter_sleep(0.8, 2.0).await;
        }

        let html = match fetcher.fetch_page(&category.url).await {
            Ok(body) => body,
            Err(FetchError::RateLimited) => {
                warn!(url = %category.url, backoff_secs = RATE_LIMIT_BACKOFF.as_secs(),
                    "Rate limited, backing off and skipping category");
                sleep(RATE_LIMIT_BACKOFF).await;
                continue;
            }
            Err(FetchError::Blocked) => {
                warn!(url = %category.url, "Access forbidden, skipping category");
                continue;
            }
            Err(e) => {
                warn!(url = %category.url, error = %e, "Fetch failed, skipping category");
                continue;
            }
        };
        any_success = true;

        let mut listings = parser::parse_listings(&html, &cfg.base_url, category.is_defect);
        info!(url = %category.url, count = listings.len(), "Scraped category");

        for listing in &mut listings {
            if batch_ids.contains(&listing.id) {
                continue;
            }
            resolve_fuel_hint(fetcher, fuel_cache, listing).await;
        }

        for listing in listings {
            if batch_ids.insert(listing.id.clone()) {
                all.push(listing);
            }
        }
    }

    if !any_success {
        return Err(CrawlError::TotalFailure);
    }

    info!(total = all.len(), "Crawl pass finished");
    Ok(all)
}

// A failed detail fetch leaves the hint empty and never fails the row.
async fn resolve_fuel_hint(
    fetcher: &dyn PageFetcher,
    fuel_cache: &FuelHintCache,
    listing: &mut Listing,
) {
    if let Some(hint) = fuel_cache.get(&listing.id).await {
        listing.fuel_hint = hint;
        return;
    }
    if listing.link.is_empty() {
        return;
    }

    match fetcher.fetch_page(&listing.link).await {
        Ok(html) => {
            let hint = parser::parse_fuel_hint(&html);
            fuel_cache.put(&listing.id, hint.clone()).await;
            listing.fuel_hint = hint;
            jitter_sleep(0.3, 0.7).await;
        }
        Err(e) => {
            warn!(id = %listing.id, error = %e, "Detail page fetch failed, hint left empty");
        }
    }
}

/// Randomized pacing between requests to avoid tripping anti-bot defenses.
async fn jitter_sleep(lo_secs: f64, hi_secs: f64) {
    let millis = {
        use rand::Rng;
        let secs = rand::thread_rng().gen_range(lo_secs..hi_secs);
        (secs * 1000.0) as u64
    };
    sleep(Duration::from_millis(millis)).await;
}

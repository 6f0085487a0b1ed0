use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

/// Best-effort phone lookup result. `Unresolved` is a normal outcome, not
/// an error; the pipeline never depends on a resolved phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhoneLookup {
    Phone(String),
    Unresolved,
}

/// Capability seam for the external phone-reveal enrichment. The core
/// pipeline must work unchanged with the no-op implementation.
#[async_trait]
pub trait PhoneResolver: Send + Sync {
    async fn resolve(&self, listing_id: &str, url: &str) -> PhoneLookup;
}

pub struct NoopResolver;

#[async_trait]
impl PhoneResolver for NoopResolver {
    async fn resolve(&self, _listing_id: &str, _url: &str) -> PhoneLookup {
        PhoneLookup::Unresolved
    }
}

/// Caches lookups per listing id so an expensive resolver runs at most
/// once per listing, including the unresolved outcome.
pub struct CachedResolver<R> {
    inner: R,
    cache: Mutex<HashMap<String, PhoneLookup>>,
}

impl<R: PhoneResolver> CachedResolver<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl<R: PhoneResolver> PhoneResolver for CachedResolver<R> {
    async fn resolve(&self, listing_id: &str, url: &str) -> PhoneLookup {
        if let Some(hit) = self.cache.lock().await.get(listing_id) {
            return hit.clone();
        }
        let looked_up = self.inner.resolve(listing_id, url).await;
        self.cache
            .lock()
            .await
            .insert(listing_id.to_string(), looked_up.clone());
        looked_up
    }
}

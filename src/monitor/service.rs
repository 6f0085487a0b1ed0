use std::sync::Arc;

use rand::Rng;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::app::AppState;
use crate::config::Config;
use crate::crawler::fetcher::PageFetcher;
use crate::crawler::models::Listing;
use crate::crawler::{crawl_categories, CrawlError, FuelHintCache};
use crate::filter::{classify, filter_listings};
use crate::notifier::format::format_listing;
use crate::notifier::{dispatch_listing, Notifier};
use crate::phone::{PhoneLookup, PhoneResolver};

/// Pause after a cycle-level error before the loop resumes.
const RECOVERY_SLEEP: Duration = Duration::from_secs(5);
/// Upper bound of the random jitter added to the base interval.
const TICK_JITTER_SECS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Completed { new: usize },
    /// All category fetches failed; seen-set untouched, dispatch skipped.
    FetchFailed,
}

/// Drives the discovery-and-notification pipeline: one bootstrap pass,
/// then fetch → extract → filter → diff → persist → dispatch forever.
pub struct MonitorService {
    cfg: Config,
    state: Arc<AppState>,
    fetcher: Arc<dyn PageFetcher>,
    notifier: Arc<dyn Notifier>,
    phones: Arc<dyn PhoneResolver>,
    fuel_cache: FuelHintCache,
}

impl MonitorService {
    pub fn new(
        cfg: Config,
        state: Arc<AppState>,
        fetcher: Arc<dyn PageFetcher>,
        notifier: Arc<dyn Notifier>,
        phones: Arc<dyn PhoneResolver>,
    ) -> Self {
        Self {
            cfg,
            state,
            fetcher,
            notifier,
            phones,
            fuel_cache: FuelHintCache::default(),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Runs forever. No error below a process signal terminates the loop;
    /// cycle failures degrade to a logged skip plus a short recovery sleep.
    pub async fn run(self: Arc<Self>) {
        if let Err(e) = self.bootstrap().await {
            error!(error = %e, "Bootstrap pass failed");
        }

        loop {
            match self.run_cycle().await {
                Ok(CycleOutcome::Completed { new }) if new > 0 => {
                    info!(new, "Cycle dispatched new listings");
                }
                Ok(CycleOutcome::Completed { .. }) => {}
                Ok(CycleOutcome::FetchFailed) => {
                    sleep(RECOVERY_SLEEP).await;
                }
                Err(e) => {
                    error!(error = %e, "Cycle error");
                    sleep(RECOVERY_SLEEP).await;
                }
            }

            let jitter = {
                let mut rng = rand::thread_rng();
                Duration::from_millis(rng.gen_range(0..TICK_JITTER_SECS * 1000))
            };
            sleep(self.cfg.check_interval + jitter).await;
        }
    }

    /// First pass after start: mark everything currently matching as seen
    /// without treating it as new. When subscribers already exist, replay
    /// a capped number of current matches as existing listings.
    pub async fn bootstrap(&self) -> anyhow::Result<()> {
        info!("Initial check, loading current listings");
        let listings = match crawl_categories(self.fetcher.as_ref(), &self.cfg, &self.fuel_cache).await
        {
            Ok(listings) => {
                self.state.mark_cycle_failed(false);
                listings
            }
            Err(CrawlError::TotalFailure) => {
                self.state.mark_cycle_failed(true);
                warn!("Bootstrap fetch failed for all categories, starting with empty baseline");
                return Ok(());
            }
        };

        let matched = filter_listings(&listings);
        {
            let mut seen = self.state.seen.lock().await;
            for listing in &matched {
                seen.insert(&listing.id);
            }
            seen.flush().await?;
            info!(matched = matched.len(), seen = seen.len(), "Baseline populated");
        }

        if !self.state.subscriber_ids().await.is_empty() {
            let replay = &matched[..matched.len().min(self.cfg.max_initial_send)];
            info!(count = replay.len(), "Replaying existing listings to current subscribers");
            for listing in replay {
                let subscribers = self.state.subscriber_ids().await;
                if subscribers.is_empty() {
                    break;
                }
                let text = format!("📋 Existing listing\n\n{}", self.render(listing).await);
                let removed = dispatch_listing(self.notifier.as_ref(), &subscribers, &text).await;
                self.state.remove_subscribers(&removed).await;
            }
        }

        Ok(())
    }

    /// One steady-state cycle. New ids are persisted before dispatch, so a
    /// crash mid-dispatch can duplicate a notification but never lose the
    /// seen marker.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleOutcome> {
        let listings = match crawl_categories(self.fetcher.as_ref(), &self.cfg, &self.fuel_cache).await
        {
            Ok(listings) => {
                self.state.mark_cycle_failed(false);
                listings
            }
            Err(CrawlError::TotalFailure) => {
                self.state.mark_cycle_failed(true);
                error!("All category fetches failed, skipping this cycle");
                return Ok(CycleOutcome::FetchFailed);
            }
        };

        let matched = filter_listings(&listings);

        let new: Vec<Listing> = {
            let mut seen = self.state.seen.lock().await;
            let new: Vec<Listing> = matched
                .into_iter()
                .filter(|l| seen.insert(&l.id))
                .collect();
            if !new.is_empty() {
                seen.flush().await?;
            }
            new
        };

        if new.is_empty() {
            return Ok(CycleOutcome::Completed { new: 0 });
        }

        info!(new = new.len(), "New listings found");
        for listing in &new {
            // re-read per listing so unreachable recipients removed on an
            // earlier listing are not attempted again
            let subscribers = self.state.subscriber_ids().await;
            if subscribers.is_empty() {
                break;
            }
            let text = self.render(listing).await;
            let removed = dispatch_listing(self.notifier.as_ref(), &subscribers, &text).await;
            self.state.remove_subscribers(&removed).await;
        }

        Ok(CycleOutcome::Completed { new: new.len() })
    }

    /// On-demand run of fetch + extract + filter + format for one caller.
    /// A total fetch failure surfaces as an error so the caller can tell
    /// it apart from zero matches.
    pub async fn search(&self) -> Result<Vec<String>, CrawlError> {
        let listings = crawl_categories(self.fetcher.as_ref(), &self.cfg, &self.fuel_cache).await?;
        let matched = filter_listings(&listings);

        let mut messages = Vec::with_capacity(matched.len());
        for listing in &matched {
            messages.push(self.render(listing).await);
        }
        Ok(messages)
    }

    async fn render(&self, listing: &Listing) -> String {
        let fuel = classify(listing);
        let phone = match self.phones.resolve(&listing.id, &listing.link).await {
            PhoneLookup::Phone(phone) => Some(phone),
            PhoneLookup::Unresolved => None,
        };
        format_listing(listing, fuel, phone.as_deref())
    }
}

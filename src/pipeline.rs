//! Pipeline facade: list, filter, acquire.
//!
//! [`Pipeline::fetch_recent`] lists a source, drops candidates outside the
//! recency window or already in the ledger, and fans the rest out to the
//! worker pool. Progress is published as [`Event`]s on a broadcast channel.

use crate::acquisition::StrategyChain;
use crate::config::{Config, SourceConfig, SourceKind};
use crate::error::Result;
use crate::ledger::DedupLedger;
use crate::pool::WorkerPool;
use crate::recency;
use crate::source::{ChannelPageSource, FeedSource, SourceLister};
use crate::types::{AcquisitionResult, CandidateItem, Event, PipelineRun, SkipReason};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Composes source listing, filtering and the worker pool
pub struct Pipeline {
    default_lister: SourceLister,
    listers: HashMap<SourceKind, SourceLister>,
    chain: Arc<StrategyChain>,
    pool: WorkerPool,
    max_workers: usize,
    prefer_audio_only: bool,
    event_tx: broadcast::Sender<Event>,
}

impl Pipeline {
    /// Create a pipeline listing through `lister` and acquiring through `chain`
    pub fn new(lister: SourceLister, chain: StrategyChain) -> Self {
        let chain = Arc::new(chain);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            default_lister: lister,
            listers: HashMap::new(),
            pool: WorkerPool::new(chain.clone()),
            chain,
            max_workers: 4,
            prefer_audio_only: true,
            event_tx,
        }
    }

    /// Build the standard pipeline from configuration
    ///
    /// Loads the dedup ledger, resolves the external tools and registers both
    /// built-in source kinds.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let ledger = Arc::new(DedupLedger::load(config.ledger_path()).await);
        let chain = StrategyChain::from_config(config, ledger)?;

        let channel_page =
            SourceLister::new(Arc::new(ChannelPageSource::new(config.retry.clone())?));
        let feed = SourceLister::new(Arc::new(FeedSource::new(config.retry.clone())?));

        Ok(Self::new(channel_page.clone(), chain)
            .with_source(SourceKind::ChannelPage, channel_page)
            .with_source(SourceKind::Feed, feed)
            .with_max_workers(config.download.max_workers)
            .prefer_audio_only(config.download.convert_to_audio))
    }

    /// Register the lister used for sources of `kind`
    pub fn with_source(mut self, kind: SourceKind, lister: SourceLister) -> Self {
        self.listers.insert(kind, lister);
        self
    }

    /// Maximum concurrent acquisitions per run
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Whether acquisitions should produce an audio file
    pub fn prefer_audio_only(mut self, prefer: bool) -> Self {
        self.prefer_audio_only = prefer;
        self
    }

    /// Subscribe to pipeline events
    ///
    /// Events sent while nobody is subscribed are dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// The dedup ledger
    pub fn ledger(&self) -> &Arc<DedupLedger> {
        self.chain.ledger()
    }

    /// Whether acquisitions produce audio files
    pub fn prefers_audio(&self) -> bool {
        self.prefer_audio_only
    }

    fn emit_event(&self, event: Event) {
        // send() returns Err if there are no receivers, which is fine - we just drop the event
        self.event_tx.send(event).ok();
    }

    /// Acquire the recent, not yet acquired items of `source_url`
    ///
    /// Lists up to `limit` items through the default lister. An unavailable
    /// source, an empty listing, or nothing eligible all yield an empty
    /// result without starting the worker pool.
    pub async fn fetch_recent(
        &self,
        source_url: &str,
        window_days: u32,
        limit: usize,
    ) -> Vec<AcquisitionResult> {
        self.fetch_with(&self.default_lister, source_url, window_days, limit)
            .await
    }

    /// [`fetch_recent`](Self::fetch_recent) with a source's own settings
    pub async fn fetch_source(&self, source: &SourceConfig) -> PipelineRun {
        let lister = self.listers.get(&source.kind).unwrap_or(&self.default_lister);
        info!(
            source = %source.name,
            url = %source.url,
            days = source.days_to_check,
            limit = source.max_items,
            "checking source"
        );

        let results = self
            .fetch_with(lister, &source.url, source.days_to_check, source.max_items)
            .await;

        PipelineRun {
            source_url: source.url.clone(),
            window_days: source.days_to_check,
            limit: source.max_items,
            results,
        }
    }

    async fn fetch_with(
        &self,
        lister: &SourceLister,
        source_url: &str,
        window_days: u32,
        limit: usize,
    ) -> Vec<AcquisitionResult> {
        let listing = lister.list_recent(source_url, limit).await;
        if let Some(e) = listing.unavailable {
            warn!(url = %source_url, error = %e, "source unavailable, will retry next run");
            self.emit_event(Event::SourceUnavailable {
                url: source_url.to_string(),
                error: e.to_string(),
            });
            return Vec::new();
        }

        let eligible = self.filter_eligible(listing.items, window_days).await;
        if eligible.is_empty() {
            info!(url = %source_url, "no new items");
            self.emit_event(Event::RunCompleted {
                url: source_url.to_string(),
                dispatched: 0,
                succeeded: 0,
            });
            return Vec::new();
        }

        let dispatched = eligible.len();
        info!(url = %source_url, items = dispatched, "acquiring new items");

        let results = self
            .pool
            .run(eligible, self.max_workers, self.prefer_audio_only)
            .await;

        for result in &results {
            self.emit_event(result_event(result));
        }

        let succeeded = results.iter().filter(|r| r.is_success()).count();
        info!(url = %source_url, dispatched, succeeded, "source run completed");
        self.emit_event(Event::RunCompleted {
            url: source_url.to_string(),
            dispatched,
            succeeded,
        });

        results
    }

    /// Drop items outside the window, already in the ledger, or repeated in
    /// the listing
    async fn filter_eligible(
        &self,
        items: Vec<CandidateItem>,
        window_days: u32,
    ) -> Vec<CandidateItem> {
        let window_start = recency::window_start(window_days);
        let key_policy = self.chain.ledger_key();
        let mut seen = HashSet::new();
        let mut eligible = Vec::with_capacity(items.len());

        for item in items {
            if !recency::is_eligible(&item, window_start) {
                debug!(item_id = %item.id, title = %item.title, "skipping item outside window");
                self.emit_skip(&item, SkipReason::TooOld);
                continue;
            }

            let key = key_policy.key_of(&item);
            if self.ledger().contains(key).await || !seen.insert(key.to_string()) {
                debug!(item_id = %item.id, title = %item.title, "skipping already acquired item");
                self.emit_skip(&item, SkipReason::AlreadyAcquired);
                continue;
            }

            eligible.push(item);
        }

        eligible
    }

    fn emit_skip(&self, item: &CandidateItem, reason: SkipReason) {
        self.emit_event(Event::ItemSkipped {
            id: item.id.clone(),
            title: item.title.clone(),
            reason,
        });
    }
}

fn result_event(result: &AcquisitionResult) -> Event {
    match result.failure_reason() {
        None => Event::ItemAcquired {
            id: result.item.id.clone(),
            title: result.item.title.clone(),
            media_path: result.media_file().map(|p| p.to_path_buf()),
            audio_path: result.audio_path.clone(),
        },
        Some(reason) => Event::ItemFailed {
            id: result.item.id.clone(),
            title: result.item.title.clone(),
            error: reason.to_string(),
        },
    }
}

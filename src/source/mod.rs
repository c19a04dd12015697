//! Source listing: discover recent items from a content source.
//!
//! A [`ContentSource`] knows how to talk to one kind of source (a channel's
//! video page, an RSS/Atom feed) and returns loosely-typed [`RawEntry`]
//! records. The [`SourceLister`] normalizes those into [`CandidateItem`]s and
//! turns every failure into an empty, flagged [`Listing`], so callers never
//! see an error escape the listing boundary.

mod channel_page;
mod feed;

pub use channel_page::ChannelPageSource;
pub use feed::FeedSource;

use crate::config::RetryConfig;
use crate::error::{Error, Result};
use crate::retry::download_with_retry;
use crate::types::{CandidateItem, PublishSignal, RelativeAge};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Title used when a source provides none
pub const UNKNOWN_TITLE: &str = "Unknown";

/// An entry as reported by a content source, before normalization
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// Source-native identifier
    pub id: Option<String>,
    /// Display title
    pub title: Option<String>,
    /// URL the payload is fetched from
    pub url: Option<String>,
    /// Precise publication time
    pub published_at: Option<DateTime<Utc>>,
    /// Relative-age text such as "3 days ago"
    pub published_text: Option<String>,
    /// Scheduled but not yet published (live stream, premiere)
    pub upcoming: bool,
}

/// A content source that can list its newest entries
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short name for logs (e.g., "channel_page")
    fn name(&self) -> &'static str;

    /// Fetch up to `limit` entries from `url`, newest first
    async fn fetch_entries(&self, url: &str, limit: usize) -> Result<Vec<RawEntry>>;
}

/// Result of listing a source
///
/// `unavailable` is set when the source could not be listed; `items` is then
/// empty and the caller should try again on the next run.
#[derive(Debug, Default)]
pub struct Listing {
    /// Normalized candidates, newest first
    pub items: Vec<CandidateItem>,
    /// Why the source could not be listed
    pub unavailable: Option<Error>,
}

/// Normalizes a [`ContentSource`]'s entries into candidate items
#[derive(Clone)]
pub struct SourceLister {
    source: Arc<dyn ContentSource>,
}

impl SourceLister {
    /// Create a lister over `source`
    pub fn new(source: Arc<dyn ContentSource>) -> Self {
        Self { source }
    }

    /// List up to `limit` recent items from `source_url`
    ///
    /// Never fails: fetch or parse errors produce an empty listing with
    /// `unavailable` set to [`Error::SourceUnavailable`].
    pub async fn list_recent(&self, source_url: &str, limit: usize) -> Listing {
        if limit == 0 {
            return Listing::default();
        }

        let entries = match self.source.fetch_entries(source_url, limit).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    url = %source_url,
                    source = self.source.name(),
                    error = %e,
                    "failed to list source"
                );
                let reason = match e {
                    Error::SourceUnavailable { reason, .. } => reason,
                    other => other.to_string(),
                };
                return Listing {
                    items: vec![],
                    unavailable: Some(Error::SourceUnavailable {
                        url: source_url.to_string(),
                        reason,
                    }),
                };
            }
        };

        let items: Vec<CandidateItem> = entries
            .into_iter()
            .filter_map(normalize_entry)
            .take(limit)
            .collect();

        debug!(
            url = %source_url,
            source = self.source.name(),
            count = items.len(),
            "listed source"
        );

        Listing {
            items,
            unavailable: None,
        }
    }
}

fn normalize_entry(entry: RawEntry) -> Option<CandidateItem> {
    let Some(id) = entry.id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty()) else {
        warn!(title = ?entry.title, "skipping source entry without an id");
        return None;
    };

    if entry.upcoming {
        debug!(item_id = %id, "skipping upcoming entry");
        return None;
    }

    let title = entry
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());

    let publish_signal = match (entry.published_at, entry.published_text) {
        (Some(ts), _) => Some(PublishSignal::Timestamp(ts)),
        (None, Some(text)) if !text.trim().is_empty() => {
            Some(PublishSignal::Relative(RelativeAge::parse(text.trim())))
        }
        _ => None,
    };

    let source_url = entry.url.unwrap_or_else(|| id.clone());

    Some(CandidateItem {
        id,
        title,
        source_url,
        publish_signal,
    })
}

/// HTTP client shared by the built-in sources
pub(crate) fn http_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(user_agent)
        .build()
        .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))
}

/// GET `url` as text, retrying transient failures
pub(crate) async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    retry: &RetryConfig,
) -> Result<String> {
    let body = download_with_retry(retry, move || async move {
        let response = client
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await?
            .error_for_status()?;
        Ok::<_, Error>(response.text().await?)
    })
    .await
    .map_err(|e| Error::SourceUnavailable {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    Ok(body)
}

//! RSS 2.0 / Atom feed source
//!
//! YouTube channel feeds (`/feeds/videos.xml?channel_id=...`) are Atom and
//! carry the video id in a `yt:videoId` extension element; plain RSS feeds use
//! the item guid.

use super::{ContentSource, RawEntry, fetch_text, http_client};
use crate::config::RetryConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;

/// Lists entries from an RSS 2.0 or Atom feed
pub struct FeedSource {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl FeedSource {
    /// Create a feed source
    pub fn new(retry: RetryConfig) -> Result<Self> {
        Ok(Self {
            client: http_client("vidrelay Feed Reader")?,
            retry,
        })
    }

    /// Parse feed content, trying RSS first and then Atom
    fn parse(&self, content: &str) -> Result<Vec<RawEntry>> {
        match parse_as_rss(content) {
            Ok(entries) => {
                debug!(entries = entries.len(), "parsed feed as RSS");
                Ok(entries)
            }
            Err(rss_err) => {
                debug!(error = %rss_err, "not an RSS feed, trying Atom");
                match parse_as_atom(content) {
                    Ok(entries) => {
                        debug!(entries = entries.len(), "parsed feed as Atom");
                        Ok(entries)
                    }
                    Err(atom_err) => Err(Error::Other(format!(
                        "Failed to parse feed as RSS or Atom. RSS error: {}. Atom error: {}",
                        rss_err, atom_err
                    ))),
                }
            }
        }
    }
}

#[async_trait]
impl ContentSource for FeedSource {
    fn name(&self) -> &'static str {
        "feed"
    }

    async fn fetch_entries(&self, url: &str, limit: usize) -> Result<Vec<RawEntry>> {
        debug!(url = %url, "checking feed");
        let content = fetch_text(&self.client, url, &self.retry).await?;
        let mut entries = self.parse(&content)?;

        // Newest first; entries without a date keep their feed position at the end
        entries.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        entries.truncate(limit);
        Ok(entries)
    }
}

fn parse_as_rss(content: &str) -> Result<Vec<RawEntry>> {
    let channel = content
        .parse::<rss::Channel>()
        .map_err(|e| Error::Other(format!("RSS parse error: {}", e)))?;

    let entries = channel
        .items()
        .iter()
        .map(|item| {
            // Prefer guid, fall back to link
            let id = item
                .guid()
                .map(|g| g.value().to_string())
                .or_else(|| item.link().map(|l| l.to_string()));

            let published_at = item.pub_date().and_then(|date_str| {
                chrono::DateTime::parse_from_rfc2822(date_str)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            });

            RawEntry {
                id,
                title: item.title().map(|t| t.to_string()),
                url: item.link().map(|l| l.to_string()),
                published_at,
                published_text: None,
                upcoming: false,
            }
        })
        .collect();

    Ok(entries)
}

fn parse_as_atom(content: &str) -> Result<Vec<RawEntry>> {
    let feed = atom_syndication::Feed::read_from(content.as_bytes())
        .map_err(|e| Error::Other(format!("Atom parse error: {}", e)))?;

    let entries = feed
        .entries()
        .iter()
        .map(|entry| {
            let video_id = entry
                .extensions()
                .get("yt")
                .and_then(|ext| ext.get("videoId"))
                .and_then(|values| values.first())
                .and_then(|value| value.value())
                .map(str::to_string);
            let id = video_id.unwrap_or_else(|| {
                let raw = entry.id();
                raw.strip_prefix("yt:video:").unwrap_or(raw).to_string()
            });

            // Prefer published, fall back to updated
            let published_at = entry
                .published()
                .copied()
                .unwrap_or_else(|| *entry.updated())
                .with_timezone(&Utc);

            let url = entry
                .links()
                .iter()
                .find(|link| link.rel() == "alternate")
                .or_else(|| entry.links().first())
                .map(|link| link.href().to_string());

            let title = entry.title().as_str().to_string();

            RawEntry {
                id: Some(id),
                title: Some(title),
                url,
                published_at: Some(published_at),
                published_text: None,
                upcoming: false,
            }
        })
        .collect();

    Ok(entries)
}

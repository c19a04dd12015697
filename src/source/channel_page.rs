//! Channel page scraper
//!
//! Fetches `<channel>/videos` and reads the `ytInitialData` document the page
//! embeds for its own rendering. Each `videoRenderer` object in that document
//! is one entry.

use super::{ContentSource, RawEntry, fetch_text, http_client};
use crate::config::RetryConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

static INITIAL_DATA_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r#"(?s)(?:var\s+ytInitialData|window\["ytInitialData"\])\s*=\s*(\{.*?\})\s*;\s*</script>"#)
        .ok()
});

const DEFAULT_WATCH_BASE: &str = "https://www.youtube.com/watch?v=";

/// Lists a channel's newest uploads from its video page
pub struct ChannelPageSource {
    client: reqwest::Client,
    retry: RetryConfig,
    watch_base: String,
}

impl ChannelPageSource {
    /// Create a channel page source
    pub fn new(retry: RetryConfig) -> Result<Self> {
        Ok(Self {
            client: http_client("Mozilla/5.0 (X11; Linux x86_64) vidrelay")?,
            retry,
            watch_base: DEFAULT_WATCH_BASE.to_string(),
        })
    }

    /// Override the prefix item ids are appended to when building item URLs
    pub fn with_watch_base(mut self, watch_base: impl Into<String>) -> Self {
        self.watch_base = watch_base.into();
        self
    }

    fn videos_url(channel_url: &str) -> String {
        let trimmed = channel_url.trim_end_matches('/');
        if trimmed.ends_with("/videos") {
            trimmed.to_string()
        } else {
            format!("{trimmed}/videos")
        }
    }

    fn parse_page(&self, url: &str, html: &str, limit: usize) -> Result<Vec<RawEntry>> {
        let data = extract_initial_data(html).ok_or_else(|| Error::SourceUnavailable {
            url: url.to_string(),
            reason: "page does not embed ytInitialData".to_string(),
        })?;

        let mut renderers = Vec::new();
        collect_video_renderers(&data, &mut renderers);

        let mut seen = HashSet::new();
        let entries: Vec<RawEntry> = renderers
            .into_iter()
            .map(|renderer| self.entry_from_renderer(renderer))
            .filter(|entry| match &entry.id {
                Some(id) => seen.insert(id.clone()),
                None => true,
            })
            .take(limit)
            .collect();

        debug!(url = %url, entries = entries.len(), "parsed channel page");
        Ok(entries)
    }

    fn entry_from_renderer(&self, renderer: &Value) -> RawEntry {
        let id = renderer
            .get("videoId")
            .and_then(Value::as_str)
            .map(str::to_string);

        RawEntry {
            url: id.as_ref().map(|id| format!("{}{}", self.watch_base, id)),
            id,
            title: renderer_title(renderer),
            published_at: None,
            published_text: renderer
                .get("publishedTimeText")
                .and_then(|t| t.get("simpleText"))
                .and_then(Value::as_str)
                .map(str::to_string),
            upcoming: renderer.get("upcomingEventData").is_some(),
        }
    }
}

#[async_trait]
impl ContentSource for ChannelPageSource {
    fn name(&self) -> &'static str {
        "channel_page"
    }

    async fn fetch_entries(&self, url: &str, limit: usize) -> Result<Vec<RawEntry>> {
        let page_url = Self::videos_url(url);
        debug!(url = %page_url, "fetching channel page");
        let html = fetch_text(&self.client, &page_url, &self.retry).await?;
        self.parse_page(&page_url, &html, limit)
    }
}

fn extract_initial_data(html: &str) -> Option<Value> {
    let re = INITIAL_DATA_RE.as_ref()?;
    let json = re.captures(html)?.get(1)?.as_str();
    serde_json::from_str(json).ok()
}

/// Depth-first walk collecting `videoRenderer` objects in document order
fn collect_video_renderers<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "videoRenderer" || key == "gridVideoRenderer" {
                    out.push(child);
                } else {
                    collect_video_renderers(child, out);
                }
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_video_renderers(child, out);
            }
        }
        _ => {}
    }
}

/// `title.runs[0].text`, then `title.simpleText`, then the raw runs
fn renderer_title(renderer: &Value) -> Option<String> {
    let title = renderer.get("title")?;

    if let Some(runs) = title.get("runs") {
        if let Some(text) = runs
            .get(0)
            .and_then(|run| run.get("text"))
            .and_then(Value::as_str)
        {
            return Some(text.to_string());
        }
        return Some(runs.to_string());
    }

    title
        .get("simpleText")
        .and_then(Value::as_str)
        .map(str::to_string)
}

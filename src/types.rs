//! Core types for vidrelay

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Matches "<n> <unit>(s) ago" anywhere in a relative-age tag, so that
/// prefixed forms such as "Streamed 3 hours ago" parse too.
static RELATIVE_AGE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+)\s*(second|sec|minute|min|hour|day|week|month|year)s?\s+ago").ok()
});

/// One discoverable unit of content from a source (e.g., one video)
///
/// Produced by the source lister and never mutated afterwards. Identity is
/// `id`, the source-native identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateItem {
    /// Source-native identifier, unique within a source
    pub id: String,
    /// Display title (`"Unknown"` when the source provided none)
    pub title: String,
    /// URL the payload is fetched from
    pub source_url: String,
    /// Best available publish-time information
    pub publish_signal: Option<PublishSignal>,
}

impl CandidateItem {
    /// Create a new candidate item
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        source_url: impl Into<String>,
        publish_signal: Option<PublishSignal>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            source_url: source_url.into(),
            publish_signal,
        }
    }
}

/// Publish-time information attached to an item
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishSignal {
    /// Precise publication time
    Timestamp(DateTime<Utc>),
    /// Coarse relative-age tag such as "3 weeks ago"
    Relative(RelativeAge),
}

/// Unit of a relative-age tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeUnit {
    /// Seconds
    Second,
    /// Minutes
    Minute,
    /// Hours
    Hour,
    /// Days
    Day,
    /// Weeks
    Week,
    /// Months
    Month,
    /// Years
    Year,
}

impl AgeUnit {
    fn from_label(label: &str) -> Option<Self> {
        match label.to_ascii_lowercase().as_str() {
            "second" | "sec" => Some(AgeUnit::Second),
            "minute" | "min" => Some(AgeUnit::Minute),
            "hour" => Some(AgeUnit::Hour),
            "day" => Some(AgeUnit::Day),
            "week" => Some(AgeUnit::Week),
            "month" => Some(AgeUnit::Month),
            "year" => Some(AgeUnit::Year),
            _ => None,
        }
    }

    /// Whether a tag in this unit is known to be stale without a precise date
    #[must_use]
    pub fn is_coarse_stale(self) -> bool {
        matches!(self, AgeUnit::Week | AgeUnit::Month | AgeUnit::Year)
    }
}

/// A relative-age tag as published by the source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeAge {
    /// The tag text exactly as received
    pub raw: String,
    /// Parsed amount and unit, `None` when the text was not understood
    pub parsed: Option<(u32, AgeUnit)>,
}

impl RelativeAge {
    /// Parse a relative-age tag such as "5 hours ago" or "Streamed 2 weeks ago"
    ///
    /// Text that does not match keeps `parsed = None`.
    ///
    /// ```
    /// use vidrelay::types::{AgeUnit, RelativeAge};
    ///
    /// let age = RelativeAge::parse("Streamed 2 weeks ago");
    /// assert_eq!(age.parsed, Some((2, AgeUnit::Week)));
    /// assert_eq!(RelativeAge::parse("Premieres tomorrow").parsed, None);
    /// ```
    pub fn parse(text: &str) -> Self {
        let parsed = RELATIVE_AGE_RE.as_ref().and_then(|re| {
            let caps = re.captures(text)?;
            let amount = caps.get(1)?.as_str().parse::<u32>().ok()?;
            let unit = AgeUnit::from_label(caps.get(2)?.as_str())?;
            Some((amount, unit))
        });

        Self {
            raw: text.to_string(),
            parsed,
        }
    }

    /// The parsed unit, if any
    pub fn unit(&self) -> Option<AgeUnit> {
        self.parsed.map(|(_, unit)| unit)
    }
}

/// Media path recorded for an acquisition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaPath {
    /// A media file that exists on disk
    File(PathBuf),
    /// Bookkeeping-only path written when audio was fetched directly; it never
    /// refers to a real file and must not be opened
    Placeholder(PathBuf),
}

impl MediaPath {
    /// The path if it refers to a real file
    pub fn file(&self) -> Option<&Path> {
        match self {
            MediaPath::File(path) => Some(path),
            MediaPath::Placeholder(_) => None,
        }
    }

    /// The recorded path regardless of kind
    pub fn as_path(&self) -> &Path {
        match self {
            MediaPath::File(path) | MediaPath::Placeholder(path) => path,
        }
    }
}

/// Outcome of an acquisition
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionStatus {
    /// Payload retrieved and recorded in the ledger
    Success,
    /// All strategies failed (or the task panicked)
    Failed(String),
}

/// Result of acquiring one item
///
/// Created by the strategy chain (or by the worker pool when a task
/// panics) and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionResult {
    /// The item this result belongs to
    pub item: CandidateItem,
    /// Media payload path, if any
    pub media: Option<MediaPath>,
    /// Extracted or directly fetched audio file, if any
    pub audio_path: Option<PathBuf>,
    /// Success or failure
    pub status: AcquisitionStatus,
}

impl AcquisitionResult {
    /// A successful acquisition
    pub fn success(
        item: CandidateItem,
        media: Option<MediaPath>,
        audio_path: Option<PathBuf>,
    ) -> Self {
        Self {
            item,
            media,
            audio_path,
            status: AcquisitionStatus::Success,
        }
    }

    /// A failed acquisition
    pub fn failed(item: CandidateItem, reason: impl Into<String>) -> Self {
        Self {
            item,
            media: None,
            audio_path: None,
            status: AcquisitionStatus::Failed(reason.into()),
        }
    }

    /// Whether the acquisition succeeded
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self.status, AcquisitionStatus::Success)
    }

    /// The media file, skipping placeholders
    pub fn media_file(&self) -> Option<&Path> {
        self.media.as_ref().and_then(MediaPath::file)
    }

    /// The failure reason, if failed
    pub fn failure_reason(&self) -> Option<&str> {
        match &self.status {
            AcquisitionStatus::Success => None,
            AcquisitionStatus::Failed(reason) => Some(reason),
        }
    }
}

/// Aggregate of one pipeline invocation for a source
#[derive(Clone, Debug)]
pub struct PipelineRun {
    /// Source listed
    pub source_url: String,
    /// Recency window in days
    pub window_days: u32,
    /// Maximum number of items listed
    pub limit: usize,
    /// Per-item results, in completion order
    pub results: Vec<AcquisitionResult>,
}

impl PipelineRun {
    /// Number of successful acquisitions
    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Successful results only
    pub fn successes(&self) -> impl Iterator<Item = &AcquisitionResult> {
        self.results.iter().filter(|r| r.is_success())
    }
}

/// Why an item was skipped before acquisition
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Outside the recency window
    TooOld,
    /// Already present in the dedup ledger
    AlreadyAcquired,
}

/// Event emitted by the pipeline
///
/// Subscribe via [`Pipeline::subscribe`](crate::pipeline::Pipeline::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Listing a source failed; retried on the next run
    SourceUnavailable {
        /// Source URL
        url: String,
        /// Failure detail
        error: String,
    },

    /// Candidate filtered out before acquisition
    ItemSkipped {
        /// Item identifier
        id: String,
        /// Item title
        title: String,
        /// Why it was skipped
        reason: SkipReason,
    },

    /// Item acquired successfully
    ItemAcquired {
        /// Item identifier
        id: String,
        /// Item title
        title: String,
        /// Media file, if a real one exists
        #[serde(skip_serializing_if = "Option::is_none")]
        media_path: Option<PathBuf>,
        /// Audio file, if any
        #[serde(skip_serializing_if = "Option::is_none")]
        audio_path: Option<PathBuf>,
    },

    /// Item acquisition failed
    ItemFailed {
        /// Item identifier
        id: String,
        /// Item title
        title: String,
        /// Failure detail
        error: String,
    },

    /// A `fetch_recent` call finished
    RunCompleted {
        /// Source URL
        url: String,
        /// Number of items dispatched to the worker pool
        dispatched: usize,
        /// Number of successful acquisitions
        succeeded: usize,
    },
}

//! Configuration types for vidrelay
//!
//! The configuration is a YAML document with one section per concern:
//!
//! ```yaml
//! sources:
//!   - name: Example Channel
//!     url: https://www.youtube.com/@example
//!     days_to_check: 7
//!     max_items: 3
//! download:
//!   download_dir: downloads
//!   convert_to_audio: true
//!   keep_media_after_conversion: true
//!   max_workers: 4
//! app:
//!   check_interval_hours: 24
//! ```
//!
//! Every field has a default, so an empty document is a valid configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

/// Main configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Content sources to poll
    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    /// Download behavior (directories, concurrency, audio conversion)
    #[serde(default)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Dedup ledger settings
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Retry policy for HTTP fetches
    #[serde(default)]
    pub retry: RetryConfig,

    /// Telegram delivery
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Webhook delivery targets
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,

    /// Scheduling and logging
    #[serde(default)]
    pub app: AppConfig,
}

/// Kind of content source
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Scrape the channel's video listing page
    #[default]
    ChannelPage,
    /// Read an RSS 2.0 or Atom feed
    Feed,
}

/// A content source to poll
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Display name used in delivery messages
    pub name: String,

    /// Channel or feed URL
    pub url: String,

    /// How the source is listed (default: channel_page)
    #[serde(default)]
    pub kind: SourceKind,

    /// Only acquire items published within this many days (default: 7)
    #[serde(default = "default_days_to_check")]
    pub days_to_check: u32,

    /// Maximum number of newest items to look at (default: 3)
    #[serde(default = "default_max_items", alias = "max_videos")]
    pub max_items: usize,
}

impl SourceConfig {
    /// Create a channel-page source with default window and limit
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kind: SourceKind::default(),
            days_to_check: default_days_to_check(),
            max_items: default_max_items(),
        }
    }
}

/// Download behavior configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Download directory (default: "downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Prefer audio-only acquisition and extract audio from fetched media
    /// (default: true)
    #[serde(default = "default_true", alias = "convert_to_mp3")]
    pub convert_to_audio: bool,

    /// Keep (and deliver) the media file after audio extraction (default: true)
    #[serde(default = "default_true", alias = "keep_video_after_conversion")]
    pub keep_media_after_conversion: bool,

    /// Maximum concurrent acquisitions per run (default: 4)
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            convert_to_audio: true,
            keep_media_after_conversion: true,
            max_workers: default_max_workers(),
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub yt_dlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,

    /// Upper bound on a single tool invocation in seconds (None = rely on the
    /// tool's own timeouts)
    #[serde(default, with = "optional_duration_serde")]
    pub tool_timeout: Option<Duration>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: None,
            ffmpeg_path: None,
            search_path: true,
            tool_timeout: None,
        }
    }
}

impl ToolsConfig {
    /// Resolve a tool binary: explicit path first, then PATH lookup, then the
    /// bare name (which fails at spawn time and falls through the chain)
    pub fn resolve(&self, explicit: Option<&PathBuf>, name: &str) -> PathBuf {
        if let Some(path) = explicit {
            return path.clone();
        }
        if self.search_path
            && let Ok(found) = which::which(name)
        {
            return found;
        }
        PathBuf::from(name)
    }
}

/// Which item field keys the dedup ledger
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerKey {
    /// Source-native item id
    #[default]
    Id,
    /// Item title (compatible with title-per-line stores)
    Title,
}

/// Dedup ledger configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Store file (default: `<download_dir>/downloaded_ids.txt`, or
    /// `downloaded_titles.txt` when keyed by title)
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Field used as the ledger key (default: id)
    #[serde(default)]
    pub key: LedgerKey,
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// A Telegram chat to deliver to
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelegramRecipient {
    /// Chat ID (numeric id or @channel name)
    pub chat_id: String,

    /// Optional name for reference
    #[serde(default)]
    pub name: Option<String>,
}

/// Telegram delivery configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Bot token; delivery is disabled while empty
    #[serde(default)]
    pub bot_token: String,

    /// Bot API base URL (default: "https://api.telegram.org")
    #[serde(default = "default_telegram_api_base")]
    pub api_base: String,

    /// Chats to deliver to
    #[serde(default)]
    pub recipients: Vec<TelegramRecipient>,

    /// Send a text message before each item's files (default: true)
    #[serde(default = "default_true")]
    pub send_message_with_video: bool,

    /// Message template; `{channel}` and `{title}` are substituted
    #[serde(default = "default_message_template")]
    pub message_template: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_telegram_api_base(),
            recipients: vec![],
            send_message_with_video: true,
            message_template: default_message_template(),
        }
    }
}

impl TelegramConfig {
    /// Whether Telegram delivery is configured
    pub fn is_enabled(&self) -> bool {
        !self.bot_token.trim().is_empty() && !self.recipients.is_empty()
    }
}

/// Webhook delivery target
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// URL to POST to
    pub url: String,

    /// Optional Authorization header value
    #[serde(default)]
    pub auth_header: Option<String>,

    /// Request timeout (default: 30 seconds)
    #[serde(default = "default_webhook_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

/// Scheduling and logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hours between runs in continuous mode (default: 24)
    #[serde(default = "default_check_interval_hours")]
    pub check_interval_hours: u64,

    /// Log level used when RUST_LOG is not set (default: "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Optional log file, appended to in addition to stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            check_interval_hours: default_check_interval_hours(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Interval between runs in continuous mode
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_hours.saturating_mul(3600))
    }
}

impl Config {
    /// Parse a configuration from a YAML file
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, never failing
    ///
    /// - missing file: the defaults are written to `path` and returned
    /// - unreadable or invalid file: the error is logged and the defaults are
    ///   returned (the file is left untouched)
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!(path = %path.display(), "configuration file not found, creating default");
            let config = Config::default();
            if let Err(e) = config.save(path) {
                warn!(path = %path.display(), error = %e, "failed to write default configuration");
            }
            return config;
        }

        match Self::from_yaml_file(path) {
            Ok(config) => {
                info!(path = %path.display(), sources = config.sources.len(), "configuration loaded");
                config
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "error loading configuration, using defaults");
                Config::default()
            }
        }
    }

    /// Write the configuration as YAML
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        info!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Check values that have no sensible interpretation
    pub fn validate(&self) -> Result<()> {
        if self.download.max_workers == 0 {
            return Err(Error::Config {
                message: "max_workers must be at least 1".to_string(),
                key: Some("download.max_workers".to_string()),
            });
        }
        for source in &self.sources {
            validate_source_url(&source.url).map_err(|message| Error::Config {
                message: format!("source '{}': {}", source.name, message),
                key: Some("sources.url".to_string()),
            })?;
        }
        Ok(())
    }

    /// Add a source; returns false if a source with the same URL exists
    pub fn add_source(&mut self, source: SourceConfig) -> bool {
        if self.sources.iter().any(|s| s.url == source.url) {
            warn!(url = %source.url, "source with this URL already exists");
            return false;
        }
        self.sources.push(source);
        true
    }

    /// Add a Telegram recipient; returns false if the chat ID exists
    pub fn add_telegram_recipient(&mut self, recipient: TelegramRecipient) -> bool {
        if self
            .telegram
            .recipients
            .iter()
            .any(|r| r.chat_id == recipient.chat_id)
        {
            warn!(chat_id = %recipient.chat_id, "telegram recipient already exists");
            return false;
        }
        self.telegram.recipients.push(recipient);
        true
    }

    /// Ledger store path, defaulting into the download directory
    ///
    /// The default file name follows the key, so an id-keyed ledger never
    /// picks up a title-per-line store.
    pub fn ledger_path(&self) -> PathBuf {
        self.ledger.path.clone().unwrap_or_else(|| {
            let file_name = match self.ledger.key {
                LedgerKey::Id => "downloaded_ids.txt",
                LedgerKey::Title => "downloaded_titles.txt",
            };
            self.download.download_dir.join(file_name)
        })
    }
}

/// Check that a source URL is an absolute http(s) URL
pub fn validate_source_url(url_str: &str) -> std::result::Result<(), String> {
    let parsed = url::Url::parse(url_str.trim())
        .map_err(|e| format!("invalid url '{}': {}", url_str, e))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(format!(
            "url scheme '{}' is not supported; only http and https are",
            scheme
        )),
    }
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("downloads")
}

fn default_days_to_check() -> u32 {
    7
}

fn default_max_items() -> usize {
    3
}

fn default_max_workers() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_telegram_api_base() -> String {
    "https://api.telegram.org".to_string()
}

fn default_message_template() -> String {
    "New video from {channel}: {title}".to_string()
}

fn default_webhook_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_check_interval_hours() -> u64 {
    24
}

fn default_log_level() -> String {
    "info".to_string()
}

// Duration serialization helper (as seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

//! Acquisition strategy chain
//!
//! Retrieves one item's payload by trying ordered [`AcquisitionStrategy`]
//! implementations until one succeeds:
//!
//! 1. direct audio-only fetch (only when audio is preferred)
//! 2. direct media fetch, followed by local audio extraction
//! 3. raw HTTP stream of the source URL, followed by local audio extraction
//!
//! Tool and transport failures are logged and fall through to the next
//! strategy. On success the item's ledger key is recorded before the result is
//! returned.

mod extract;
mod raw;
mod tool;
mod ytdlp;

pub use extract::{AudioExtractor, FfmpegExtractor};
pub use raw::RawStreamFetch;
pub use tool::{ToolOutput, ToolRunner};
pub use ytdlp::{YtDlpAudio, YtDlpVideo};

use crate::config::{Config, LedgerKey};
use crate::error::{AcquisitionError, Result};
use crate::ledger::{DedupLedger, RecordOutcome};
use crate::types::{AcquisitionResult, CandidateItem, MediaPath};
use crate::utils::{OutputPaths, dated_dir, remove_file_if_exists};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a strategy produced
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Acquired {
    /// An audio file fetched directly; no media file exists
    Audio(PathBuf),
    /// A media file (video or raw stream)
    Media(PathBuf),
}

/// Inputs for one acquisition attempt
#[derive(Clone, Debug)]
pub struct AcquisitionRequest<'a> {
    /// Item being acquired
    pub item: &'a CandidateItem,
    /// Where outputs must be written
    pub paths: &'a OutputPaths,
    /// Whether an audio artifact is wanted
    pub prefer_audio_only: bool,
}

/// One way of retrieving an item's payload
///
/// Implementations must only report success when the returned file exists.
/// A strategy that does not apply to a request returns
/// [`AcquisitionError::Skipped`].
#[async_trait]
pub trait AcquisitionStrategy: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Attempt the acquisition
    async fn acquire(
        &self,
        request: &AcquisitionRequest<'_>,
    ) -> std::result::Result<Acquired, AcquisitionError>;
}

/// Ordered strategies plus the post-acquisition steps shared by all of them
pub struct StrategyChain {
    strategies: Vec<Arc<dyn AcquisitionStrategy>>,
    extractor: Option<Arc<dyn AudioExtractor>>,
    ledger: Arc<DedupLedger>,
    ledger_key: LedgerKey,
    download_dir: PathBuf,
    keep_media_after_conversion: bool,
}

impl StrategyChain {
    /// Create an empty chain writing under `download_dir`
    pub fn new(ledger: Arc<DedupLedger>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            strategies: Vec::new(),
            extractor: None,
            ledger,
            ledger_key: LedgerKey::default(),
            download_dir: download_dir.into(),
            keep_media_after_conversion: true,
        }
    }

    /// The standard chain: yt-dlp audio, yt-dlp media, raw HTTP stream, with
    /// ffmpeg extraction
    pub fn from_config(config: &Config, ledger: Arc<DedupLedger>) -> Result<Self> {
        let tools = &config.tools;
        let yt_dlp = ToolRunner::new(
            "yt-dlp",
            tools.resolve(tools.yt_dlp_path.as_ref(), "yt-dlp"),
        )
        .with_timeout(tools.tool_timeout);
        let ffmpeg = ToolRunner::new(
            "ffmpeg",
            tools.resolve(tools.ffmpeg_path.as_ref(), "ffmpeg"),
        )
        .with_timeout(tools.tool_timeout);

        debug!(
            yt_dlp = %yt_dlp.program().display(),
            ffmpeg = %ffmpeg.program().display(),
            "resolved acquisition tools"
        );

        Ok(Self::new(ledger, config.download.download_dir.clone())
            .with_strategy(Arc::new(YtDlpAudio::new(yt_dlp.clone())))
            .with_strategy(Arc::new(YtDlpVideo::new(yt_dlp)))
            .with_strategy(Arc::new(RawStreamFetch::new(config.retry.clone())?))
            .with_extractor(Arc::new(FfmpegExtractor::new(ffmpeg)))
            .with_ledger_key(config.ledger.key)
            .keep_media_after_conversion(config.download.keep_media_after_conversion))
    }

    /// Append a strategy; strategies run in insertion order
    pub fn with_strategy(mut self, strategy: Arc<dyn AcquisitionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Set the local audio extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn AudioExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Select which item field keys the ledger
    pub fn with_ledger_key(mut self, key: LedgerKey) -> Self {
        self.ledger_key = key;
        self
    }

    /// Keep the media file after a successful audio extraction
    pub fn keep_media_after_conversion(mut self, keep: bool) -> Self {
        self.keep_media_after_conversion = keep;
        self
    }

    /// The ledger successful acquisitions are recorded in
    pub fn ledger(&self) -> &Arc<DedupLedger> {
        &self.ledger
    }

    /// The ledger key policy
    pub fn ledger_key(&self) -> LedgerKey {
        self.ledger_key
    }

    /// Acquire `item`, trying each strategy in order
    ///
    /// Never fails: exhausting every strategy yields a `Failed` result
    /// carrying the last strategy error.
    pub async fn acquire(
        &self,
        item: &CandidateItem,
        prefer_audio_only: bool,
    ) -> AcquisitionResult {
        let dir = dated_dir(&self.download_dir, chrono::Local::now().date_naive());
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            warn!(
                item_id = %item.id,
                dir = %dir.display(),
                error = %e,
                "failed to create output directory"
            );
            return AcquisitionResult::failed(
                item.clone(),
                format!("failed to create {}: {}", dir.display(), e),
            );
        }

        let paths = OutputPaths::for_item(&dir, item);
        let request = AcquisitionRequest {
            item,
            paths: &paths,
            prefer_audio_only,
        };

        let mut last_error: Option<AcquisitionError> = None;
        let mut acquired = None;

        for strategy in &self.strategies {
            match strategy.acquire(&request).await {
                Ok(output) => {
                    info!(item_id = %item.id, strategy = strategy.name(), "acquisition succeeded");
                    acquired = Some(output);
                    break;
                }
                Err(AcquisitionError::Skipped(_)) => {
                    debug!(item_id = %item.id, strategy = strategy.name(), "strategy not applicable");
                }
                Err(e) => {
                    warn!(
                        item_id = %item.id,
                        strategy = strategy.name(),
                        error = %e,
                        "acquisition strategy failed, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        let result = match acquired {
            Some(Acquired::Audio(audio)) => AcquisitionResult::success(
                item.clone(),
                Some(MediaPath::Placeholder(paths.placeholder.clone())),
                Some(audio),
            ),
            Some(Acquired::Media(media)) => {
                self.finish_media(item, &paths, media, prefer_audio_only)
                    .await
            }
            None => {
                let reason = last_error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "no acquisition strategy applied".to_string());
                warn!(
                    item_id = %item.id,
                    title = %item.title,
                    reason = %reason,
                    "all acquisition strategies failed"
                );
                return AcquisitionResult::failed(item.clone(), reason);
            }
        };

        let key = self.ledger_key.key_of(item);
        if self.ledger.record(key).await == RecordOutcome::MemoryOnly {
            warn!(item_id = %item.id, "acquired item recorded in memory only");
        }

        result
    }

    /// Run extraction on a fetched media file and apply the retention policy
    async fn finish_media(
        &self,
        item: &CandidateItem,
        paths: &OutputPaths,
        media: PathBuf,
        prefer_audio_only: bool,
    ) -> AcquisitionResult {
        if !prefer_audio_only {
            return AcquisitionResult::success(item.clone(), Some(MediaPath::File(media)), None);
        }

        let Some(extractor) = &self.extractor else {
            warn!(item_id = %item.id, "audio requested but no extractor is configured");
            return AcquisitionResult::success(item.clone(), Some(MediaPath::File(media)), None);
        };

        let audio = match extractor.extract(&media, &paths.audio).await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(
                    item_id = %item.id,
                    error = %e,
                    "audio extraction failed, keeping media only"
                );
                return AcquisitionResult::success(
                    item.clone(),
                    Some(MediaPath::File(media)),
                    None,
                );
            }
        };

        if self.keep_media_after_conversion {
            return AcquisitionResult::success(
                item.clone(),
                Some(MediaPath::File(media)),
                Some(audio),
            );
        }

        match remove_file_if_exists(&media).await {
            Ok(()) => {
                debug!(
                    item_id = %item.id,
                    media = %media.display(),
                    "removed media after conversion"
                );
                AcquisitionResult::success(item.clone(), None, Some(audio))
            }
            Err(e) => {
                warn!(
                    item_id = %item.id,
                    media = %media.display(),
                    error = %e,
                    "failed to remove media after conversion"
                );
                AcquisitionResult::success(
                    item.clone(),
                    Some(MediaPath::File(media)),
                    Some(audio),
                )
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test_helpers;

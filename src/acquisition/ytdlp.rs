//! yt-dlp backed strategies

use super::{Acquired, AcquisitionRequest, AcquisitionStrategy, ToolRunner};
use crate::error::AcquisitionError;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use tracing::debug;

/// Format selector for the media fetch: mp4 video plus m4a audio, falling back
/// to the best single mp4, then anything
const VIDEO_FORMAT: &str = "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best";

/// Fetch only the audio track, transcoded to mp3 by yt-dlp itself
pub struct YtDlpAudio {
    runner: ToolRunner,
}

impl YtDlpAudio {
    /// Create the strategy around a yt-dlp runner
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl AcquisitionStrategy for YtDlpAudio {
    fn name(&self) -> &'static str {
        "yt-dlp-audio"
    }

    async fn acquire(
        &self,
        request: &AcquisitionRequest<'_>,
    ) -> Result<Acquired, AcquisitionError> {
        if !request.prefer_audio_only {
            return Err(AcquisitionError::Skipped(self.name()));
        }

        let audio = &request.paths.audio;
        // yt-dlp picks the intermediate extension; -x leaves the final .mp3
        let template = audio.with_extension("%(ext)s");

        let args: Vec<OsString> = vec![
            "--no-playlist".into(),
            "--no-progress".into(),
            "-f".into(),
            "bestaudio".into(),
            "-x".into(),
            "--audio-format".into(),
            "mp3".into(),
            "--audio-quality".into(),
            "0".into(),
            "-o".into(),
            template.into_os_string(),
            request.item.source_url.as_str().into(),
        ];

        self.runner.run(args).await?;
        expect_output(self.runner.name(), audio).await?;

        debug!(item_id = %request.item.id, audio = %audio.display(), "fetched audio directly");
        Ok(Acquired::Audio(audio.clone()))
    }
}

/// Fetch the full media as mp4
pub struct YtDlpVideo {
    runner: ToolRunner,
}

impl YtDlpVideo {
    /// Create the strategy around a yt-dlp runner
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl AcquisitionStrategy for YtDlpVideo {
    fn name(&self) -> &'static str {
        "yt-dlp-video"
    }

    async fn acquire(
        &self,
        request: &AcquisitionRequest<'_>,
    ) -> Result<Acquired, AcquisitionError> {
        let media = &request.paths.media;

        let args: Vec<OsString> = vec![
            "--no-playlist".into(),
            "--no-progress".into(),
            "-f".into(),
            VIDEO_FORMAT.into(),
            "--merge-output-format".into(),
            "mp4".into(),
            "-o".into(),
            media.clone().into_os_string(),
            request.item.source_url.as_str().into(),
        ];

        self.runner.run(args).await?;
        expect_output(self.runner.name(), media).await?;

        debug!(item_id = %request.item.id, media = %media.display(), "fetched media");
        Ok(Acquired::Media(media.clone()))
    }
}

/// A zero exit is not enough; the expected file must exist
async fn expect_output(tool: &str, path: &Path) -> Result<(), AcquisitionError> {
    match tokio::fs::try_exists(path).await {
        Ok(true) => Ok(()),
        Ok(false) => Err(AcquisitionError::tool(
            tool,
            format!("exited successfully but {} was not written", path.display()),
        )),
        Err(e) => Err(AcquisitionError::tool(
            tool,
            format!("cannot check output {}: {}", path.display(), e),
        )),
    }
}

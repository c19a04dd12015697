//! Local audio extraction

use super::ToolRunner;
use crate::error::AcquisitionError;
use crate::utils::remove_file_if_exists;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Derives an audio file from a media file
#[async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Extract `media`'s audio track into `audio`, returning the written path
    ///
    /// Failures are reported as [`AcquisitionError::ExtractionFailed`] and
    /// leave no partial output behind.
    async fn extract(&self, media: &Path, audio: &Path) -> Result<PathBuf, AcquisitionError>;
}

/// ffmpeg-based mp3 extraction
pub struct FfmpegExtractor {
    runner: ToolRunner,
}

impl FfmpegExtractor {
    /// Create an extractor around an ffmpeg runner
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl AudioExtractor for FfmpegExtractor {
    async fn extract(&self, media: &Path, audio: &Path) -> Result<PathBuf, AcquisitionError> {
        let args: Vec<OsString> = vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            media.as_os_str().to_owned(),
            "-vn".into(),
            "-codec:a".into(),
            "libmp3lame".into(),
            "-q:a".into(),
            "0".into(),
            audio.as_os_str().to_owned(),
        ];

        let outcome = match self.runner.run(args).await {
            Ok(_) => match tokio::fs::try_exists(audio).await {
                Ok(true) => Ok(()),
                Ok(false) => Err("ffmpeg exited successfully but wrote no output".to_string()),
                Err(e) => Err(format!("cannot check output: {}", e)),
            },
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(()) => {
                debug!(media = %media.display(), audio = %audio.display(), "extracted audio");
                Ok(audio.to_path_buf())
            }
            Err(reason) => {
                if let Err(e) = remove_file_if_exists(audio).await {
                    warn!(audio = %audio.display(), error = %e, "failed to remove partial audio output");
                }
                Err(AcquisitionError::ExtractionFailed {
                    media: media.to_path_buf(),
                    reason,
                })
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::acquisition::test_helpers::{WRITING_TOOL, write_stub};

    #[tokio::test]
    async fn writes_audio_next_to_media() {
        let dir = tempfile::tempdir().unwrap();
        let stub = write_stub(dir.path(), "ffmpeg", WRITING_TOOL);
        let media = dir.path().join("clip.mp4");
        std::fs::write(&media, b"video").unwrap();
        let audio = dir.path().join("clip.mp3");

        let extractor = FfmpegExtractor::new(ToolRunner::new("ffmpeg", stub));
        let written = extractor.extract(&media, &audio).await.unwrap();

        assert_eq!(written, audio);
        assert!(audio.exists());
    }

    #[tokio::test]
    async fn failure_removes_partial_output() {
        let dir = tempfile::tempdir().unwrap();
        // Writes the output file, then fails
        let stub = write_stub(
            dir.path(),
            "ffmpeg",
            "#!/bin/sh\nfor last; do :; done\nprintf partial > \"$last\"\necho 'Invalid data found' >&2\nexit 1\n",
        );
        let media = dir.path().join("clip.mp4");
        std::fs::write(&media, b"not really video").unwrap();
        let audio = dir.path().join("clip.mp3");

        let extractor = FfmpegExtractor::new(ToolRunner::new("ffmpeg", stub));
        let err = extractor.extract(&media, &audio).await.unwrap_err();

        match err {
            AcquisitionError::ExtractionFailed { media: m, reason } => {
                assert_eq!(m, media);
                assert!(reason.contains("Invalid data found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!audio.exists(), "partial output must be removed");
    }

    #[tokio::test]
    async fn missing_ffmpeg_is_an_extraction_failure() {
        let dir = tempfile::tempdir().unwrap();
        let extractor =
            FfmpegExtractor::new(ToolRunner::new("ffmpeg", dir.path().join("no-ffmpeg")));

        let err = extractor
            .extract(&dir.path().join("a.mp4"), &dir.path().join("a.mp3"))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "extraction_failed");
    }
}

//! Test helpers for acquisition: shell stubs standing in for yt-dlp and ffmpeg,
//! and scripted in-process strategies.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::{Acquired, AcquisitionRequest, AcquisitionStrategy, AudioExtractor};
use crate::error::AcquisitionError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Writes `payload` to the `-o` argument (with `%(ext)s` resolved to mp3), or
/// to the last argument when there is no `-o`
pub(crate) const WRITING_TOOL: &str = r#"#!/bin/sh
out=""
prev=""
last=""
for arg in "$@"; do
  if [ "$prev" = "-o" ]; then out="$arg"; fi
  prev="$arg"
  last="$arg"
done
if [ -z "$out" ]; then out="$last"; fi
out=$(printf '%s' "$out" | sed 's/%(ext)s/mp3/')
printf 'payload' > "$out"
"#;

/// Always fails with a yt-dlp style error
pub(crate) const FAILING_TOOL: &str = "#!/bin/sh\necho 'ERROR: Video unavailable' >&2\nexit 1\n";

/// Write an executable script into `dir`
#[cfg(unix)]
pub(crate) fn write_stub(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    {
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(script.as_bytes()).unwrap();
        file.sync_all().unwrap();
    }
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// What a [`ScriptedStrategy`] does when invoked
#[derive(Clone, Debug)]
pub(crate) enum Script {
    /// Write the item id to the audio output and succeed
    Audio,
    /// Write the media output and succeed
    Media,
    /// Fail with this error
    Fail(AcquisitionError),
    /// Fail with a tool error for the listed item ids, write media otherwise
    FailFor(Vec<String>),
    /// Panic for the listed item ids, write media otherwise
    PanicFor(Vec<String>),
}

/// In-process strategy with scripted behavior and a call log
pub(crate) struct ScriptedStrategy {
    name: &'static str,
    script: Script,
    calls: Mutex<Vec<String>>,
    delay: std::time::Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedStrategy {
    pub(crate) fn new(name: &'static str, script: Script) -> Self {
        Self {
            name,
            script,
            calls: Mutex::new(Vec::new()),
            delay: std::time::Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: std::time::Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Item ids this strategy was invoked for, in call order
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of simultaneous invocations observed
    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AcquisitionStrategy for ScriptedStrategy {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn acquire(
        &self,
        request: &AcquisitionRequest<'_>,
    ) -> Result<Acquired, AcquisitionError> {
        let id = request.item.id.clone();
        self.calls.lock().unwrap().push(id.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let write_media = || -> Result<Acquired, AcquisitionError> {
            std::fs::write(&request.paths.media, b"media").unwrap();
            Ok(Acquired::Media(request.paths.media.clone()))
        };

        match &self.script {
            Script::Audio => {
                std::fs::write(&request.paths.audio, id.as_bytes()).unwrap();
                Ok(Acquired::Audio(request.paths.audio.clone()))
            }
            Script::Media => write_media(),
            Script::Fail(e) => Err(e.clone()),
            Script::FailFor(ids) if ids.contains(&id) => {
                Err(AcquisitionError::tool("scripted", format!("{id} always fails")))
            }
            Script::PanicFor(ids) if ids.contains(&id) => panic!("scripted panic for {id}"),
            Script::FailFor(_) | Script::PanicFor(_) => write_media(),
        }
    }
}

/// Extractor that writes the audio file, or fails when `fail` is set
pub(crate) struct StubExtractor {
    pub(crate) fail: bool,
}

#[async_trait]
impl AudioExtractor for StubExtractor {
    async fn extract(&self, media: &Path, audio: &Path) -> Result<PathBuf, AcquisitionError> {
        if self.fail {
            return Err(AcquisitionError::ExtractionFailed {
                media: media.to_path_buf(),
                reason: "no audio stream".to_string(),
            });
        }
        std::fs::write(audio, b"audio").unwrap();
        Ok(audio.to_path_buf())
    }
}

//! Test configuration helpers

use std::path::Path;
use std::time::Duration;
use vidrelay::Config;
use vidrelay::config::RetryConfig;

/// A configuration rooted in `dir` that uses the given tool binaries and never
/// searches PATH
pub fn test_config(dir: &Path, yt_dlp: &Path, ffmpeg: &Path) -> Config {
    let mut config = Config::default();
    config.download.download_dir = dir.join("downloads");
    config.download.max_workers = 2;
    config.tools.yt_dlp_path = Some(yt_dlp.to_path_buf());
    config.tools.ffmpeg_path = Some(ffmpeg.to_path_buf());
    config.tools.search_path = false;
    config.tools.tool_timeout = Some(Duration::from_secs(30));
    config.retry = fast_retry();
    config
}

/// Retry policy with short delays so failing tests finish quickly
pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 1,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(20),
        backoff_multiplier: 1.0,
        jitter: false,
    }
}

//! Utility functions for output path construction

use crate::types::CandidateItem;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};

/// Placeholder media extension written when audio was fetched directly
pub const PLACEHOLDER_EXTENSION: &str = "mp4_dummy";

/// Make a title safe for use as a file stem
///
/// Keeps alphanumerics, spaces, `-` and `_`, maps every other character to
/// `_`, then trims surrounding whitespace. Falls back to `fallback` (usually
/// the item id) when nothing is left.
///
/// # Examples
///
/// ```
/// use vidrelay::utils::safe_file_stem;
///
/// assert_eq!(safe_file_stem("Rust: Part 1/2", "abc"), "Rust_ Part 1_2");
/// assert_eq!(safe_file_stem("   ", "abc"), "abc");
/// ```
pub fn safe_file_stem(title: &str, fallback: &str) -> String {
    let mapped: String = title
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, ' ' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = mapped.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Per-day output directory: `<download_dir>/<YYYYMMDD>`
pub fn dated_dir(download_dir: &Path, date: NaiveDate) -> PathBuf {
    download_dir.join(date.format("%Y%m%d").to_string())
}

/// Output file locations for one item
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputPaths {
    /// Directory all files for this item are written to
    pub dir: PathBuf,
    /// Audio file (`<safe title>_<id>.mp3`)
    pub audio: PathBuf,
    /// Media file (`<safe title>_<id>.mp4`)
    pub media: PathBuf,
    /// Placeholder media path recorded for direct audio fetches
    pub placeholder: PathBuf,
}

impl OutputPaths {
    /// Compute the output paths for `item` under `dir`
    ///
    /// Every stem carries the item id: titles repeat across items, and two
    /// items must never share an output file.
    pub fn for_item(dir: &Path, item: &CandidateItem) -> Self {
        // Feed ids can be URLs, so the id is sanitized too
        let id = safe_file_stem(&item.id, "item");
        let title = safe_file_stem(&item.title, &id);
        let stem = if title == id {
            id
        } else {
            format!("{title}_{id}")
        };
        let audio = dir.join(format!("{stem}.mp3"));
        let placeholder = audio.with_extension(PLACEHOLDER_EXTENSION);
        let media = dir.join(format!("{stem}.mp4"));

        Self {
            dir: dir.to_path_buf(),
            audio,
            media,
            placeholder,
        }
    }
}

/// Remove a file, ignoring "not found"
pub async fn remove_file_if_exists(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

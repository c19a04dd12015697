//! Page and feed fixtures, and shell stubs standing in for yt-dlp and ffmpeg

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};

/// Writes a payload to the `-o` argument (with `%(ext)s` resolved to mp3), or
/// to the last argument when there is no `-o`. Every invocation is appended to
/// `calls.log` next to the script.
pub const WRITING_TOOL: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
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

/// Fails like yt-dlp does for an unavailable video
pub const FAILING_TOOL: &str = r#"#!/bin/sh
echo "$@" >> "$(dirname "$0")/calls.log"
echo 'ERROR: [youtube] Video unavailable' >&2
exit 1
"#;

/// Write an executable script into `dir`
pub fn write_stub(dir: &Path, name: &str, script: &str) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    {
        let mut file = std::fs::File::create(&path).expect("create stub");
        file.write_all(script.as_bytes()).expect("write stub");
        file.sync_all().expect("sync stub");
    }
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("chmod stub");
    path
}

/// Lines of the `calls.log` written by the stubs in `dir`
pub fn stub_calls(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("calls.log"))
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

/// A channel `/videos` page embedding one `videoRenderer` per entry
/// (`(video id, title, published text)`)
pub fn channel_page(entries: &[(&str, &str, &str)]) -> String {
    let items: Vec<Value> = entries
        .iter()
        .map(|(id, title, published)| {
            json!({
                "richItemRenderer": { "content": { "videoRenderer": {
                    "videoId": id,
                    "title": { "runs": [ { "text": title } ] },
                    "publishedTimeText": { "simpleText": published }
                } } }
            })
        })
        .collect();

    let data = json!({
        "contents": { "twoColumnBrowseResultsRenderer": { "tabs": [
            { "tabRenderer": { "content": { "richGridRenderer": { "contents": items } } } }
        ] } }
    });

    format!(
        "<!DOCTYPE html><html><head><title>Channel</title></head><body>\
         <script nonce=\"x\">var ytInitialData = {};</script></body></html>",
        data
    )
}

/// An RSS 2.0 feed; entries are `(guid, title, link, age in days)`
pub fn rss_feed(entries: &[(&str, &str, &str, i64)]) -> String {
    let items: String = entries
        .iter()
        .map(|(guid, title, link, age_days)| {
            let published = (Utc::now() - Duration::days(*age_days)).to_rfc2822();
            format!(
                "<item><guid>{guid}</guid><title>{title}</title><link>{link}</link>\
                 <pubDate>{published}</pubDate></item>"
            )
        })
        .collect();

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test Feed</title><link>https://example.com</link>
<description>fixture</description>{items}</channel></rss>"#
    )
}

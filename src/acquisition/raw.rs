//! Raw HTTP stream fallback
//!
//! Last-resort strategy: GET the item's source URL and stream the body to the
//! media path. Only media bodies are accepted; an HTML page (what a watch URL
//! returns) is a transport failure, not a payload.

use super::{Acquired, AcquisitionRequest, AcquisitionStrategy};
use crate::config::RetryConfig;
use crate::error::{AcquisitionError, Error, Result};
use crate::retry::download_with_retry;
use crate::utils::remove_file_if_exists;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Streams the source URL straight to disk
pub struct RawStreamFetch {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl RawStreamFetch {
    /// Create the strategy with its own HTTP client
    pub fn new(retry: RetryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent("vidrelay")
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client, retry })
    }

    /// One attempt: download into `<media>.part`, then rename into place
    async fn fetch_once(&self, url: &str, media: &Path) -> Result<u64> {
        let mut response = self.client.get(url).send().await?.error_for_status()?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        if content_type.starts_with("text/html") {
            return Err(Error::Other(format!(
                "response is {content_type}, not a media stream"
            )));
        }

        let partial = media.with_extension("part");
        let written = async {
            let mut file = tokio::fs::File::create(&partial).await?;
            let mut written: u64 = 0;
            while let Some(chunk) = response.chunk().await? {
                file.write_all(&chunk).await?;
                written += chunk.len() as u64;
            }
            file.flush().await?;
            file.sync_all().await?;
            Ok::<_, Error>(written)
        }
        .await;

        let written = match written {
            Ok(0) => Err(Error::Other("empty response body".to_string())),
            other => other,
        };

        match written {
            Ok(bytes) => {
                tokio::fs::rename(&partial, media).await?;
                Ok(bytes)
            }
            Err(e) => {
                if let Err(rm) = remove_file_if_exists(&partial).await {
                    warn!(path = %partial.display(), error = %rm, "failed to remove partial download");
                }
                Err(e)
            }
        }
    }
}

#[async_trait]
impl AcquisitionStrategy for RawStreamFetch {
    fn name(&self) -> &'static str {
        "raw-stream"
    }

    async fn acquire(
        &self,
        request: &AcquisitionRequest<'_>,
    ) -> std::result::Result<Acquired, AcquisitionError> {
        let url = request.item.source_url.as_str();
        let media = &request.paths.media;

        let bytes = download_with_retry(&self.retry, || self.fetch_once(url, media))
            .await
            .map_err(|e| AcquisitionError::transport(url, e.to_string()))?;

        debug!(item_id = %request.item.id, bytes, media = %media.display(), "fetched raw stream");
        Ok(Acquired::Media(media.clone()))
    }
}

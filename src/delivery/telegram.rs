//! Telegram Bot API channel

use super::DeliveryChannel;
use crate::config::TelegramConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bot API upload limit for documents
const MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Delivers through a Telegram bot to the configured chats
pub struct TelegramChannel {
    client: reqwest::Client,
    api_base: String,
    token: String,
    chat_ids: Vec<String>,
    logged_in: AtomicBool,
}

impl TelegramChannel {
    /// Create the channel from its configuration
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.bot_token.clone(),
            chat_ids: config
                .recipients
                .iter()
                .map(|r| r.chat_id.clone())
                .collect(),
            logged_in: AtomicBool::new(false),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    /// Check an API response; the token never appears in errors
    async fn check(&self, method: &str, response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body: ApiResponse = response.json().await.map_err(|e| Error::Delivery {
            channel: "telegram".to_string(),
            message: format!(
                "{method}: unreadable response (HTTP {status}): {}",
                e.without_url()
            ),
        })?;

        if body.ok {
            Ok(())
        } else {
            Err(Error::Delivery {
                channel: "telegram".to_string(),
                message: format!(
                    "{method}: {}",
                    body.description.unwrap_or_else(|| format!("HTTP {status}"))
                ),
            })
        }
    }

    async fn send(&self, method: &str, request: reqwest::RequestBuilder) -> Result<()> {
        let response = request.send().await.map_err(|e| Error::Delivery {
            channel: "telegram".to_string(),
            message: format!("{method}: {}", e.without_url()),
        })?;
        self.check(method, response).await
    }

    async fn upload(&self, chat_id: &str, path: &Path) -> Result<()> {
        let size = tokio::fs::metadata(path).await?.len();
        if size > MAX_UPLOAD_BYTES {
            return Err(Error::Delivery {
                channel: "telegram".to_string(),
                message: format!(
                    "{} is {} bytes, above the {} byte upload limit",
                    path.display(),
                    size,
                    MAX_UPLOAD_BYTES
                ),
            });
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let bytes = tokio::fs::read(path).await?;
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part("document", Part::bytes(bytes).file_name(file_name));

        self.send(
            "sendDocument",
            self.client.post(self.method_url("sendDocument")).multipart(form),
        )
        .await
    }
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn targets(&self) -> Vec<String> {
        self.chat_ids.clone()
    }

    async fn login(&self) -> bool {
        if self.token.trim().is_empty() {
            warn!("telegram bot token is not configured");
            return false;
        }

        match self
            .send("getMe", self.client.get(self.method_url("getMe")))
            .await
        {
            Ok(()) => {
                info!(recipients = self.chat_ids.len(), "logged in to telegram");
                self.logged_in.store(true, Ordering::SeqCst);
                true
            }
            Err(e) => {
                warn!(error = %e, "telegram login failed");
                false
            }
        }
    }

    async fn logout(&self) {
        if self.logged_in.swap(false, Ordering::SeqCst) {
            debug!("telegram session closed");
        }
    }

    async fn send_text(&self, target: &str, text: &str) -> bool {
        let request = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&serde_json::json!({ "chat_id": target, "text": text }));

        match self.send("sendMessage", request).await {
            Ok(()) => {
                debug!(chat_id = %target, "sent telegram message");
                true
            }
            Err(e) => {
                warn!(chat_id = %target, error = %e, "failed to send telegram message");
                false
            }
        }
    }

    async fn send_file(&self, target: &str, path: &Path) -> bool {
        match self.upload(target, path).await {
            Ok(()) => {
                info!(chat_id = %target, file = %path.display(), "sent file via telegram");
                true
            }
            Err(e) => {
                warn!(
                    chat_id = %target,
                    file = %path.display(),
                    error = %e,
                    "failed to send file via telegram"
                );
                false
            }
        }
    }
}

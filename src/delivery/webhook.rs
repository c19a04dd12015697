//! Webhook channel: JSON notifications for delivered items.
//!
//! Files are announced, not uploaded; the payload carries the local path and
//! size so the receiver can pick the file up itself.

use super::DeliveryChannel;
use crate::config::WebhookConfig;
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

/// Body POSTed to the webhook URL
#[derive(Debug, Serialize)]
struct DeliveryPayload<'a> {
    event: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    timestamp: i64,
}

/// POSTs each delivery to one configured URL
pub struct WebhookChannel {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl WebhookChannel {
    /// Create a channel for one webhook target
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn post(&self, target: &str, payload: &DeliveryPayload<'_>) -> bool {
        let mut request = self
            .client
            .post(target)
            .json(payload)
            .timeout(self.config.timeout);

        if let Some(auth) = &self.config.auth_header {
            request = request.header("Authorization", auth);
        }

        match tokio::time::timeout(self.config.timeout, request.send()).await {
            Ok(Ok(response)) => {
                if response.status().is_success() {
                    tracing::debug!(
                        url = %target,
                        event = payload.event,
                        "webhook sent successfully"
                    );
                    true
                } else {
                    let error_msg = format!(
                        "Webhook returned status {}: {}",
                        response.status(),
                        response.text().await.unwrap_or_default()
                    );
                    tracing::warn!(url = %target, error = %error_msg, "webhook failed");
                    false
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %target, error = %e, "webhook request failed");
                false
            }
            Err(_) => {
                tracing::warn!(url = %target, timeout = ?self.config.timeout, "webhook timed out");
                false
            }
        }
    }
}

#[async_trait]
impl DeliveryChannel for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn targets(&self) -> Vec<String> {
        vec![self.config.url.clone()]
    }

    async fn login(&self) -> bool {
        // stateless
        true
    }

    async fn logout(&self) {}

    async fn send_text(&self, target: &str, text: &str) -> bool {
        let payload = DeliveryPayload {
            event: "message",
            text: Some(text),
            path: None,
            file_name: None,
            size_bytes: None,
            timestamp: chrono::Utc::now().timestamp(),
        };
        self.post(target, &payload).await
    }

    async fn send_file(&self, target: &str, path: &Path) -> bool {
        let size_bytes = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "cannot announce missing file");
                return false;
            }
        };

        let payload = DeliveryPayload {
            event: "file",
            text: None,
            path: Some(path.display().to_string()),
            file_name: path.file_name().map(|n| n.to_string_lossy().into_owned()),
            size_bytes: Some(size_bytes),
            timestamp: chrono::Utc::now().timestamp(),
        };
        self.post(target, &payload).await
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn channel(server: &MockServer, auth: Option<&str>) -> WebhookChannel {
        WebhookChannel::new(WebhookConfig {
            url: format!("{}/hook", server.uri()),
            auth_header: auth.map(str::to_string),
            timeout: Duration::from_secs(5),
        })
    }

    #[tokio::test]
    async fn text_is_posted_with_auth_header() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("Authorization", "Bearer secret"))
            .and(body_partial_json(serde_json::json!({
                "event": "message",
                "text": "New video from A: B"
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let webhook = channel(&server, Some("Bearer secret"));
        let target = webhook.targets().remove(0);
        assert!(webhook.login().await);
        assert!(webhook.send_text(&target, "New video from A: B").await);
    }

    #[tokio::test]
    async fn file_is_announced_with_size() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "event": "file",
                "file_name": "episode.mp3",
                "size_bytes": 5
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("episode.mp3");
        std::fs::write(&file, b"audio").unwrap();

        let webhook = channel(&server, None);
        let target = webhook.targets().remove(0);
        assert!(webhook.send_file(&target, &file).await);
    }

    #[tokio::test]
    async fn error_status_is_a_failed_send() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let webhook = channel(&server, None);
        let target = webhook.targets().remove(0);
        assert!(!webhook.send_text(&target, "hello").await);
    }

    #[tokio::test]
    async fn missing_file_is_not_announced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let webhook = channel(&server, None);
        let target = webhook.targets().remove(0);
        assert!(!webhook.send_file(&target, &dir.path().join("gone.mp3")).await);
    }
}

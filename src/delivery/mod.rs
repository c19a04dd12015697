//! Delivery channels: where acquired items are sent.
//!
//! Delivery is best-effort. Every operation reports success as a `bool` and
//! logs its own failures; nothing here can fail a run.

mod telegram;
mod webhook;

pub use telegram::TelegramChannel;
pub use webhook::WebhookChannel;

use async_trait::async_trait;
use std::path::Path;

/// A messaging channel that can deliver text and files to its targets
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Channel name for logs (e.g., "telegram")
    fn name(&self) -> &str;

    /// Targets every item is delivered to (chat ids, URLs)
    fn targets(&self) -> Vec<String>;

    /// Establish a session; false disables the channel for this run
    async fn login(&self) -> bool;

    /// End the session; called on every exit path of a run
    async fn logout(&self);

    /// Send a text message to `target`
    async fn send_text(&self, target: &str, text: &str) -> bool;

    /// Send the file at `path` to `target`
    async fn send_file(&self, target: &str, path: &Path) -> bool;
}

/// Fill a message template; `{channel}` and `{title}` are substituted
///
/// ```
/// use vidrelay::delivery::render_message;
///
/// let text = render_message("New video from {channel}: {title}", "Rust", "Ownership");
/// assert_eq!(text, "New video from Rust: Ownership");
/// ```
pub fn render_message(template: &str, channel: &str, title: &str) -> String {
    template
        .replace("{channel}", channel)
        .replace("{title}", title)
}

//! Application runner: one pipeline pass per source, then delivery.
//!
//! [`App::run_once`] is a complete cycle; [`App::run_continuously`] repeats it
//! on the configured interval until shut down.

use crate::config::{Config, SourceConfig};
use crate::delivery::{DeliveryChannel, TelegramChannel, WebhookChannel, render_message};
use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::types::AcquisitionResult;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counts for one completed cycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Items acquired across all sources
    pub acquired: usize,
    /// Items whose acquisition failed (retried next cycle)
    pub failed: usize,
    /// Files delivered, counted once per target
    pub files_sent: usize,
    /// Text messages delivered, counted once per target
    pub messages_sent: usize,
}

impl RunSummary {
    /// Files acquired plus files sent
    pub fn total(&self) -> usize {
        self.acquired + self.files_sent
    }
}

/// Pipeline plus delivery channels, driven by the configuration
pub struct App {
    config: Config,
    pipeline: Pipeline,
    channels: Vec<Arc<dyn DeliveryChannel>>,
    skip_delivery: bool,
}

impl App {
    /// Build the application from configuration
    ///
    /// Telegram is registered when a token and recipients are configured;
    /// every webhook entry becomes its own channel.
    pub async fn new(config: Config) -> Result<Self> {
        let pipeline = Pipeline::from_config(&config).await?;
        let mut app = Self::with_pipeline(config, pipeline);

        if app.config.telegram.is_enabled() {
            let telegram = TelegramChannel::new(&app.config.telegram)?;
            app.channels.push(Arc::new(telegram));
        } else {
            debug!("telegram delivery not configured");
        }
        for webhook in app.config.webhooks.clone() {
            app.channels.push(Arc::new(WebhookChannel::new(webhook)));
        }

        Ok(app)
    }

    /// Wrap an existing pipeline; no delivery channels are registered
    pub fn with_pipeline(config: Config, pipeline: Pipeline) -> Self {
        Self {
            config,
            pipeline,
            channels: Vec::new(),
            skip_delivery: false,
        }
    }

    /// Register an additional delivery channel
    pub fn with_channel(mut self, channel: Arc<dyn DeliveryChannel>) -> Self {
        self.channels.push(channel);
        self
    }

    /// Acquire only; never log in or send
    pub fn skip_delivery(mut self, skip: bool) -> Self {
        self.skip_delivery = skip;
        self
    }

    /// The underlying pipeline
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The loaded configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one full cycle over every configured source
    pub async fn run_once(&self) -> RunSummary {
        let mut summary = RunSummary::default();

        if self.config.sources.is_empty() {
            warn!("no sources configured, nothing to do");
            return summary;
        }

        let active = self.login_all().await;

        for source in &self.config.sources {
            let run = self.pipeline.fetch_source(source).await;
            let acquired = run.success_count();
            summary.acquired += acquired;
            summary.failed += run.results.len() - acquired;

            for result in run.successes() {
                for channel in &active {
                    self.deliver(channel.as_ref(), source, result, &mut summary)
                        .await;
                }
            }
        }

        for channel in &active {
            channel.logout().await;
        }

        info!(
            acquired = summary.acquired,
            failed = summary.failed,
            files_sent = summary.files_sent,
            messages_sent = summary.messages_sent,
            "run completed"
        );
        summary
    }

    /// Repeat [`run_once`](Self::run_once) every `app.check_interval_hours`
    ///
    /// The token is checked between cycles; a cycle in progress always runs to
    /// completion.
    pub async fn run_continuously(&self, shutdown: CancellationToken) {
        let interval = self.config.app.check_interval();
        info!(interval = ?interval, "starting continuous mode");

        while !shutdown.is_cancelled() {
            let summary = self.run_once().await;
            debug!(total = summary.total(), "cycle finished");

            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = tokio::time::sleep(interval) => {}
            }
        }

        info!("continuous mode stopped");
    }

    async fn login_all(&self) -> Vec<Arc<dyn DeliveryChannel>> {
        if self.skip_delivery {
            info!("delivery skipped, download only");
            return Vec::new();
        }

        let mut active = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            if channel.login().await {
                active.push(channel.clone());
            } else {
                error!(channel = channel.name(), "login failed, continuing without this channel");
            }
        }
        active
    }

    async fn deliver(
        &self,
        channel: &dyn DeliveryChannel,
        source: &SourceConfig,
        result: &AcquisitionResult,
        summary: &mut RunSummary,
    ) {
        let text = self.config.telegram.send_message_with_video.then(|| {
            render_message(
                &self.config.telegram.message_template,
                &source.name,
                &result.item.title,
            )
        });
        let files = self.deliverable_files(result);

        for target in channel.targets() {
            if let Some(text) = &text
                && channel.send_text(&target, text).await
            {
                summary.messages_sent += 1;
            }

            for file in &files {
                if channel.send_file(&target, file).await {
                    summary.files_sent += 1;
                }
            }
        }
    }

    /// Files to send for one result: the audio, plus the media file when it is
    /// kept or there is no audio. Placeholders are never returned.
    fn deliverable_files<'a>(&self, result: &'a AcquisitionResult) -> Vec<&'a Path> {
        let mut files = Vec::with_capacity(2);
        if let Some(audio) = &result.audio_path {
            files.push(audio.as_path());
        }
        if let Some(media) = result.media_file()
            && (self.config.download.keep_media_after_conversion || result.audio_path.is_none())
        {
            files.push(media);
        }
        files
    }
}

/// Run `app` continuously until SIGTERM or SIGINT
pub async fn run_until_signal(app: &App) {
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    let signals = tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown requested, stopping after the current cycle");
        trigger.cancel();
    });

    app.run_continuously(shutdown).await;
    signals.abort();
}

/// Wait for a termination signal
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
#[cfg(unix)]
pub async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => info!("received SIGTERM"),
                _ = sigint.recv() => info!("received SIGINT"),
            }
        }
        (Err(e), Ok(mut sigint)) => {
            warn!(error = %e, "could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            info!("received SIGINT");
        }
        (Ok(mut sigterm), Err(e)) => {
            warn!(error = %e, "could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            info!("received SIGTERM");
        }
        (Err(_), Err(e)) => {
            error!(error = %e, "could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

/// Wait for Ctrl+C
#[cfg(not(unix))]
pub async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C"),
        Err(e) => error!(error = %e, "failed to listen for Ctrl+C"),
    }
}

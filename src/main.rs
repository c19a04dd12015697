//! # vidrelay
//!
//! Polls the configured channels, acquires new videos (audio preferred) and
//! relays them to Telegram and webhook targets.
//!
//! ## Usage
//!
//! ```sh
//! vidrelay --config config.yaml            # one cycle
//! vidrelay --config config.yaml --daemon   # every check_interval_hours
//! ```

use clap::Parser;
use std::error::Error;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use vidrelay::config::{AppConfig, SourceConfig, TelegramRecipient, validate_source_url};
use vidrelay::{App, Config};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let mut config = Config::load_or_default(&cli.config);
    init_tracing(&config.app);

    match cli.command {
        Some(Command::AddSource(args)) => {
            validate_source_url(&args.url)?;
            let mut source = SourceConfig::new(args.name, args.url);
            source.kind = args.kind.into();
            source.days_to_check = args.days;
            source.max_items = args.max_items;

            let name = source.name.clone();
            if config.add_source(source) {
                config.save(&cli.config)?;
                println!("Source '{}' added", name);
            } else {
                println!("Source '{}' not added: URL already configured", name);
            }
            return Ok(());
        }
        Some(Command::AddRecipient(args)) => {
            let chat_id = args.chat_id.clone();
            let recipient = TelegramRecipient {
                chat_id: args.chat_id,
                name: args.name,
            };
            if config.add_telegram_recipient(recipient) {
                config.save(&cli.config)?;
                println!("Recipient '{}' added", chat_id);
            } else {
                println!("Recipient '{}' not added: already configured", chat_id);
            }
            return Ok(());
        }
        None => {}
    }

    if let Some(max_workers) = cli.max_workers {
        config.download.max_workers = max_workers.max(1);
    }

    info!(
        config = %cli.config.display(),
        sources = config.sources.len(),
        daemon = cli.daemon,
        "vidrelay starting"
    );

    let app = App::new(config).await?.skip_delivery(cli.skip_delivery);

    if cli.daemon {
        vidrelay::run_until_signal(&app).await;
    } else {
        let summary = app.run_once().await;
        info!(
            acquired = summary.acquired,
            failed = summary.failed,
            files_sent = summary.files_sent,
            "done"
        );
    }

    Ok(())
}

/// Install the global subscriber: stderr always, plus the configured log file
///
/// `RUST_LOG` takes precedence over `app.log_level`.
fn init_tracing(app: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&app.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut file_error = None;
    let file_layer = app.log_file.as_ref().and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                file_error = Some(format!("{}: {}", path.display(), e));
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    if let Some(error) = file_error {
        warn!(error = %error, "could not open log file, logging to stderr only");
    }
}

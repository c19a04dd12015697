//! Command-line interface for the `vidrelay` binary.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use vidrelay::config::SourceKind;

/// Fetch new videos from channels and relay them to messaging channels
///
/// # Examples
///
/// ```sh
/// # One cycle over every configured source
/// vidrelay --config config.yaml
///
/// # Keep running every `app.check_interval_hours`
/// vidrelay --daemon
///
/// # Register a channel
/// vidrelay add-source --name "Rust" --url https://www.youtube.com/@rust --days 3
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML configuration file (created with defaults if missing)
    #[arg(short, long, env = "VIDRELAY_CONFIG", default_value = "config.yaml")]
    pub config: PathBuf,

    /// Run a single cycle and exit (the default)
    #[arg(short, long, conflicts_with = "daemon")]
    pub run_once: bool,

    /// Run continuously at the configured interval until SIGINT/SIGTERM
    #[arg(short, long)]
    pub daemon: bool,

    /// Download only; do not log in to or send through delivery channels
    #[arg(long)]
    pub skip_delivery: bool,

    /// Override `download.max_workers`
    #[arg(long)]
    pub max_workers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Configuration maintenance commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a content source to the configuration
    AddSource(AddSourceArgs),
    /// Add a Telegram recipient to the configuration
    AddRecipient(AddRecipientArgs),
}

/// Arguments for `add-source`
#[derive(Args, Debug)]
pub struct AddSourceArgs {
    /// Display name used in delivery messages
    #[arg(long)]
    pub name: String,

    /// Channel or feed URL
    #[arg(long)]
    pub url: String,

    /// Recency window in days
    #[arg(long, default_value_t = 7)]
    pub days: u32,

    /// Number of newest items to look at
    #[arg(long, default_value_t = 3)]
    pub max_items: usize,

    /// How the source is listed
    #[arg(long, value_enum, default_value_t = KindArg::ChannelPage)]
    pub kind: KindArg,
}

/// Arguments for `add-recipient`
#[derive(Args, Debug)]
pub struct AddRecipientArgs {
    /// Telegram chat id (numeric id or @channel name)
    #[arg(long, allow_hyphen_values = true)]
    pub chat_id: String,

    /// Optional name for reference
    #[arg(long)]
    pub name: Option<String>,
}

/// Source kind as accepted on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    /// Scrape the channel's video listing page
    ChannelPage,
    /// Read an RSS or Atom feed
    Feed,
}

impl From<KindArg> for SourceKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::ChannelPage => SourceKind::ChannelPage,
            KindArg::Feed => SourceKind::Feed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_a_single_run() {
        let cli = Cli::parse_from(["vidrelay"]);

        assert_eq!(cli.config, PathBuf::from("config.yaml"));
        assert!(!cli.daemon);
        assert!(!cli.skip_delivery);
        assert!(cli.max_workers.is_none());
        assert!(cli.command.is_none());
    }

    #[test]
    fn run_flags() {
        let cli = Cli::parse_from([
            "vidrelay",
            "-c",
            "/etc/vidrelay.yaml",
            "--daemon",
            "--skip-delivery",
            "--max-workers",
            "8",
        ]);

        assert_eq!(cli.config, PathBuf::from("/etc/vidrelay.yaml"));
        assert!(cli.daemon);
        assert!(cli.skip_delivery);
        assert_eq!(cli.max_workers, Some(8));
    }

    #[test]
    fn run_once_conflicts_with_daemon() {
        assert!(Cli::try_parse_from(["vidrelay", "--run-once", "--daemon"]).is_err());
    }

    #[test]
    fn add_source_subcommand() {
        let cli = Cli::parse_from([
            "vidrelay",
            "add-source",
            "--name",
            "Feed",
            "--url",
            "https://example.com/feed.xml",
            "--kind",
            "feed",
            "--days",
            "2",
        ]);

        match cli.command {
            Some(Command::AddSource(args)) => {
                assert_eq!(args.name, "Feed");
                assert_eq!(args.days, 2);
                assert_eq!(args.max_items, 3);
                assert_eq!(SourceKind::from(args.kind), SourceKind::Feed);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_recipient_subcommand() {
        let cli = Cli::parse_from(["vidrelay", "add-recipient", "--chat-id", "-100123"]);

        match cli.command {
            Some(Command::AddRecipient(args)) => {
                assert_eq!(args.chat_id, "-100123");
                assert!(args.name.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}

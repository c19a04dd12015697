//! # vidrelay
//!
//! Polls video channels for new uploads, acquires them (audio preferred) and
//! relays the results to messaging channels.
//!
//! ## Pipeline
//!
//! 1. **List**: a [`source::ContentSource`] returns the newest entries of a
//!    channel page or feed
//! 2. **Filter**: entries outside the recency window or already in the
//!    [`ledger::DedupLedger`] are dropped
//! 3. **Acquire**: a bounded [`pool::WorkerPool`] runs the
//!    [`acquisition::StrategyChain`] (yt-dlp audio, yt-dlp video, raw HTTP
//!    fetch) for each remaining item
//! 4. **Deliver**: [`App`] sends texts and files through every
//!    [`delivery::DeliveryChannel`] that logged in
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidrelay::{App, Config};
//! use vidrelay::config::SourceConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.add_source(SourceConfig::new("Rust", "https://www.youtube.com/@rust"));
//!
//!     let app = App::new(config).await?;
//!
//!     // Subscribe to pipeline events
//!     let mut events = app.pipeline().subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let summary = app.run_once().await;
//!     println!("acquired {} items", summary.acquired);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Acquisition strategies and the fallback chain
pub mod acquisition;
/// Application runner (run once, run continuously, signal handling)
pub mod app;
/// Configuration types
pub mod config;
/// Delivery channels (Telegram, webhooks)
pub mod delivery;
/// Error types
pub mod error;
/// Persistent record of acquired items
pub mod ledger;
/// List, filter, acquire
pub mod pipeline;
/// Bounded-concurrency acquisition
pub mod pool;
/// Recency window policy
pub mod recency;
/// Retry logic with exponential backoff
pub mod retry;
/// Content sources (channel pages, feeds)
pub mod source;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use app::{App, RunSummary, run_until_signal, wait_for_signal};
pub use config::{Config, SourceConfig, SourceKind};
pub use error::{AcquisitionError, Error, Result};
pub use ledger::DedupLedger;
pub use pipeline::Pipeline;
pub use types::{
    AcquisitionResult, AcquisitionStatus, CandidateItem, Event, MediaPath, PipelineRun,
    PublishSignal, SkipReason,
};

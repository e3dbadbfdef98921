#![allow(clippy::collapsible_if)]
#![allow(clippy::collapsible_else_if)]

// Core modules
pub mod alert;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicator;
pub mod utils;

// Re-export commonly used types outside of crate
pub use config::{PERSISTENCE, Settings};
pub use domain::PairInterval;
pub use engine::{AlertEngine, FlipEvent};
pub use indicator::{Direction, PipelineInstance};

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use alert::{LogNotifier, Notifier, TelegramNotifier};
use data::{SnapshotStore, price_stream};
use engine::{FLIP_QUEUE_DEPTH, prepare_pipelines};

// Klines arrive one per closed candle per stream; the buffer only needs
// to absorb the burst right after a reconnect.
const KLINE_QUEUE_DEPTH: usize = 1024;

// CLI argument parsing
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a JSON settings file (defaults are used when omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Ignore saved snapshots and re-bootstrap every stream over REST
    #[arg(long, default_value_t = false)]
    pub no_resume: bool,

    /// Log alerts instead of sending them to Telegram
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

/// Main application entry point: wire config, pipelines, engine,
/// dispatcher and the websocket feed, then run until the feed stops.
pub async fn run(args: Cli) -> Result<()> {
    let settings = Settings::load(args.config.as_deref())?;

    let notifier: Arc<dyn Notifier> = if args.dry_run {
        log::info!("Dry run: alerts go to the log only");
        Arc::new(LogNotifier)
    } else {
        Arc::new(TelegramNotifier::from_env()?)
    };

    let (kline_tx, kline_rx) = mpsc::channel(KLINE_QUEUE_DEPTH);
    let (flip_tx, flip_rx) = mpsc::channel(FLIP_QUEUE_DEPTH);

    let store = SnapshotStore::new(PERSISTENCE.snapshot.directory);
    let (pipelines, initial_events) =
        prepare_pipelines(&settings, !args.no_resume, &store).await?;

    let pairs: Vec<PairInterval> = pipelines.keys().cloned().collect();

    for event in initial_events {
        // Queue has just been created; Full cannot happen here
        let _ = flip_tx.try_send(event);
    }

    tokio::spawn(alert::run_dispatcher(flip_rx, notifier));

    let engine = AlertEngine::new(pipelines, kline_rx, flip_tx, store);
    tokio::spawn(engine.run());

    price_stream::run_with_reconnect(pairs, kline_tx).await;
    Ok(())
}

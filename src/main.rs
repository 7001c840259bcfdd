//! # Satlog Ingest
//!
//! Follow a satellite debug log and store its telemetry per subsystem.
//!
//! This application tails the ground-station log file, parses every new
//! telemetry frame into records, and upserts them into the EPS, OBC and UHF
//! collections of a SQLite database.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::time::Duration;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use satlog_ingest::allow_list::AllowLists;
use satlog_ingest::config::{Config, LoggingConfig};
use satlog_ingest::notifier::{HttpNotifier, NoopNotifier, Notifier};
use satlog_ingest::parser::{ChunkProcessor, LineParser};
use satlog_ingest::pipeline::Pipeline;
use satlog_ingest::sink::SqliteSink;
use satlog_ingest::source::{LogSource, RunFlag, TriggerSources};

/// Default configuration file location
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Prefix of the daily rolling log file
const LOG_FILE_PREFIX: &str = "satlog-ingest.log";

#[derive(Debug, Parser)]
#[command(version, about = "Parse satellite debug logs into per-subsystem telemetry")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

/// Set up console logging and, if configured, a daily rolling log file.
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// must be kept alive for file output to be flushed.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let (file_layer, guard) = match &config.file_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Main entry point for Satlog Ingest
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Load configuration and set up logging
///    - Load the subsystem allow-lists (at least one must exist)
///    - Open the SQLite database and the notifier
///
/// 2. **Main Loop**
///    - Run one read cycle at startup
///    - Run another cycle whenever the size watcher or fallback poll fires;
///      triggers arriving mid-cycle are coalesced
///    - A failed cycle is logged and the loop keeps going
///
/// 3. **Graceful Shutdown**
///    - The Ctrl+C listener is registered before the startup cycle
///    - A cycle already running completes first, then the triggers stop
///
/// # Errors
///
/// Returns error if:
/// - The configuration file is missing or invalid
/// - No allow-list file can be found
/// - The database cannot be opened
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    let _log_guard = init_logging(&config.logging);

    info!("Satlog Ingest v{} starting...", env!("CARGO_PKG_VERSION"));

    let allow_dir = &config.allow_lists.dir;
    let allow_lists = AllowLists::load(allow_dir)
        .with_context(|| format!("Failed to load allow-lists from {}", allow_dir.display()))?;

    let sink = SqliteSink::open(&config.storage.database_path, config.storage.batch_size)
        .context("Failed to open telemetry database")?;

    let notifier: Box<dyn Notifier> = if config.notification.enabled {
        let notifier = HttpNotifier::from_config(&config.notification)?;
        info!("Notifying {} after each upsert", notifier.url());
        Box::new(notifier)
    } else {
        info!("Downstream notification disabled");
        Box::new(NoopNotifier)
    };

    let source = LogSource::open(&config.source.log_file, config.source.start_from_end).await?;
    let processor = ChunkProcessor::new(LineParser::new(config.parser.variant(), &allow_lists));
    let mut pipeline = Pipeline::new(source, processor, allow_lists, sink, notifier);

    let flag = RunFlag::new();
    let mut triggers = TriggerSources::spawn(
        config.source.log_file.clone(),
        Duration::from_millis(config.source.watch_interval_ms),
        Duration::from_millis(config.source.poll_interval_ms),
        flag.clone(),
    );

    info!("Press Ctrl+C to exit");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let cycles = pipeline.run_until_shutdown(&mut triggers, &flag, shutdown).await;

    triggers.shutdown();
    info!(
        "Processed {} cycles, bookmark at byte {}",
        cycles,
        pipeline.source().last_position()
    );

    Ok(())
}

//! oddsfeed: continuous bookmaker odds polling and websocket relay.
//!
//! Usage:
//!   oddsfeed [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>   Config file path (default: config/oddsfeed.toml)

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use oddsfeed::api::KambiClient;
use oddsfeed::config::Config;
use oddsfeed::pipeline::{distribution_channel, run_sport_poller, MatchProcessor};
use oddsfeed::relay::run_relay;

/// CLI arguments for the oddsfeed daemon.
#[derive(Parser, Debug)]
#[command(name = "oddsfeed")]
#[command(about = "Bookmaker odds polling, normalization, and relay daemon")]
#[command(version)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config/oddsfeed.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = if args.config.exists() {
        Config::from_file(&args.config)?
    } else {
        Config::default()
    };

    // Initialize logging
    let log_level = match config.general.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if !args.config.exists() {
        warn!("Config file not found at {:?}, using defaults", args.config);
    }

    info!("Starting oddsfeed");
    info!(
        "Polling {} sport/mode pairs, {} concurrent fetches max",
        config.polling.sports.len(),
        config.polling.max_concurrent_fetches
    );

    std::fs::create_dir_all(&config.general.data_dir)
        .with_context(|| format!("Failed to create data dir {:?}", config.general.data_dir))?;

    // The permit pool and the batch queue are the only process-wide shared
    // state; both are built here and handed to every task explicitly.
    let permits = Arc::new(Semaphore::new(config.polling.max_concurrent_fetches));
    let client = Arc::new(KambiClient::new(config.upstream.clone(), permits)?);
    let processor = Arc::new(MatchProcessor::new(&config.general.data_dir));
    let (batch_tx, batch_rx) = distribution_channel(config.batch_queue_capacity());
    let cancel = CancellationToken::new();

    let mut poller_handles = Vec::new();
    for sm in config.polling.sports.clone() {
        poller_handles.push(tokio::spawn(run_sport_poller(
            sm,
            Arc::clone(&client),
            Arc::clone(&processor),
            batch_tx.clone(),
            config.polling.clone(),
            cancel.clone(),
        )));
    }
    info!("Started {} pollers", poller_handles.len());
    // The relay's receive loop ends once every poller sender is gone.
    drop(batch_tx);

    let relay_addr = format!("{}:{}", config.websocket.host, config.websocket.port);
    let push_interval = Duration::from_secs(config.websocket.push_interval_secs);
    let relay_handle = tokio::spawn(run_relay(
        relay_addr,
        batch_rx,
        push_interval,
        cancel.clone(),
    ));

    // Handle shutdown signals
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM"),
            _ = sigint.recv() => info!("Received SIGINT"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    info!("Initiating graceful shutdown...");
    cancel.cancel();

    // In-flight fetch barriers finish on their own timeouts, so the drain is
    // bounded; force exit if something wedges anyway.
    let shutdown_timeout = Duration::from_secs(15);
    tokio::select! {
        _ = async {
            for handle in poller_handles {
                let _ = handle.await;
            }
            let _ = relay_handle.await;
        } => {
            info!("All tasks completed");
        }
        _ = tokio::time::sleep(shutdown_timeout) => {
            warn!("Shutdown timeout exceeded, forcing exit");
        }
    }

    info!("Shutdown complete");
    Ok(())
}

use anyhow::{Context, Result};
use serde_json::json;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use crate::config::IngestConfig;
use crate::fetcher::RateFetcher;
use crate::logging;
use crate::pipeline::{self, RunOutcome};
use crate::store::JsonFileStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ShutdownSignal {
    None,
    Graceful,
    Immediate,
}

#[derive(Debug, Default)]
struct RunStats {
    succeeded: usize,
    skipped: usize,
}

impl RunStats {
    fn total(&self) -> usize {
        self.succeeded + self.skipped
    }
}

/// Cadence loop: one ingestion run per tick until signalled to stop.
pub async fn run(config: IngestConfig) -> Result<()> {
    let fetcher = RateFetcher::new(&config);
    let store = JsonFileStore::new(config.store_path.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(ShutdownSignal::None);
    let signals_task = tokio::spawn(handle_signals(shutdown_tx));

    let result = run_cadence_loop(&config, &fetcher, &store, shutdown_rx).await;

    signals_task.abort();
    let _ = signals_task.await;

    result
}

/// Single-shot entry point for deployments where an external scheduler owns
/// the cadence. Ingest failures stay neutral; only startup misconfiguration
/// reaches the caller, before this function is ever entered.
pub async fn run_once(config: IngestConfig) -> Result<()> {
    let fetcher = RateFetcher::new(&config);
    let store = JsonFileStore::new(config.store_path.clone());

    pipeline::complete(&fetcher, &store, config.run_timeout).await;
    Ok(())
}

async fn run_cadence_loop(
    config: &IngestConfig,
    fetcher: &RateFetcher,
    store: &JsonFileStore,
    mut shutdown: watch::Receiver<ShutdownSignal>,
) -> Result<()> {
    logging::info(
        "scheduler.start",
        "ingestion scheduler started",
        json!({
            "cadence_secs": config.cadence.as_secs(),
            "run_timeout_secs": config.run_timeout.as_secs(),
            "store_path": config.store_path.display().to_string(),
        }),
    );

    // First tick fires immediately so a fresh deployment has rates straight
    // away; Skip keeps a slow run from stacking up missed ticks behind it.
    let mut ticker = interval(config.cadence);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut stats = RunStats::default();

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        if *shutdown.borrow() != ShutdownSignal::None {
            break;
        }

        // SIGINT cancels an in-flight run; SIGTERM lets it finish first.
        let outcome = tokio::select! {
            outcome = pipeline::complete(fetcher, store, config.run_timeout) => Some(outcome),
            _ = immediate_shutdown(&mut shutdown) => None,
        };

        match outcome {
            Some(RunOutcome::Succeeded) => stats.succeeded += 1,
            Some(RunOutcome::Skipped { .. }) => stats.skipped += 1,
            None => {
                logging::warn_simple("scheduler.abort", "in-flight run cancelled by shutdown");
                break;
            }
        }

        if *shutdown.borrow() != ShutdownSignal::None {
            break;
        }
        if let Some(max_runs) = config.max_runs {
            if stats.total() >= max_runs {
                break;
            }
        }
    }

    logging::info(
        "scheduler.stop",
        "ingestion scheduler stopped",
        json!({
            "runs_succeeded": stats.succeeded,
            "runs_skipped": stats.skipped,
        }),
    );

    Ok(())
}

/// Resolves only when an immediate shutdown is requested. Pends forever once
/// the signal task is gone so it never cancels a run spuriously.
async fn immediate_shutdown(shutdown: &mut watch::Receiver<ShutdownSignal>) {
    loop {
        if *shutdown.borrow() == ShutdownSignal::Immediate {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn handle_signals(shutdown_tx: watch::Sender<ShutdownSignal>) -> Result<()> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to register SIGTERM handler")?;
    let mut sigint =
        signal(SignalKind::interrupt()).context("failed to register SIGINT handler")?;

    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                logging::info(
                    "signal.received",
                    "SIGTERM received, finishing current run",
                    json!({ "signal": "SIGTERM" })
                );
                if shutdown_tx.send(ShutdownSignal::Graceful).is_err() {
                    break;
                }
            }
            _ = sigint.recv() => {
                logging::warn(
                    "signal.received",
                    "SIGINT received, stopping now",
                    json!({ "signal": "SIGINT" })
                );
                let _ = shutdown_tx.send(ShutdownSignal::Immediate);
                break;
            }
        }
    }

    Ok(())
}

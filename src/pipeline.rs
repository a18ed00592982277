use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use thiserror::Error;

use crate::constants::RATES_SOURCE;
use crate::fetcher::RateFetcher;
use crate::logging;
use crate::quote::{Instrument, QuoteReading};
use crate::store::{MarketRatesRecord, RateStore, RatesPatch, StoreError};

/// Everything that can sink a single ingestion run. None of these escape the
/// run boundary; [`complete`] converts them into a log entry and a neutral
/// outcome. The next scheduled run is the retry mechanism.
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error("quote api returned http {status} for {instrument}")]
    Transport { instrument: Instrument, status: u16 },

    #[error("quote api request failed for {instrument}: {source}")]
    Network {
        instrument: Instrument,
        #[source]
        source: reqwest::Error,
    },

    #[error("quote api rejected {instrument}: {message}")]
    Api { instrument: Instrument, message: String },

    #[error("missing or zero last-trade price for {instrument}")]
    ZeroPrice { instrument: Instrument },

    #[error("run exceeded its {0:?} budget")]
    Timeout(Duration),

    #[error("failed to persist latest rates: {0}")]
    Store(#[from] StoreError),
}

impl RunFailure {
    pub fn kind(&self) -> &'static str {
        match self {
            RunFailure::Transport { .. } => "transport",
            RunFailure::Network { .. } => "network",
            RunFailure::Api { .. } => "api",
            RunFailure::ZeroPrice { .. } => "zero_price",
            RunFailure::Timeout(_) => "timeout",
            RunFailure::Store(_) => "store",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub gold: QuoteReading,
    pub silver: QuoteReading,
    pub record: MarketRatesRecord,
}

/// Neutral per-run outcome for the scheduler. Carries no error; a skipped
/// run only means the persisted record did not advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Skipped { cause: &'static str },
}

/// One full run: fetch both instruments, validate, merge the snapshot.
/// Internally fallible so tests can assert on the exact failure; callers on
/// the scheduler path go through [`complete`] instead.
pub async fn execute(
    fetcher: &RateFetcher,
    store: &dyn RateStore,
    run_timeout: Duration,
) -> Result<RunReport, RunFailure> {
    logging::info(
        "run.fetch",
        "fetching quotes for tracked instruments",
        json!({
            "symbols": Instrument::ALL.map(Instrument::symbol),
            "timeout_secs": run_timeout.as_secs(),
        }),
    );

    let (gold, silver) = match tokio::time::timeout(run_timeout, fetcher.fetch_pair()).await {
        Ok(fetched) => fetched?,
        Err(_) => return Err(RunFailure::Timeout(run_timeout)),
    };

    logging::info(
        "run.write",
        "persisting latest rates snapshot",
        json!({
            "gold_price": gold.price,
            "silver_price": silver.price,
        }),
    );

    let record = store.merge_latest(build_patch(&gold, &silver)).await?;

    Ok(RunReport { gold, silver, record })
}

/// Boundary adapter: the external contract is "always return a neutral
/// completion signal, never raise". A missed update beats a crashed job.
pub async fn complete(
    fetcher: &RateFetcher,
    store: &dyn RateStore,
    run_timeout: Duration,
) -> RunOutcome {
    match execute(fetcher, store, run_timeout).await {
        Ok(report) => {
            logging::info(
                "run.complete",
                "latest rates updated",
                json!({
                    "gold_price": report.gold.price,
                    "silver_price": report.silver.price,
                    "updated_at_ms": report.record.updated_at_ms,
                }),
            );
            RunOutcome::Succeeded
        }
        Err(failure) => {
            logging::error(
                "run.failed",
                "ingestion run discarded",
                json!({
                    "kind": failure.kind(),
                    "detail": failure.to_string(),
                }),
            );
            RunOutcome::Skipped {
                cause: failure.kind(),
            }
        }
    }
}

pub fn build_patch(gold: &QuoteReading, silver: &QuoteReading) -> RatesPatch {
    RatesPatch {
        gold_price: gold.price,
        gold_bid: gold.bid,
        gold_ask: gold.ask,
        silver_price: silver.price,
        silver_bid: silver.bid,
        silver_ask: silver.ask,
        fetched_at: Utc::now().to_rfc3339(),
        source: RATES_SOURCE.to_string(),
    }
}

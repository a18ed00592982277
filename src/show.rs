use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use crate::constants::STORE_PATH;
use crate::store::{JsonFileStore, RateStore};

#[derive(Debug, Args, Clone)]
pub struct ShowArgs {
    /// Path of the rates store document (defaults to RATES_STORE_PATH)
    #[arg(short, long)]
    pub store: Option<PathBuf>,
}

pub async fn run(args: ShowArgs) -> Result<()> {
    let path = args.store.unwrap_or_else(default_store_path);
    let store = JsonFileStore::new(path.clone());

    let record = store
        .load_latest()
        .await
        .with_context(|| format!("failed to read rates store {path:?}"))?;

    let Some(record) = record else {
        bail!("no rates persisted yet at {path:?}; run `cargo run -- once` first");
    };

    println!("{:>8} | {:>12} | {:>12} | {:>12}", "metal", "price", "bid", "ask");
    println!(
        "{:>8} | {:>12.4} | {:>12.4} | {:>12.4}",
        "gold", record.gold_price, record.gold_bid, record.gold_ask
    );
    println!(
        "{:>8} | {:>12.4} | {:>12.4} | {:>12.4}",
        "silver", record.silver_price, record.silver_bid, record.silver_ask
    );
    println!(
        "updated_at_ms={} fetched_at={} source={}",
        record.updated_at_ms, record.fetched_at, record.source
    );

    Ok(())
}

fn default_store_path() -> PathBuf {
    std::env::var("RATES_STORE_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(STORE_PATH))
}

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::constants::{CADENCE_SECS, QUOTE_API_BASE_URL, RUN_TIMEOUT_SECS, STORE_PATH};

/// Process-wide ingestion settings, constructed once at startup and passed
/// down by reference. The API credential has no default on purpose.
#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub api_key: String,
    pub base_url: String,
    pub cadence: Duration,
    pub run_timeout: Duration,
    pub store_path: PathBuf,
    /// Stop the cadence loop after this many runs. Not env-driven; test hook.
    pub max_runs: Option<usize>,
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("QUOTE_API_KEY")
            .context("QUOTE_API_KEY must be set; the quote API rejects unauthenticated requests")?;
        if api_key.trim().is_empty() {
            bail!("QUOTE_API_KEY is set but empty");
        }

        let cadence_secs = env_secs("INGEST_CADENCE_SECS", CADENCE_SECS)?;
        if cadence_secs == 0 {
            bail!("INGEST_CADENCE_SECS must be at least 1");
        }

        Ok(Self {
            api_key,
            base_url: env_or("QUOTE_API_URL", QUOTE_API_BASE_URL),
            cadence: Duration::from_secs(cadence_secs),
            run_timeout: Duration::from_secs(env_secs("INGEST_RUN_TIMEOUT_SECS", RUN_TIMEOUT_SECS)?),
            store_path: PathBuf::from(env_or("RATES_STORE_PATH", STORE_PATH)),
            max_runs: None,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_secs(key: &str, default: u64) -> Result<u64> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .with_context(|| format!("{key} must be a whole number of seconds, got {raw:?}")),
        Err(_) => Ok(default),
    }
}

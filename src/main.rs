use anyhow::Result;
use clap::Parser;
use metal_rates::cli::{self, Cli};
use metal_rates::config::IngestConfig;
use metal_rates::{scheduler, show};

#[tokio::main]
async fn main() -> Result<()> {
    match Cli::parse().command() {
        cli::Command::Run => scheduler::run(IngestConfig::from_env()?).await,
        cli::Command::Once => scheduler::run_once(IngestConfig::from_env()?).await,
        cli::Command::Show(args) => show::run(args).await,
    }
}

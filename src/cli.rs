use clap::{Parser, Subcommand};

use crate::show::ShowArgs;

#[derive(Debug, Parser)]
#[command(author, version, about = "Gold and silver spot-rate ingestor")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

impl Cli {
    pub fn command(self) -> Command {
        self.command.unwrap_or_default()
    }
}

#[derive(Debug, Subcommand, Default)]
pub enum Command {
    /// Run the ingestion loop on the configured cadence
    #[default]
    Run,
    /// Execute a single ingestion run, then exit
    Once,
    /// Print the persisted latest-rates record
    Show(ShowArgs),
}

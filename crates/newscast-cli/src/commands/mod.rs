//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod notify;
pub mod serve;

/// Newscast - news change streaming and push delivery
#[derive(Parser)]
#[command(name = "newscast")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./newscast.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the streaming and push server
    Serve(serve::ServeArgs),

    /// Push one news item to one device
    Notify(notify::NotifyArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = newscast_core::Config::load(self.config.as_deref())?;

        match self.command {
            Commands::Serve(args) => serve::execute(args, config).await,
            Commands::Notify(args) => notify::execute(args, config).await,
        }
    }
}

mod config;
mod simulate;
mod timeline;

use crate::config::HuddleConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "huddle")]
#[command(bin_name = "huddle")]
#[command(about = "Runs the huddle signaling and media stack against an in-memory room")]
struct Cli {
    /// TOML file overriding the protocol defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plays a scripted conference and prints what every layer did.
    Simulate {
        #[arg(long, default_value_t = 2)]
        peers: usize,

        /// Send media to the peers directly as well.
        #[arg(long)]
        p2p: bool,
    },
    /// Prints the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = HuddleConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Simulate { peers, p2p } => {
            println!("{}", "🚀 Starting huddle simulation...".green().bold());

            let report = simulate::run(config, simulate::Scenario { peers, p2p })
                .await
                .context("Simulation failed")?;

            println!("{}", "✨ Simulation finished".green().bold());
            println!("   📦 Producers created: {}", report.producers);
            println!("   📨 Server requests:");
            for (method, count) in &report.requests {
                println!("      {:<16} {}", method, count);
            }
        }
        Commands::Config => {
            let rendered =
                toml::to_string_pretty(&config).context("Failed to render configuration")?;
            print!("{}", rendered);
        }
    }

    Ok(())
}

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use sitewatch::{Config, build_scheduler};

/// Watch sites and notify users when they go down or come back up
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (defaults to $XDG_CONFIG_HOME/sitewatch/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Run a single round of checks and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::from_config(cli.config.as_ref())?;
    let format = config.logging.format.as_deref().and_then(|f| f.parse().ok());
    logger::init_with(&config.logging.level, format);

    if cli.print_config {
        print!("{config}");
        return Ok(());
    }

    config.validate()?;
    if config.sites.is_empty() {
        tracing::warn!("No sites configured, nothing to monitor");
    }

    let scheduler = build_scheduler(&config).await?;

    if cli.once {
        let outcomes = scheduler.run_once().await;
        tracing::info!(checks = outcomes.len(), "Single round finished");
        return Ok(());
    }

    scheduler
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    Ok(())
}

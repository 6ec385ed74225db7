mod args;
mod config;
mod output;
mod runner;

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use args::{Cli, Commands};
use runner::{campaign_from_config, default_campaign, run_campaign, single_sweep};
use vigil_common::ProbeKind;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_file.as_deref())?;

    let campaign = match &cli.command {
        Commands::Ping { targets, sweep, count } => single_sweep(ProbeKind::Ping, targets, sweep, *count, None)?,
        Commands::Fetch { targets, sweep } => single_sweep(ProbeKind::HttpFetch, targets, sweep, None, None)?,
        Commands::Exec { targets, sweep, exec } => {
            single_sweep(ProbeKind::RemoteExec, targets, sweep, None, Some(exec))?
        }
        Commands::Campaign {
            config,
            hosts,
            urls,
            ssh_hosts,
            sweep,
            exec,
        } => match config {
            Some(path) => campaign_from_config(path)?,
            None => default_campaign(hosts.as_deref(), urls.as_deref(), ssh_hosts.as_deref(), sweep, exec)?,
        },
    };

    let report = run_campaign(campaign, cli.output_format).await?;
    if report.interrupted {
        eprintln!("🛑 Interrupted by user.");
        std::process::exit(130);
    }

    Ok(())
}

/// Logs go to stderr so stdout stays clean for json/csv output.
fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<()> {
    let log_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

//! Cybersol - Autonomous Solana Trading Agent

mod adapters;
mod application;
mod config;
mod discovery;
mod domain;

/// Wrapped SOL mint
pub const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use crate::application::{Agent, Supervisor};
use crate::config::load_config;

#[derive(Parser)]
#[command(name = "cybersol", about = "Autonomous Solana trading agent", version)]
struct CliApp {
    /// Log at info level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the trading agent
    Run(ConfigArg),
    /// Run the watcher that supervises and restarts the agent
    Supervise(ConfigArg),
    /// One-shot Meteora DLMM opportunity scan
    Scan(ConfigArg),
    /// Show open positions and review metrics
    Status(ConfigArg),
    /// Print the strategic review report as JSON
    Review(ConfigArg),
}

#[derive(clap::Args)]
struct ConfigArg {
    /// Path to config.toml
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Secrets come from .env, not config.toml
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    init_logging(app.verbose, app.debug);

    match app.command {
        Command::Run(args) => run_command(&args.config).await,
        Command::Supervise(args) => supervise_command(&args.config).await,
        Command::Scan(args) => scan_command(&args.config).await,
        Command::Status(args) => status_command(&args.config).await,
        Command::Review(args) => review_command(&args.config).await,
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    fmt().with_env_filter(filter).init();
}

async fn run_command(config_path: &str) -> Result<()> {
    tracing::info!("-----------------------------------------");
    tracing::info!("Agent initializing");
    tracing::info!("-----------------------------------------");

    let config = load_config(config_path).context("Failed to load configuration")?;
    let agent = Agent::new(config).context("Failed to build agent")?;
    agent.log_boot();

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Ctrl+C received");
        shutdown_tx.send(true).ok();
    });

    agent.run(shutdown_rx).await
}

async fn supervise_command(config_path: &str) -> Result<()> {
    let config = load_config(config_path).context("Failed to load configuration")?;
    let data_dir = std::path::PathBuf::from(&config.storage.data_dir);

    let program = std::env::current_exe()
        .context("Cannot resolve agent binary path")?
        .to_string_lossy()
        .to_string();
    let args = vec!["run".to_string(), "--config".to_string(), config_path.to_string()];

    let mut supervisor = Supervisor::new(config.supervisor, &data_dir, program, args);
    supervisor.run().await
}

async fn scan_command(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let data_dir = std::path::PathBuf::from(&config.storage.data_dir);
    let history = Arc::new(crate::domain::TradeHistory::new(&data_dir));
    let scanner = crate::discovery::MeteoraScanner::new(
        crate::adapters::meteora::MeteoraClient::new(config.apis.meteora_url.clone()),
        history,
        config.yield_farm.min_volume_24h,
    );

    let picks = scanner.scan().await;
    for pick in picks {
        println!(
            "{:<24} util {:>5.2}x  vol ${:>12.0}  tvl ${:>12.0}  {}",
            pick.name, pick.metrics.utilization, pick.metrics.volume_24h, pick.metrics.tvl,
            pick.address
        );
    }
    Ok(())
}

async fn status_command(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let agent = Agent::new(config)?;
    print!("{}", agent.status_report().await?);
    Ok(())
}

async fn review_command(config_path: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let data_dir = std::path::PathBuf::from(&config.storage.data_dir);
    let history = Arc::new(crate::domain::TradeHistory::new(&data_dir));
    let review = crate::application::review::StrategicReview::new(
        crate::domain::PnlLog::new(&data_dir),
        history,
    );
    let report = review.analyze();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

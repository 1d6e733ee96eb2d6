use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tradingagents_models::{TradeAction, TradingAgentsConfig};

#[derive(Parser, Debug)]
#[command(name = "tradingagents", about = "Multi-agent trading decision engine")]
struct Cli {
    /// Ticker symbol to analyze
    #[arg(short, long)]
    ticker: String,

    /// Analysis date (YYYY-MM-DD)
    #[arg(short, long)]
    date: String,

    /// Path to configuration file
    #[arg(short, long, default_value = "config/tradingagents.toml")]
    config: String,

    /// Pretty-print the output JSON
    #[arg(long)]
    pretty: bool,

    /// Cancel the run after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn load_config(path: &str) -> Result<TradingAgentsConfig> {
    let mut config = if Path::new(path).exists() {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {path}"))?;
        toml::from_str(&config_str).with_context(|| format!("Failed to parse config: {path}"))?
    } else {
        warn!(path, "Config file not found, using defaults");
        TradingAgentsConfig::default()
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (respects RUST_LOG env var)
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    if cli.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let mut config = load_config(&cli.config)?;
    if cli.timeout.is_some() {
        config.graph.run_timeout_seconds = cli.timeout;
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("Received interrupt, cancelling run");
        ctrl_c.cancel();
    });

    let (state, decision) =
        tradingagents::run_with_cancel(&cli.ticker, &cli.date, &config, cancel).await?;

    info!(
        ticker = state.ticker(),
        date = %state.date(),
        action = TradeAction::classify(&decision).as_str(),
        invocations = state.agent_invocations(),
        "Final decision"
    );

    // Output state as JSON to stdout
    let output = if cli.pretty {
        serde_json::to_string_pretty(&state)?
    } else {
        serde_json::to_string(&state)?
    };
    println!("{output}");

    Ok(())
}

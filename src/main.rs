//! Market Automation CLI
//!
//! Resolves and recreates the automatic daily over/under market.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use market_automation::services::chain_client::ChainSettings;
use market_automation::services::market_lifecycle::LifecycleSettings;
use market_automation::services::scheduler;
use market_automation::types::format_timestamp;
use market_automation::{ChainClient, Config, CycleMode, MarketLifecycle, Metrics, RpcChainClient, TickOutcome};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "market-automation")]
#[command(about = "Keeps the automatic daily over/under market running")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Override AUTOMATION_MODE (test or production)
    #[arg(short, long, global = true)]
    mode: Option<CycleMode>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the automation loop until Ctrl+C (default)
    Run,

    /// Run a single tick and exit
    Once,

    /// Show the active automatic market
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; RUST_LOG overrides the default level
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    // Load configuration; any error here is fatal before scheduling starts
    let mut config = Config::from_env()?;
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }

    info!("Initializing automation service...");
    let client = RpcChainClient::connect(ChainSettings::from_config(&config), config.signer.clone())
        .await
        .with_context(|| format!("Failed to connect to RPC {}", config.rpc_url))?;

    print_banner(&config, &client);

    let lifecycle = MarketLifecycle::new(
        Arc::new(client),
        LifecycleSettings::from_config(&config),
        Metrics::new(),
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&config, &lifecycle).await,
        Commands::Once => once(&lifecycle).await,
        Commands::Status => status(&lifecycle).await?,
    }

    Ok(())
}

fn print_banner(config: &Config, client: &RpcChainClient) {
    println!("\n{}", "=".repeat(70));
    println!("  MARKET AUTOMATION SERVICE");
    println!("  RPC:      {} (chain id {})", config.rpc_url, client.chain_id());
    println!("  Account:  {}", client.signer_address());
    println!("  Contract: {}", config.market_address);
    println!("  Oracle:   {}", config.oracle_address);
    println!("  Mode:     {}", config.mode);
    println!("{}\n", "=".repeat(70));
}

async fn run(config: &Config, lifecycle: &MarketLifecycle<RpcChainClient>) {
    println!("Starting automation service (Ctrl+C to stop)...\n");

    scheduler::run_until(lifecycle, config.tick_interval, scheduler::ctrl_c()).await;

    let snapshot = lifecycle.metrics().snapshot();
    match serde_json::to_string(&snapshot) {
        Ok(json) => info!("Final metrics: {}", json),
        Err(e) => warn!("Failed to serialize metrics: {}", e),
    }
}

async fn once(lifecycle: &MarketLifecycle<RpcChainClient>) {
    let outcome = lifecycle.tick().await;

    // Let a scheduled replacement land before exiting
    if matches!(outcome, TickOutcome::Resolved { .. }) {
        lifecycle.wait_for_recreation().await;
    }

    info!("Tick outcome: {:?}", outcome);
}

async fn status(lifecycle: &MarketLifecycle<RpcChainClient>) -> Result<()> {
    let client = lifecycle.client();
    let now = Utc::now().timestamp();

    let count = client.market_count().await?;
    let price = client.latest_oracle_price().await?;

    println!("Markets on-chain: {}", count);
    println!("Oracle price:     {}", market_automation::types::format_price(price));

    match client.active_automatic_market().await? {
        Some(market) => {
            println!("\nActive daily market #{}: \"{}\"", market.id, market.name);
            println!("  Type:      {}", market.market_type);
            println!("  Ends:      {}", format_timestamp(market.end_time));
            println!("  Remaining: {}s", market.seconds_until_end(now));
            println!("  Pools:     {} / {}", market.total_pool_a, market.total_pool_b);
        }
        None => println!("\nNo active automatic daily market."),
    }

    Ok(())
}

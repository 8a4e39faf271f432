//! Keeper binary.
//!
//! Runs the expiry automation loop against an auction host. Anyone can run
//! this: the host re-validates every trigger, so a fleet of keepers racing
//! each other is safe.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use gavel_keeper::{KeeperConfig, KeeperService};

#[derive(Parser)]
#[command(name = "gavel-keeper")]
#[command(about = "Expiry keeper for sealed-bid auctions")]
struct Cli {
    /// Auction host RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    /// Polling interval in seconds
    #[arg(long, default_value = "10")]
    poll_interval: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gavel_keeper=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = KeeperConfig {
        rpc_endpoint: cli.rpc,
        poll_interval_secs: cli.poll_interval,
    };

    info!(endpoint = %config.rpc_endpoint, "Starting keeper");

    let service = KeeperService::from_config(&config)?;
    service.start().await
}

//! Relay watcher binary.
//!
//! Polls a source domain's settlement-event feed and re-executes each
//! settlement against this process's own asset registry and fund ledger.
//! The local domain is seeded from the command line: mirrored tokens are
//! minted to the vault and the vault's fund pool is credited up front.

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;

use gavel_registry::InMemoryAssetRegistry;
use gavel_relay::{RelayConfig, RelayService, RelayWatcher};
use gavel_types::Address;

#[derive(Parser)]
#[command(name = "gavel-relay")]
#[command(about = "Cross-domain settlement relay watcher")]
struct Cli {
    /// Source-domain event feed RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    /// Origin domain identifier to accept events from
    #[arg(long, default_value = "1")]
    origin_domain: u64,

    /// Emitting address to accept events from (hex, 32 bytes)
    #[arg(long)]
    source: String,

    /// Local vault identity custodying mirrored assets and funds (hex)
    #[arg(
        long,
        default_value = "dddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddddd"
    )]
    vault: String,

    /// Local asset registry identity (hex)
    #[arg(
        long,
        default_value = "2222222222222222222222222222222222222222222222222222222222222222"
    )]
    registry: String,

    /// Funds to seed the local vault pool with
    #[arg(long, default_value = "0")]
    vault_funds: u64,

    /// Token ids to mint to the vault in the local registry
    #[arg(long, value_delimiter = ',')]
    seed_tokens: Vec<u64>,

    /// Polling interval in seconds
    #[arg(long, default_value = "5")]
    poll_interval: u64,
}

fn parse_address(s: &str) -> Result<Address> {
    let bytes = hex::decode(s.trim_start_matches("0x"))?;
    bytes
        .try_into()
        .map_err(|_| anyhow!("address must be 32 bytes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gavel_relay=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = RelayConfig {
        rpc_endpoint: cli.rpc,
        origin_domain: cli.origin_domain,
        source: cli.source,
        poll_interval_secs: cli.poll_interval,
    };

    let vault = parse_address(&cli.vault)?;
    let mut registry = InMemoryAssetRegistry::new(parse_address(&cli.registry)?);
    for token_id in &cli.seed_tokens {
        registry.mint(*token_id, vault);
    }

    let mut watcher = RelayWatcher::new(config.subscription()?, vault, registry);
    watcher.fund_vault(cli.vault_funds);

    info!(
        endpoint = %config.rpc_endpoint,
        origin_domain = config.origin_domain,
        seeded_tokens = cli.seed_tokens.len(),
        vault_funds = cli.vault_funds,
        "Starting relay watcher"
    );

    let mut service = RelayService::new(watcher, config.feed()?, config.poll_interval_secs);
    service.start().await
}

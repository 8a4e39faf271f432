//! CLI for interacting with sealed-bid auctions.
//!
//! This binary provides commands for:
//! - Creating auctions
//! - Committing and revealing sealed bids
//! - Triggering expiry settlement
//! - Querying auction status and withdrawing proceeds

use anyhow::Result;
use clap::{Parser, Subcommand};
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use rand::rngs::OsRng;
use serde_json::{json, Value};

use gavel_client::prepare_bid;

#[derive(Parser)]
#[command(name = "gavel-cli")]
#[command(about = "CLI for sealed-bid auctions")]
struct Cli {
    /// Mock chain RPC endpoint
    #[arg(long, default_value = "http://127.0.0.1:9944")]
    rpc: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mint a test asset to an owner
    MintAsset {
        /// Token id
        #[arg(long)]
        token_id: u64,

        /// Owner address (hex)
        #[arg(long)]
        owner: String,
    },

    /// Create a new auction (escrows the seller's asset)
    CreateAuction {
        /// Seller address (hex)
        #[arg(long)]
        sender: String,

        /// Token id to auction
        #[arg(long)]
        token_id: u64,

        /// Bidding duration in seconds
        #[arg(long)]
        duration: u64,

        /// Reveal window after bidding closes, in seconds
        #[arg(long, default_value = "600")]
        reveal_window: u64,

        /// Minimum bid amount
        #[arg(long, default_value = "1")]
        min_bid: u64,
    },

    /// Commit a sealed bid (prints the secret to keep for reveal)
    Commit {
        /// Bidder address (hex)
        #[arg(long)]
        sender: String,

        /// Auction ID
        #[arg(long)]
        auction_id: u64,

        /// Bid amount (stays local until reveal)
        #[arg(long)]
        amount: u64,

        /// Deposit to escrow (visible on-chain, must cover the amount)
        #[arg(long)]
        deposit: u64,
    },

    /// Reveal a committed bid
    Reveal {
        /// Bidder address (hex)
        #[arg(long)]
        sender: String,

        /// Auction ID
        #[arg(long)]
        auction_id: u64,

        /// Bid amount
        #[arg(long)]
        amount: u64,

        /// Secret from the commit step (hex)
        #[arg(long)]
        secret: String,
    },

    /// Withdraw settled proceeds
    Withdraw {
        /// Address (hex)
        #[arg(long)]
        sender: String,
    },

    /// Get auction details
    GetAuction {
        /// Auction ID
        #[arg(long)]
        auction_id: u64,
    },

    /// List all auctions
    ListAuctions,

    /// Get bids for an auction
    GetBids {
        /// Auction ID
        #[arg(long)]
        auction_id: u64,
    },

    /// Get the settlement record of an auction
    GetResult {
        /// Auction ID
        #[arg(long)]
        auction_id: u64,
    },

    /// Scan for the next expired auction
    CheckExpired,

    /// Trigger expiry settlement for an auction
    PerformExpiry {
        /// Auction ID
        #[arg(long)]
        auction_id: u64,
    },

    /// Advance chain time (for testing)
    AdvanceBlock,

    /// Set chain timestamp (for testing)
    SetTimestamp {
        /// Unix timestamp to set
        #[arg(long)]
        timestamp: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gavel_cli=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let client: HttpClient = HttpClientBuilder::default().build(&cli.rpc)?;

    match cli.command {
        Commands::MintAsset { token_id, owner } => {
            let ok: bool = client
                .request("admin_mintAsset", rpc_params![token_id, owner])
                .await?;
            println!("Minted: {}", ok);
        }

        Commands::CreateAuction {
            sender,
            token_id,
            duration,
            reveal_window,
            min_bid,
        } => {
            let params = json!({
                "sender": sender,
                "token_id": token_id,
                "duration": duration,
                "reveal_window": reveal_window,
                "min_bid": min_bid,
            });
            let auction_id: u64 = client
                .request("auction_create", rpc_params![params])
                .await?;
            println!("Created auction {}", auction_id);
        }

        Commands::Commit {
            sender,
            auction_id,
            amount,
            deposit,
        } => {
            let bid = prepare_bid(amount, &mut OsRng)?;
            let params = json!({
                "sender": sender,
                "auction_id": auction_id,
                "commitment": hex::encode(bid.commitment.0),
                "deposit": deposit,
            });
            client
                .request::<bool, _>("auction_commitBid", rpc_params![params])
                .await?;
            println!("Committed bid for auction {}", auction_id);
            println!("  commitment: {}", hex::encode(bid.commitment.0));
            println!("  secret:     {}", hex::encode(bid.secret.0));
            println!("Keep the secret safe: it is required to reveal.");
        }

        Commands::Reveal {
            sender,
            auction_id,
            amount,
            secret,
        } => {
            let params = json!({
                "sender": sender,
                "auction_id": auction_id,
                "amount": amount,
                "secret": secret,
                "proof": Value::Null,
            });
            client
                .request::<bool, _>("auction_revealBid", rpc_params![params])
                .await?;
            println!("Revealed bid of {} for auction {}", amount, auction_id);
        }

        Commands::Withdraw { sender } => {
            let amount: u64 = client
                .request("auction_withdraw", rpc_params![sender])
                .await?;
            println!("Withdrew {}", amount);
        }

        Commands::GetAuction { auction_id } => {
            let auction: Value = client
                .request("query_getAuction", rpc_params![auction_id])
                .await?;
            println!("{}", serde_json::to_string_pretty(&auction)?);
        }

        Commands::ListAuctions => {
            let auctions: Value = client.request("query_listAuctions", rpc_params![]).await?;
            println!("{}", serde_json::to_string_pretty(&auctions)?);
        }

        Commands::GetBids { auction_id } => {
            let bids: Value = client
                .request("query_getAuctionBids", rpc_params![auction_id])
                .await?;
            println!("{}", serde_json::to_string_pretty(&bids)?);
        }

        Commands::GetResult { auction_id } => {
            let result: Value = client
                .request("query_getResult", rpc_params![auction_id])
                .await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::CheckExpired => {
            let expired: Option<u64> = client
                .request("keeper_checkExpired", rpc_params![])
                .await?;
            match expired {
                Some(id) => println!("Auction {} is expired", id),
                None => println!("No expired auctions"),
            }
        }

        Commands::PerformExpiry { auction_id } => {
            let settled: bool = client
                .request("keeper_performExpiry", rpc_params![auction_id])
                .await?;
            if settled {
                println!("Auction {} settled", auction_id);
            } else {
                println!("No-op: auction {} was not ready to settle", auction_id);
            }
        }

        Commands::AdvanceBlock => {
            let block: Value = client.request("admin_advanceBlock", rpc_params![]).await?;
            println!("{}", serde_json::to_string_pretty(&block)?);
        }

        Commands::SetTimestamp { timestamp } => {
            client
                .request::<bool, _>("admin_setTimestamp", rpc_params![timestamp])
                .await?;
            println!("Timestamp set to {}", timestamp);
        }
    }

    Ok(())
}

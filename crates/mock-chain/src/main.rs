//! Mock chain server for local testing of the gavel auction system.
//!
//! This provides a JSON-RPC server that simulates the serialized-ledger host
//! environment for the auction module without requiring a real blockchain,
//! plus the append-only event feed the relay watcher polls.

use anyhow::Result;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use gavel_module::{handlers, AuctionState, CallContext, GenesisConfig, StructuralVerifier};
use gavel_registry::{AssetRegistry, InMemoryAssetRegistry};
use gavel_types::{Address, BidCommitment, G1Point, G2Point, RevealProof, Secret};

mod types;
use types::*;

/// Domain identifier this host reports on its event feed.
const ORIGIN_DOMAIN: u64 = 1;

/// Shared chain state.
struct ChainState {
    /// Module state
    module: AuctionState,
    /// Host asset registry
    registry: InMemoryAssetRegistry,
    /// Current block height (simulated)
    block_height: u64,
    /// Current timestamp (simulated, can be advanced)
    timestamp: u64,
}

impl ChainState {
    fn new(genesis: &GenesisConfig) -> Self {
        Self {
            module: AuctionState::new(genesis.house),
            registry: InMemoryAssetRegistry::new([0x11u8; 32]),
            block_height: 0,
            timestamp: 0,
        }
    }

    fn advance_block(&mut self) {
        self.block_height += 1;
        self.timestamp += 12; // ~12 second blocks
    }
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned>;

    /// Mint an asset to an owner on the host registry.
    #[method(name = "admin_mintAsset")]
    async fn admin_mint_asset(&self, token_id: u64, owner: String)
        -> Result<bool, ErrorObjectOwned>;

    // ============ Auction Methods ============

    /// Create a new auction; escrows the seller's asset.
    #[method(name = "auction_create")]
    async fn auction_create(&self, params: CreateAuctionParams) -> Result<u64, ErrorObjectOwned>;

    /// Commit a sealed bid.
    #[method(name = "auction_commitBid")]
    async fn auction_commit_bid(&self, params: CommitBidParams) -> Result<bool, ErrorObjectOwned>;

    /// Reveal a committed bid.
    #[method(name = "auction_revealBid")]
    async fn auction_reveal_bid(&self, params: RevealBidParams) -> Result<bool, ErrorObjectOwned>;

    /// Withdraw the caller's settled balance.
    #[method(name = "auction_withdraw")]
    async fn auction_withdraw(&self, sender: String) -> Result<u64, ErrorObjectOwned>;

    // ============ Keeper Methods ============

    /// Scan for the next expired auction.
    #[method(name = "keeper_checkExpired")]
    async fn keeper_check_expired(&self) -> Result<Option<u64>, ErrorObjectOwned>;

    /// Trigger expiry settlement; returns whether the auction settled.
    #[method(name = "keeper_performExpiry")]
    async fn keeper_perform_expiry(&self, auction_id: u64) -> Result<bool, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Get auction by ID.
    #[method(name = "query_getAuction")]
    async fn query_get_auction(
        &self,
        auction_id: u64,
    ) -> Result<Option<AuctionRpc>, ErrorObjectOwned>;

    /// List all auctions.
    #[method(name = "query_listAuctions")]
    async fn query_list_auctions(&self) -> Result<Vec<AuctionRpc>, ErrorObjectOwned>;

    /// Get all bids for an auction.
    #[method(name = "query_getAuctionBids")]
    async fn query_get_auction_bids(
        &self,
        auction_id: u64,
    ) -> Result<Vec<BidRpc>, ErrorObjectOwned>;

    /// Get the settlement record of an auction.
    #[method(name = "query_getResult")]
    async fn query_get_result(
        &self,
        auction_id: u64,
    ) -> Result<Option<SettlementRecordRpc>, ErrorObjectOwned>;

    /// Get a bidder's locked escrow balance.
    #[method(name = "query_getEscrow")]
    async fn query_get_escrow(&self, address: String) -> Result<u64, ErrorObjectOwned>;

    /// Get an identity's withdrawable balance.
    #[method(name = "query_getProceeds")]
    async fn query_get_proceeds(&self, address: String) -> Result<u64, ErrorObjectOwned>;

    /// Get the current owner of a token on the host registry.
    #[method(name = "query_getAssetOwner")]
    async fn query_get_asset_owner(
        &self,
        token_id: u64,
    ) -> Result<Option<String>, ErrorObjectOwned>;

    // ============ Relay Feed ============

    /// Settlement events at or after the given sequence number.
    #[method(name = "relay_getEvents")]
    async fn relay_get_events(
        &self,
        from_seq: u64,
    ) -> Result<Vec<EventRecordRpc>, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
    verifier: StructuralVerifier,
    /// Emitting identity stamped on the event feed
    source: Address,
}

impl MockChainServer {
    fn new(genesis: &GenesisConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(ChainState::new(genesis))),
            verifier: StructuralVerifier,
            source: genesis.house,
        }
    }

    fn rpc_error(msg: &str) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(-32000, msg.to_string(), None::<()>)
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.advance_block();
        Ok(BlockInfo {
            height: state.block_height,
            timestamp: state.timestamp,
        })
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.timestamp = timestamp;
        info!("Timestamp set to {}", timestamp);
        Ok(true)
    }

    async fn admin_mint_asset(
        &self,
        token_id: u64,
        owner: String,
    ) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        let owner = parse_address(&owner)?;
        state.registry.mint(token_id, owner);
        info!("Minted token {} to {}", token_id, hex::encode(owner));
        Ok(true)
    }

    async fn auction_create(&self, params: CreateAuctionParams) -> Result<u64, ErrorObjectOwned> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = CallContext {
            sender: parse_address(&params.sender)?,
            block_height: state.block_height,
            timestamp: state.timestamp,
            value: 0,
        };

        let asset = gavel_types::AssetRef {
            registry: state.registry.address(),
            token_id: params.token_id,
        };

        let auction_id = handlers::handle_create_auction(
            &mut state.module,
            &mut state.registry,
            &ctx,
            asset,
            params.duration,
            params.reveal_window,
            params.min_bid,
        )
        .map_err(|e| Self::rpc_error(&format!("Failed to create auction: {}", e)))?;

        info!("Created auction {}", auction_id);
        Ok(auction_id)
    }

    async fn auction_commit_bid(
        &self,
        params: CommitBidParams,
    ) -> Result<bool, ErrorObjectOwned> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = CallContext {
            sender: parse_address(&params.sender)?,
            block_height: state.block_height,
            timestamp: state.timestamp,
            value: params.deposit,
        };

        let commitment = BidCommitment(parse_bytes32(&params.commitment, "commitment")?);

        handlers::handle_commit_bid(&mut state.module, &ctx, params.auction_id, commitment)
            .map_err(|e| Self::rpc_error(&format!("Failed to commit bid: {}", e)))?;

        info!(
            "Bid committed for auction {} by {}",
            params.auction_id, params.sender
        );
        Ok(true)
    }

    async fn auction_reveal_bid(
        &self,
        params: RevealBidParams,
    ) -> Result<bool, ErrorObjectOwned> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = CallContext {
            sender: parse_address(&params.sender)?,
            block_height: state.block_height,
            timestamp: state.timestamp,
            value: 0,
        };

        let secret = Secret(parse_bytes32(&params.secret, "secret")?);
        let proof = params.proof.as_ref().map(parse_proof).transpose()?;

        handlers::handle_reveal_bid(
            &mut state.module,
            &self.verifier,
            &ctx,
            params.auction_id,
            params.amount,
            secret,
            proof,
        )
        .map_err(|e| Self::rpc_error(&format!("Failed to reveal bid: {}", e)))?;

        info!(
            "Bid revealed for auction {} by {}",
            params.auction_id, params.sender
        );
        Ok(true)
    }

    async fn auction_withdraw(&self, sender: String) -> Result<u64, ErrorObjectOwned> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = CallContext {
            sender: parse_address(&sender)?,
            block_height: state.block_height,
            timestamp: state.timestamp,
            value: 0,
        };

        let amount = handlers::handle_withdraw(&mut state.module, &ctx)
            .map_err(|e| Self::rpc_error(&format!("Failed to withdraw: {}", e)))?;

        info!("Withdrawal of {} by {}", amount, sender);
        Ok(amount)
    }

    async fn keeper_check_expired(&self) -> Result<Option<u64>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(handlers::check_expired(&state.module, state.timestamp))
    }

    async fn keeper_perform_expiry(&self, auction_id: u64) -> Result<bool, ErrorObjectOwned> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let ctx = CallContext {
            sender: [0u8; 32],
            block_height: state.block_height,
            timestamp: state.timestamp,
            value: 0,
        };

        let record = handlers::handle_perform_expiry(
            &mut state.module,
            &mut state.registry,
            &ctx,
            auction_id,
        )
        .map_err(|e| Self::rpc_error(&format!("Failed to perform expiry: {}", e)))?;

        match &record {
            Some(r) => info!(
                "Auction {} settled. Winner: {:?}, Amount: {}",
                auction_id,
                r.winner.map(hex::encode),
                r.winning_amount
            ),
            None => info!("Expiry trigger for auction {} was a no-op", auction_id),
        }
        Ok(record.is_some())
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(BlockInfo {
            height: state.block_height,
            timestamp: state.timestamp,
        })
    }

    async fn query_get_auction(
        &self,
        auction_id: u64,
    ) -> Result<Option<AuctionRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state.module.get_auction(auction_id).map(AuctionRpc::from))
    }

    async fn query_list_auctions(&self) -> Result<Vec<AuctionRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state.module.auctions.values().map(AuctionRpc::from).collect())
    }

    async fn query_get_auction_bids(
        &self,
        auction_id: u64,
    ) -> Result<Vec<BidRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        let bids = state.module.get_auction_bids(auction_id);
        Ok(bids.into_iter().map(BidRpc::from).collect())
    }

    async fn query_get_result(
        &self,
        auction_id: u64,
    ) -> Result<Option<SettlementRecordRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state
            .module
            .results
            .get(&auction_id)
            .cloned()
            .map(SettlementRecordRpc::from))
    }

    async fn query_get_escrow(&self, address: String) -> Result<u64, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state.module.escrow.balance(&parse_address(&address)?))
    }

    async fn query_get_proceeds(&self, address: String) -> Result<u64, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state.module.proceeds.balance(&parse_address(&address)?))
    }

    async fn query_get_asset_owner(
        &self,
        token_id: u64,
    ) -> Result<Option<String>, ErrorObjectOwned> {
        let state = self.state.read();
        let asset = gavel_types::AssetRef {
            registry: state.registry.address(),
            token_id,
        };
        Ok(state.registry.owner_of(&asset).ok().map(hex::encode))
    }

    async fn relay_get_events(
        &self,
        from_seq: u64,
    ) -> Result<Vec<EventRecordRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state
            .module
            .events_from(from_seq)
            .iter()
            .map(|(seq, event)| EventRecordRpc {
                seq: *seq,
                origin_domain: ORIGIN_DOMAIN,
                source: hex::encode(self.source),
                payload: hex::encode(event.encode()),
            })
            .collect())
    }
}

fn parse_address(s: &str) -> Result<Address, ErrorObjectOwned> {
    let bytes = hex::decode(s.trim_start_matches("0x"))
        .map_err(|e| MockChainServer::rpc_error(&format!("Invalid address hex: {}", e)))?;
    let mut addr = [0u8; 32];
    let len = bytes.len().min(32);
    addr[..len].copy_from_slice(&bytes[..len]);
    Ok(addr)
}

fn parse_bytes32(s: &str, what: &str) -> Result<[u8; 32], ErrorObjectOwned> {
    hex::decode(s)
        .map_err(|e| MockChainServer::rpc_error(&format!("Invalid {} hex: {}", what, e)))?
        .try_into()
        .map_err(|_| MockChainServer::rpc_error(&format!("{} must be 32 bytes", what)))
}

fn parse_proof(proof: &RevealProofRpc) -> Result<RevealProof, ErrorObjectOwned> {
    let a: [u8; 64] = hex::decode(&proof.a)
        .map_err(|e| MockChainServer::rpc_error(&format!("Invalid proof a: {}", e)))?
        .try_into()
        .map_err(|_| MockChainServer::rpc_error("Proof a must be 64 bytes"))?;
    let b: [u8; 128] = hex::decode(&proof.b)
        .map_err(|e| MockChainServer::rpc_error(&format!("Invalid proof b: {}", e)))?
        .try_into()
        .map_err(|_| MockChainServer::rpc_error("Proof b must be 128 bytes"))?;
    let c: [u8; 64] = hex::decode(&proof.c)
        .map_err(|e| MockChainServer::rpc_error(&format!("Invalid proof c: {}", e)))?
        .try_into()
        .map_err(|_| MockChainServer::rpc_error("Proof c must be 64 bytes"))?;

    Ok(RevealProof {
        a: G1Point(a),
        b: G2Point(b),
        c: G1Point(c),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gavel_mock_chain=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let genesis = GenesisConfig::default();
    genesis.validate()?;

    let addr: SocketAddr = "127.0.0.1:9944".parse()?;

    info!("Starting mock chain server on {}", addr);

    let server = Server::builder().build(addr).await?;
    let handle = server.start(MockChainServer::new(&genesis).into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}

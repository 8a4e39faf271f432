//! RPC-compatible types for the mock chain.
//!
//! These types are JSON-serializable mirrors of the core auction types.

use gavel_types::{Auction, Bid, LifecycleState, SettlementRecord};
use serde::{Deserialize, Serialize};

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Parameters for creating an auction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuctionParams {
    /// Seller address (hex)
    pub sender: String,
    /// Token id on the host registry
    pub token_id: u64,
    /// Bidding duration in seconds
    pub duration: u64,
    /// Reveal window after bidding closes, in seconds
    pub reveal_window: u64,
    pub min_bid: u64,
}

/// Parameters for committing a sealed bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitBidParams {
    /// Bidder address (hex)
    pub sender: String,
    pub auction_id: u64,
    /// Hex-encoded commitment (32 bytes)
    pub commitment: String,
    /// Escrowed with the commitment
    pub deposit: u64,
}

/// Reveal proof for RPC (hex-encoded points).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealProofRpc {
    /// Hex-encoded G1 point (64 bytes)
    pub a: String,
    /// Hex-encoded G2 point (128 bytes)
    pub b: String,
    /// Hex-encoded G1 point (64 bytes)
    pub c: String,
}

/// Parameters for revealing a bid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealBidParams {
    /// Bidder address (hex)
    pub sender: String,
    pub auction_id: u64,
    pub amount: u64,
    /// Hex-encoded secret (32 bytes)
    pub secret: String,
    pub proof: Option<RevealProofRpc>,
}

/// Auction record for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuctionRpc {
    pub auction_id: u64,
    pub seller: String,
    pub token_id: u64,
    pub state: String,
    pub start_time: u64,
    pub end_time: u64,
    pub reveal_deadline: u64,
    pub min_bid: u64,
}

impl From<&Auction> for AuctionRpc {
    fn from(a: &Auction) -> Self {
        Self {
            auction_id: a.auction_id,
            seller: hex::encode(a.seller),
            token_id: a.asset.token_id,
            state: match a.state {
                LifecycleState::Active => "active",
                LifecycleState::Ended => "ended",
            }
            .to_string(),
            start_time: a.start_time,
            end_time: a.end_time,
            reveal_deadline: a.reveal_deadline,
            min_bid: a.min_bid,
        }
    }
}

/// Bid record for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidRpc {
    pub bidder: String,
    pub commitment: String,
    pub deposit: u64,
    pub commit_time: u64,
    pub revealed: bool,
    pub amount: Option<u64>,
    pub reveal_time: Option<u64>,
}

impl From<&Bid> for BidRpc {
    fn from(b: &Bid) -> Self {
        Self {
            bidder: hex::encode(b.bidder),
            commitment: hex::encode(b.commitment.0),
            deposit: b.deposit,
            commit_time: b.commit_time,
            revealed: b.revealed,
            amount: b.amount,
            reveal_time: b.reveal_time,
        }
    }
}

/// Settlement record for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecordRpc {
    pub auction_id: u64,
    pub winner: Option<String>,
    pub winning_amount: u64,
    pub num_revealed: u32,
    pub settlement_time: u64,
    pub trigger: String,
}

impl From<SettlementRecord> for SettlementRecordRpc {
    fn from(r: SettlementRecord) -> Self {
        Self {
            auction_id: r.auction_id,
            winner: r.winner.map(hex::encode),
            winning_amount: r.winning_amount,
            num_revealed: r.num_revealed,
            settlement_time: r.settlement_time,
            trigger: hex::encode(r.trigger),
        }
    }
}

/// One settlement-event record on the relay feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecordRpc {
    pub seq: u64,
    pub origin_domain: u64,
    /// Emitting address (hex)
    pub source: String,
    /// Hex-encoded borsh payload
    pub payload: String,
}

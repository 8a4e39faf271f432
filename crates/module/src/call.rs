//! Call message types for the auction module.

use borsh::{BorshDeserialize, BorshSerialize};
use gavel_types::{AssetRef, BidCommitment, RevealProof, Secret};

/// Call messages for the auction module.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize)]
pub enum AuctionCall {
    // === Auction Lifecycle ===
    /// Create a new auction; the caller's asset is escrowed atomically.
    CreateAuction {
        asset: AssetRef,
        /// Seconds of bidding time from creation
        duration: u64,
        /// Seconds of reveal time after bidding closes
        reveal_window: u64,
        min_bid: u64,
    },

    /// Commit a sealed bid; the attached value is escrowed as the deposit.
    CommitBid {
        auction_id: u64,
        commitment: BidCommitment,
    },

    /// Open a commitment by disclosing the amount and secret, optionally
    /// with a proof of commitment correctness.
    RevealBid {
        auction_id: u64,
        amount: u64,
        secret: Secret,
        proof: Option<RevealProof>,
    },

    // === Automation ===
    /// Settle an expired auction (keeper-triggered, permissionless).
    PerformExpiry { auction_id: u64 },

    // === Funds ===
    /// Withdraw the caller's settled balance.
    Withdraw,
}

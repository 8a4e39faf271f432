//! Auction module error types.

use gavel_registry::RegistryError;
use thiserror::Error;

/// Errors that can occur in the auction module.
///
/// Every rejection is all-or-nothing: a handler that returns an error leaves
/// balances, asset ownership, and auction state exactly as before the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Auction not found: {0}")]
    AuctionNotFound(u64),

    #[error("Auction is not active")]
    AuctionNotActive,

    #[error("Auction is still active")]
    AuctionStillActive,

    #[error("Already submitted a bid for this auction")]
    DuplicateBid,

    #[error("No bid found for this bidder")]
    NoBidFound,

    #[error("Bid already revealed")]
    AlreadyRevealed,

    #[error("Invalid reveal proof")]
    InvalidProof,

    #[error("Revealed amount and secret do not match the commitment")]
    CommitmentMismatch,

    #[error("Not authorized")]
    Unauthorized,

    #[error("Bid below minimum: need {required}, got {got}")]
    BelowMinimumBid { required: u64, got: u64 },

    #[error("Insufficient deposit: need {required}, got {got}")]
    InsufficientDeposit { required: u64, got: u64 },

    #[error("Invalid timing configuration")]
    InvalidTiming,

    #[error("Asset registry rejected the operation: {0}")]
    AssetTransfer(#[from] RegistryError),

    #[error("Nothing to withdraw")]
    NothingToWithdraw,
}

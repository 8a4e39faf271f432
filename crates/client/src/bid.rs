//! Bid preparation.

use rand::{CryptoRng, RngCore};
use thiserror::Error;

use gavel_types::{compute_bid_commitment, BidCommitment, Secret};

/// Errors that can occur during bid preparation.
#[derive(Debug, Error)]
pub enum BidError {
    #[error("Bid amount must be positive")]
    ZeroAmount,
}

/// A prepared bid ready for submission.
///
/// The commitment goes into the commit call; amount and secret stay with the
/// bidder until the reveal phase.
#[derive(Debug, Clone)]
pub struct PreparedBid {
    /// Commitment to submit with the commit call
    pub commitment: BidCommitment,
    /// Blinding secret (keep private until reveal)
    pub secret: Secret,
    /// Bid amount (keep private until reveal)
    pub amount: u64,
}

/// Prepare a sealed bid for an auction.
///
/// Draws a fresh random secret and computes the commitment locally, so the
/// amount never leaves the client before reveal time.
pub fn prepare_bid<R: RngCore + CryptoRng>(amount: u64, rng: &mut R) -> Result<PreparedBid, BidError> {
    if amount == 0 {
        return Err(BidError::ZeroAmount);
    }

    let mut secret_bytes = [0u8; 32];
    rng.fill_bytes(&mut secret_bytes);
    let secret = Secret(secret_bytes);

    let commitment = compute_bid_commitment(amount, &secret);

    Ok(PreparedBid {
        commitment,
        secret,
        amount,
    })
}

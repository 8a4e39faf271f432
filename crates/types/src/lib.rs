//! Core type definitions for the gavel sealed-bid auction system.
//!
//! This crate provides the shared data structures used across the auction
//! workspace: identities and asset references, the bid-commitment primitive,
//! auction and bid records, and the versioned settlement-event wire schema
//! consumed by the relay watcher.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use thiserror::Error;

// =========================
// IDENTITIES & ASSETS
// =========================

/// Generic identity type (32 bytes)
pub type Address = [u8; 32];

/// Reference to a non-fungible asset: registry address + token id.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize,
    Deserialize,
)]
pub struct AssetRef {
    pub registry: Address,
    pub token_id: u64,
}

// =========================
// COMMITMENT PRIMITIVE
// =========================

/// Opaque bid commitment: output of the fixed-arity one-way function over
/// `(amount, secret)`.
#[serde_as]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct BidCommitment(#[serde_as(as = "[_; 32]")] pub [u8; 32]);

/// Bidder-chosen blinding value, disclosed only at reveal time.
#[serde_as]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct Secret(#[serde_as(as = "[_; 32]")] pub [u8; 32]);

/// Compute the commitment for a bid amount under a secret.
///
/// Deterministic and fixed-arity. Binding and hiding are properties of the
/// underlying hash; `reveal` enforces equality against the stored value.
pub fn compute_bid_commitment(amount: u64, secret: &Secret) -> BidCommitment {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"GAVEL_BID_COMMITMENT_V1:");
    hasher.update(amount.to_le_bytes());
    hasher.update(secret.0);
    BidCommitment(hasher.finalize().into())
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(data).into()
}

// =========================
// PROOF MATERIAL
// =========================

/// Uncompressed G1 point (64 bytes), opaque to this crate.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G1Point(#[serde_as(as = "[_; 64]")] pub [u8; 64]);

impl Default for G1Point {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

/// Uncompressed G2 point (128 bytes), opaque to this crate.
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct G2Point(#[serde_as(as = "[_; 128]")] pub [u8; 128]);

impl Default for G2Point {
    fn default() -> Self {
        Self([0u8; 128])
    }
}

/// Field element (32 bytes, little-endian), used for proof public signals.
#[serde_as]
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub struct FieldElement(#[serde_as(as = "[_; 32]")] pub [u8; 32]);

impl Default for FieldElement {
    fn default() -> Self {
        Self([0u8; 32])
    }
}

/// Zero-knowledge proof of commitment correctness, verified by an external
/// verifier as a black-box predicate over (a, b, c, public signals).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct RevealProof {
    pub a: G1Point,
    pub b: G2Point,
    pub c: G1Point,
}

// =========================
// AUCTION TYPES
// =========================

/// Auction lifecycle state
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum LifecycleState {
    /// Accepting commits until `end_time`, reveals afterwards
    Active,
    /// Settled, terminal
    Ended,
}

/// A single auction record.
///
/// Immutable after creation except for `state`; timing fields satisfy
/// `start_time < end_time < reveal_deadline`.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Auction {
    pub auction_id: u64,
    pub seller: Address,
    pub asset: AssetRef,
    pub state: LifecycleState,

    // Timing
    pub start_time: u64,
    pub end_time: u64,
    pub reveal_deadline: u64,

    // Rules
    pub min_bid: u64,
}

/// A committed bid. At most one per (auction, bidder).
///
/// `revealed = true` implies `amount` and `reveal_time` are set and the
/// stored commitment equals `compute_bid_commitment(amount, secret)` for the
/// secret disclosed at reveal time.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Bid {
    pub bidder: Address,
    pub commitment: BidCommitment,
    pub deposit: u64,
    pub commit_time: u64,
    pub revealed: bool,
    pub amount: Option<u64>,
    pub reveal_time: Option<u64>,
}

/// Outcome of a settled auction, stored by the primary domain.
#[derive(Clone, Debug, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub auction_id: u64,
    /// `None` when the auction expired without a valid revealed bid.
    pub winner: Option<Address>,
    pub winning_amount: u64,
    pub num_revealed: u32,
    pub settlement_time: u64,
    /// Caller that triggered the expiry transition.
    pub trigger: Address,
}

// =========================
// SETTLEMENT EVENT WIRE SCHEMA
// =========================

/// Wire schema version for [`SettlementEvent`] payloads.
pub const SETTLEMENT_EVENT_SCHEMA_VERSION: u16 = 1;

/// Settlement record as emitted on the one-way relay channel.
///
/// Only auctions that produced a winner emit an event; `amounts[i]` is the
/// escrowed deposit of `bidders[i]`, i.e. the refundable total the watcher
/// disburses in its own domain.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct SettlementEvent {
    pub schema_version: u16,
    pub auction_id: u64,
    pub seller: Address,
    pub asset: AssetRef,
    pub winner: Address,
    pub winning_amount: u64,
    pub bidders: Vec<Address>,
    pub amounts: Vec<u64>,
}

/// Errors raised when decoding a settlement-event payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventDecodeError {
    #[error("invalid event encoding: {0}")]
    Encoding(String),

    #[error("unsupported schema version {got}, expected {expected}")]
    UnsupportedVersion { got: u16, expected: u16 },

    #[error("bidder/amount list length mismatch: {bidders} vs {amounts}")]
    LengthMismatch { bidders: usize, amounts: usize },

    #[error("winner is not in the bidder list")]
    WinnerNotListed,
}

impl SettlementEvent {
    /// Build a current-version event.
    pub fn new(
        auction_id: u64,
        seller: Address,
        asset: AssetRef,
        winner: Address,
        winning_amount: u64,
        bidders: Vec<Address>,
        amounts: Vec<u64>,
    ) -> Self {
        Self {
            schema_version: SETTLEMENT_EVENT_SCHEMA_VERSION,
            auction_id,
            seller,
            asset,
            winner,
            winning_amount,
            bidders,
            amounts,
        }
    }

    /// Canonical wire encoding.
    pub fn encode(&self) -> Vec<u8> {
        borsh::to_vec(self).expect("settlement event encoding is infallible")
    }

    /// Decode and validate a wire payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, EventDecodeError> {
        let event: SettlementEvent =
            borsh::from_slice(bytes).map_err(|e| EventDecodeError::Encoding(e.to_string()))?;

        if event.schema_version != SETTLEMENT_EVENT_SCHEMA_VERSION {
            return Err(EventDecodeError::UnsupportedVersion {
                got: event.schema_version,
                expected: SETTLEMENT_EVENT_SCHEMA_VERSION,
            });
        }
        if event.bidders.len() != event.amounts.len() {
            return Err(EventDecodeError::LengthMismatch {
                bidders: event.bidders.len(),
                amounts: event.amounts.len(),
            });
        }
        if !event.bidders.contains(&event.winner) {
            return Err(EventDecodeError::WinnerNotListed);
        }

        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event() -> SettlementEvent {
        SettlementEvent::new(
            7,
            [1u8; 32],
            AssetRef {
                registry: [9u8; 32],
                token_id: 42,
            },
            [2u8; 32],
            200,
            vec![[2u8; 32], [3u8; 32]],
            vec![250, 150],
        )
    }

    #[test]
    fn test_commitment_depends_on_amount_and_secret() {
        let secret = Secret([7u8; 32]);
        let c1 = compute_bid_commitment(100, &secret);
        let c2 = compute_bid_commitment(101, &secret);
        let c3 = compute_bid_commitment(100, &Secret([8u8; 32]));

        assert_ne!(c1, c2);
        assert_ne!(c1, c3);
        assert_ne!(c2, c3);

        // Same inputs recompute to the same commitment
        assert_eq!(c1, compute_bid_commitment(100, &secret));
    }

    #[test]
    fn test_event_decode_accepts_valid_payload() {
        let event = sample_event();
        let decoded = SettlementEvent::decode(&event.encode()).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn test_event_decode_rejects_unknown_version() {
        let mut event = sample_event();
        event.schema_version = 2;
        assert!(matches!(
            SettlementEvent::decode(&event.encode()),
            Err(EventDecodeError::UnsupportedVersion { got: 2, .. })
        ));
    }

    #[test]
    fn test_event_decode_rejects_length_mismatch() {
        let mut event = sample_event();
        event.amounts.pop();
        assert!(matches!(
            SettlementEvent::decode(&event.encode()),
            Err(EventDecodeError::LengthMismatch {
                bidders: 2,
                amounts: 1
            })
        ));
    }

    #[test]
    fn test_event_decode_rejects_unlisted_winner() {
        let mut event = sample_event();
        event.winner = [99u8; 32];
        assert!(matches!(
            SettlementEvent::decode(&event.encode()),
            Err(EventDecodeError::WinnerNotListed)
        ));
    }

    #[test]
    fn test_event_decode_rejects_garbage() {
        assert!(matches!(
            SettlementEvent::decode(&[0u8; 3]),
            Err(EventDecodeError::Encoding(_))
        ));
    }
}

//! Client SDK for sealed-bid auctions.
//!
//! This crate provides a high-level API for:
//! - Preparing sealed bids (secret generation and commitment computation,
//!   done locally so the amount never appears in commit calldata)
//! - Submitting commits and reveals over RPC
//! - Querying auction state and claiming proceeds

pub mod bid;

pub use bid::{prepare_bid, PreparedBid};

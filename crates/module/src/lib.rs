//! Sealed-bid auction module with commit-reveal bidding.
//!
//! This crate implements the primary-domain logic for sealed-bid NFT
//! auctions:
//!
//! - Auction creation with atomic asset escrow
//! - Commit-reveal bidding with hash-commitment binding and optional
//!   zero-knowledge reveal proofs
//! - Deterministic highest-bid selection with a documented tie-break
//! - Keeper-tolerant expiry detection and idempotent settlement
//! - Escrow, refund, and proceeds-withdrawal handling
//! - Settlement-event emission for the cross-domain relay watcher
//!
//! # Architecture
//!
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `queries`: Read-only state access
//! - `state`: Primary-domain state structures
//! - `verifier`: Black-box proof-verification interface
//! - `genesis`: Initial configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use gavel_module::{handlers, AuctionState, CallContext};
//!
//! let mut state = AuctionState::new(house);
//! let ctx = CallContext { sender, block_height, timestamp, value };
//!
//! // Create an auction (escrows the asset)
//! let auction_id = handlers::handle_create_auction(&mut state, &mut registry, &ctx, ...)?;
//!
//! // Commit a sealed bid
//! handlers::handle_commit_bid(&mut state, &ctx, auction_id, commitment)?;
//! ```

pub mod call;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod queries;
pub mod state;
pub mod verifier;

pub use call::AuctionCall;
pub use error::AuctionError;
pub use genesis::{DefaultAuctionParams, GenesisConfig};
pub use handlers::{CallContext, HandlerResult};
pub use queries::{AuctionQuery, AuctionQueryResponse};
pub use state::AuctionState;
pub use verifier::{ProofVerifier, StructuralVerifier};

//! Automated expiry keeper for sealed-bid auctions.
//!
//! The keeper service:
//! 1. Polls the chain for the next Active auction past its reveal deadline
//! 2. Triggers `performExpiry` for that auction
//! 3. Relies on the module's defensive re-check, so duplicate or stale
//!    triggers are harmless no-ops
//!
//! Anyone can run this service: expiry triggering is permissionless, and
//! the module tolerates arbitrary call frequency and ordering from it.

pub mod service;

pub use service::{ExpiryEndpoint, KeeperConfig, KeeperService, RpcExpiryEndpoint};

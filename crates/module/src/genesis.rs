//! Genesis configuration for the auction module.
//!
//! Defines the initial configuration for the auction system when the host
//! environment starts.

use gavel_types::Address;
use serde::{Deserialize, Serialize};

/// Genesis configuration for the auction module.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Identity that holds escrowed assets while auctions run.
    pub house: Address,

    /// Default auction parameters.
    pub default_params: DefaultAuctionParams,

    /// Verifying-key hash binding for the reveal-proof verifier, if proofs
    /// are enforced in this deployment.
    pub verifier_vkey_hash: Option<[u8; 32]>,
}

/// Default parameters for new auctions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DefaultAuctionParams {
    /// Default minimum bid amount
    pub min_bid: u64,
    /// Minimum bidding duration (seconds)
    pub min_duration: u64,
    /// Minimum reveal window after bidding closes (seconds)
    pub min_reveal_window: u64,
}

impl Default for DefaultAuctionParams {
    fn default() -> Self {
        Self {
            min_bid: 1,
            min_duration: 3600,      // 1 hour
            min_reveal_window: 600,  // 10 minutes
        }
    }
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            house: [0xAAu8; 32],
            default_params: DefaultAuctionParams::default(),
            verifier_vkey_hash: None,
        }
    }
}

impl GenesisConfig {
    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.house == [0u8; 32] {
            return Err(GenesisValidationError::InvalidHouse);
        }
        if self.default_params.min_duration == 0 {
            return Err(GenesisValidationError::InvalidDefaultParams(
                "Minimum duration cannot be zero".into(),
            ));
        }
        if self.default_params.min_reveal_window == 0 {
            return Err(GenesisValidationError::InvalidDefaultParams(
                "Minimum reveal window cannot be zero".into(),
            ));
        }
        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("House identity cannot be the zero address")]
    InvalidHouse,

    #[error("Invalid default parameters: {0}")]
    InvalidDefaultParams(String),
}

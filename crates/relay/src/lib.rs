//! Cross-Domain Settlement Relay Watcher
//!
//! This crate re-executes auction settlements in a separate execution
//! domain by:
//! 1. Receiving settlement-event payloads from a subscribed source
//! 2. Decoding and validating the versioned wire schema
//! 3. Rejecting replayed events for an already-seen auction id
//! 4. Transferring the asset and funds against its own local registries
//! 5. Recording an idempotent audit trail
//!
//! The watcher never assumes the primary settlement moved anything in its
//! domain: the watcher's registries are authoritative for its own transfers,
//! and the event channel is treated as at-least-once delivery.

pub mod service;

use std::collections::HashMap;

use gavel_registry::{AssetRegistry, Ledger, RegistryError};
use gavel_types::{Address, AssetRef, EventDecodeError, SettlementEvent};
use thiserror::Error;
use tracing::{debug, info, warn};

pub use service::{FeedRecord, RelayConfig, RelayService, RpcSettlementFeed, SettlementFeed};

/// Errors that can occur while relaying a settlement.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    #[error("Duplicate settlement event for auction {0}")]
    DuplicateSettlementEvent(u64),

    #[error("Event from unexpected source or domain")]
    SourceMismatch,

    #[error("Failed to decode event payload: {0}")]
    Decode(#[from] EventDecodeError),

    #[error("Winning amount exceeds the winner's escrowed deposit")]
    WinnerDepositShortfall,

    #[error("Vault holds {available}, settlement needs {needed}")]
    InsufficientVaultFunds { needed: u64, available: u64 },

    #[error("Transfer failed in watcher domain: {0}")]
    Transfer(#[from] RegistryError),
}

/// The event stream this watcher is subscribed to: a specific settlement
/// signature from a specific source address on a specific source domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Source (origin) domain identifier
    pub origin_domain: u64,
    /// Emitting address on the source domain
    pub source: Address,
}

/// A delivered event as seen by the watcher: provenance plus raw payload.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub origin_domain: u64,
    pub source: Address,
    pub payload: Vec<u8>,
}

/// Denormalized settlement snapshot, constructed once from a decoded event
/// and immutable afterwards. Owned exclusively by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionInfo {
    pub seller: Address,
    pub asset: AssetRef,
    pub winner: Address,
    pub winning_amount: u64,
    pub bidders: Vec<Address>,
    pub amounts: Vec<u64>,
}

impl AuctionInfo {
    fn from_event(event: &SettlementEvent) -> Self {
        Self {
            seller: event.seller,
            asset: event.asset,
            winner: event.winner,
            winning_amount: event.winning_amount,
            bidders: event.bidders.clone(),
            amounts: event.amounts.clone(),
        }
    }
}

/// Outcome of processing one delivered event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// First sighting: snapshot stored, transfers executed.
    Applied,
    /// Redelivery of a known auction id: nothing moved.
    Duplicate,
}

/// One entry in the watcher's ordered audit trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    pub auction_id: u64,
    pub outcome: Outcome,
}

/// Relay watcher holding its own local view of the asset and fund
/// registries.
///
/// Assets and pooled deposits in the watcher's domain are custodied by a
/// configured vault identity until a settlement event disburses them.
#[derive(Debug)]
pub struct RelayWatcher<R: AssetRegistry> {
    subscription: Subscription,
    /// Local custodian of escrowed assets and pooled deposits
    vault: Address,
    /// Local asset registry (watcher domain)
    registry: R,
    /// Local fund ledger (watcher domain)
    ledger: Ledger,
    /// Snapshots by auction id, first write wins
    infos: HashMap<u64, AuctionInfo>,
    /// Ordered processing history
    audit: Vec<AuditRecord>,
}

impl<R: AssetRegistry> RelayWatcher<R> {
    /// Create a watcher over its own local registry instance.
    pub fn new(subscription: Subscription, vault: Address, registry: R) -> Self {
        Self {
            subscription,
            vault,
            registry,
            ledger: Ledger::new(),
            infos: HashMap::new(),
            audit: Vec::new(),
        }
    }

    /// Credit the vault's local fund pool (deposit mirroring is outside the
    /// watcher's scope; tests and hosts use this to seed the domain).
    pub fn fund_vault(&mut self, amount: u64) {
        self.ledger.credit(self.vault, amount);
    }

    /// Process one delivered event end to end.
    ///
    /// Replays of a known auction id are a success no-op, absorbing the
    /// at-least-once delivery of the relay channel. Malformed payloads and
    /// unknown sources are errors.
    pub fn process_event(&mut self, envelope: &EventEnvelope) -> Result<Outcome, RelayError> {
        if envelope.origin_domain != self.subscription.origin_domain
            || envelope.source != self.subscription.source
        {
            warn!(
                origin_domain = envelope.origin_domain,
                source = %hex::encode(envelope.source),
                "Dropping event from unexpected source"
            );
            return Err(RelayError::SourceMismatch);
        }

        let event = SettlementEvent::decode(&envelope.payload)?;

        match self.apply_event(&event) {
            Ok(()) => Ok(Outcome::Applied),
            Err(RelayError::DuplicateSettlementEvent(id)) => {
                info!(auction_id = id, "Replayed settlement event, no-op");
                self.audit.push(AuditRecord {
                    auction_id: id,
                    outcome: Outcome::Duplicate,
                });
                Ok(Outcome::Duplicate)
            }
            Err(e) => Err(e),
        }
    }

    /// Strict single-application path: rejects replays as an error.
    ///
    /// Transfers run before the snapshot is stored, so a failed application
    /// leaves no trace and a redelivery can retry it.
    pub fn apply_event(&mut self, event: &SettlementEvent) -> Result<(), RelayError> {
        if self.infos.contains_key(&event.auction_id) {
            return Err(RelayError::DuplicateSettlementEvent(event.auction_id));
        }

        let winner_deposit = event
            .bidders
            .iter()
            .position(|b| *b == event.winner)
            .map(|i| event.amounts[i])
            .unwrap_or(0);
        if winner_deposit < event.winning_amount {
            return Err(RelayError::WinnerDepositShortfall);
        }

        let needed: u64 = event.amounts.iter().sum();
        let available = self.ledger.balance(&self.vault);
        if available < needed {
            return Err(RelayError::InsufficientVaultFunds { needed, available });
        }

        // Asset to the winner in this domain, out of the local vault.
        self.registry
            .transfer(self.vault, event.winner, &event.asset)?;

        // Funds: winning amount to the seller, deposit excess back to the
        // winner, full refunds to everyone else.
        self.ledger.debit(&self.vault, needed);
        self.ledger.credit(event.seller, event.winning_amount);
        if winner_deposit > event.winning_amount {
            self.ledger
                .credit(event.winner, winner_deposit - event.winning_amount);
        }
        for (bidder, amount) in event.bidders.iter().zip(event.amounts.iter()) {
            if *bidder != event.winner {
                self.ledger.credit(*bidder, *amount);
            }
        }

        debug!(
            auction_id = event.auction_id,
            winner = %hex::encode(event.winner),
            winning_amount = event.winning_amount,
            refunds = event.bidders.len().saturating_sub(1),
            "Applied settlement in watcher domain"
        );

        self.infos
            .insert(event.auction_id, AuctionInfo::from_event(event));
        self.audit.push(AuditRecord {
            auction_id: event.auction_id,
            outcome: Outcome::Applied,
        });

        info!(auction_id = event.auction_id, "Settlement relayed");
        Ok(())
    }

    /// Snapshot for an auction id, if one has been applied.
    pub fn get_info(&self, auction_id: u64) -> Option<&AuctionInfo> {
        self.infos.get(&auction_id)
    }

    /// Ordered processing history.
    pub fn audit_trail(&self) -> &[AuditRecord] {
        &self.audit
    }

    /// Local fund balance of an identity in the watcher's domain.
    pub fn balance(&self, address: &Address) -> u64 {
        self.ledger.balance(address)
    }

    /// Local asset registry view.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Number of distinct auctions applied.
    pub fn applied_count(&self) -> usize {
        self.infos.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_registry::InMemoryAssetRegistry;

    const SOURCE: Address = [0xCCu8; 32];
    const VAULT: Address = [0xDDu8; 32];
    const SELLER: Address = [1u8; 32];
    const WINNER: Address = [2u8; 32];
    const LOSER: Address = [3u8; 32];

    fn subscription() -> Subscription {
        Subscription {
            origin_domain: 1,
            source: SOURCE,
        }
    }

    fn watcher_with_asset(token_id: u64) -> (RelayWatcher<InMemoryAssetRegistry>, AssetRef) {
        let mut registry = InMemoryAssetRegistry::new([9u8; 32]);
        let asset = registry.mint(token_id, VAULT);
        let mut watcher = RelayWatcher::new(subscription(), VAULT, registry);
        watcher.fund_vault(1_000);
        (watcher, asset)
    }

    fn envelope(event: &SettlementEvent) -> EventEnvelope {
        EventEnvelope {
            origin_domain: 1,
            source: SOURCE,
            payload: event.encode(),
        }
    }

    fn sample_event(asset: AssetRef) -> SettlementEvent {
        SettlementEvent::new(
            1,
            SELLER,
            asset,
            WINNER,
            200,
            vec![WINNER, LOSER],
            vec![250, 150],
        )
    }

    #[test]
    fn test_apply_settlement() {
        let (mut watcher, asset) = watcher_with_asset(1);
        let event = sample_event(asset);

        let outcome = watcher.process_event(&envelope(&event)).unwrap();
        assert_eq!(outcome, Outcome::Applied);

        assert_eq!(watcher.registry().owner_of(&asset).unwrap(), WINNER);
        assert_eq!(watcher.balance(&SELLER), 200);
        // Winner gets the deposit excess back, loser the full deposit
        assert_eq!(watcher.balance(&WINNER), 50);
        assert_eq!(watcher.balance(&LOSER), 150);
        assert_eq!(watcher.balance(&VAULT), 600);

        assert_eq!(watcher.get_info(1).unwrap().winning_amount, 200);
    }

    #[test]
    fn test_replay_is_noop() {
        let (mut watcher, asset) = watcher_with_asset(1);
        let event = sample_event(asset);

        watcher.process_event(&envelope(&event)).unwrap();
        let snapshot = watcher.get_info(1).cloned().unwrap();

        let outcome = watcher.process_event(&envelope(&event)).unwrap();
        assert_eq!(outcome, Outcome::Duplicate);

        // Same snapshot, transfers exactly once
        assert_eq!(watcher.get_info(1), Some(&snapshot));
        assert_eq!(watcher.balance(&SELLER), 200);
        assert_eq!(watcher.balance(&LOSER), 150);
        assert_eq!(watcher.applied_count(), 1);

        let trail = watcher.audit_trail();
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].outcome, Outcome::Applied);
        assert_eq!(trail[1].outcome, Outcome::Duplicate);
    }

    #[test]
    fn test_strict_apply_rejects_replay() {
        let (mut watcher, asset) = watcher_with_asset(1);
        let event = sample_event(asset);

        watcher.apply_event(&event).unwrap();
        assert_eq!(
            watcher.apply_event(&event),
            Err(RelayError::DuplicateSettlementEvent(1))
        );
    }

    #[test]
    fn test_unexpected_source_rejected() {
        let (mut watcher, asset) = watcher_with_asset(1);
        let event = sample_event(asset);

        let mut env = envelope(&event);
        env.source = [0xEEu8; 32];
        assert_eq!(
            watcher.process_event(&env),
            Err(RelayError::SourceMismatch)
        );

        let mut env = envelope(&event);
        env.origin_domain = 2;
        assert_eq!(
            watcher.process_event(&env),
            Err(RelayError::SourceMismatch)
        );

        assert_eq!(watcher.applied_count(), 0);
    }

    #[test]
    fn test_malformed_payload_rejected() {
        let (mut watcher, _) = watcher_with_asset(1);

        let env = EventEnvelope {
            origin_domain: 1,
            source: SOURCE,
            payload: vec![0u8; 4],
        };
        assert!(matches!(
            watcher.process_event(&env),
            Err(RelayError::Decode(_))
        ));
    }

    #[test]
    fn test_winner_deposit_shortfall_rejected() {
        let (mut watcher, asset) = watcher_with_asset(1);
        let mut event = sample_event(asset);
        event.winning_amount = 300; // above the winner's 250 deposit

        assert_eq!(
            watcher.apply_event(&event),
            Err(RelayError::WinnerDepositShortfall)
        );
        assert_eq!(watcher.applied_count(), 0);
    }

    #[test]
    fn test_underfunded_vault_leaves_no_trace() {
        let mut registry = InMemoryAssetRegistry::new([9u8; 32]);
        let asset = registry.mint(1, VAULT);
        let mut watcher = RelayWatcher::new(subscription(), VAULT, registry);
        watcher.fund_vault(100);

        let event = sample_event(asset);
        assert_eq!(
            watcher.apply_event(&event),
            Err(RelayError::InsufficientVaultFunds {
                needed: 400,
                available: 100
            })
        );

        // Nothing stored: a redelivery can retry after the vault is funded
        assert_eq!(watcher.applied_count(), 0);
        assert_eq!(watcher.registry().owner_of(&asset).unwrap(), VAULT);

        watcher.fund_vault(300);
        assert_eq!(
            watcher.process_event(&envelope(&event)).unwrap(),
            Outcome::Applied
        );
    }

    #[test]
    fn test_distinct_auctions_both_apply() {
        let mut registry = InMemoryAssetRegistry::new([9u8; 32]);
        let asset_a = registry.mint(1, VAULT);
        let asset_b = registry.mint(2, VAULT);
        let mut watcher = RelayWatcher::new(subscription(), VAULT, registry);
        watcher.fund_vault(2_000);

        let mut event_a = sample_event(asset_a);
        event_a.auction_id = 1;
        let mut event_b = sample_event(asset_b);
        event_b.auction_id = 2;

        watcher.process_event(&envelope(&event_a)).unwrap();
        watcher.process_event(&envelope(&event_b)).unwrap();

        assert_eq!(watcher.applied_count(), 2);
        assert_eq!(watcher.balance(&SELLER), 400);
    }
}

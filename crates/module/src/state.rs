//! Primary-domain state for the auction module.

use std::collections::{BTreeMap, HashMap};

use gavel_registry::Ledger;
use gavel_types::{Address, Auction, Bid, SettlementEvent, SettlementRecord};

/// Auction module state.
///
/// Auctions live in an ordered arena keyed by dense ascending ids so the
/// expiry scan is deterministic. Bids are keyed by (auction, bidder);
/// `auction_bidders` preserves commit order per auction. All mutation goes
/// through the handlers, one serialized call at a time.
#[derive(Debug)]
pub struct AuctionState {
    /// Identity that holds escrowed assets while an auction is active
    pub house: Address,

    /// Next auction ID to assign
    pub next_auction_id: u64,

    /// All auctions by ID, ascending
    pub auctions: BTreeMap<u64, Auction>,

    /// Bids: (auction_id, bidder) -> bid
    pub bids: HashMap<(u64, Address), Bid>,

    /// Bidders per auction, in commit order
    pub auction_bidders: HashMap<u64, Vec<Address>>,

    /// Settlement results
    pub results: HashMap<u64, SettlementRecord>,

    /// Deposits locked with commitments
    pub escrow: Ledger,

    /// Withdrawable balances released by settlement
    pub proceeds: Ledger,

    /// Append-only settlement event log: (sequence, event)
    pub events: Vec<(u64, SettlementEvent)>,
}

impl AuctionState {
    /// Create a new auction state with the given escrow-holder identity.
    pub fn new(house: Address) -> Self {
        Self {
            house,
            next_auction_id: 1,
            auctions: BTreeMap::new(),
            bids: HashMap::new(),
            auction_bidders: HashMap::new(),
            results: HashMap::new(),
            escrow: Ledger::new(),
            proceeds: Ledger::new(),
            events: Vec::new(),
        }
    }

    /// Get the next auction ID and increment.
    pub fn allocate_auction_id(&mut self) -> u64 {
        let id = self.next_auction_id;
        self.next_auction_id += 1;
        id
    }

    /// Get auction by ID.
    pub fn get_auction(&self, auction_id: u64) -> Option<&Auction> {
        self.auctions.get(&auction_id)
    }

    /// Get mutable auction by ID.
    pub fn get_auction_mut(&mut self, auction_id: u64) -> Option<&mut Auction> {
        self.auctions.get_mut(&auction_id)
    }

    /// Get all bids for an auction, in commit order.
    pub fn get_auction_bids(&self, auction_id: u64) -> Vec<&Bid> {
        self.auction_bidders
            .get(&auction_id)
            .map(|bidders| {
                bidders
                    .iter()
                    .filter_map(|bidder| self.bids.get(&(auction_id, *bidder)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append a settlement event to the outbound log, returning its sequence.
    pub fn append_event(&mut self, event: SettlementEvent) -> u64 {
        let seq = self.events.len() as u64;
        self.events.push((seq, event));
        seq
    }

    /// Events at or after the given sequence number.
    pub fn events_from(&self, seq: u64) -> &[(u64, SettlementEvent)] {
        let start = (seq as usize).min(self.events.len());
        &self.events[start..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gavel_types::AssetRef;

    #[test]
    fn test_allocate_auction_id() {
        let mut state = AuctionState::new([0u8; 32]);
        assert_eq!(state.allocate_auction_id(), 1);
        assert_eq!(state.allocate_auction_id(), 2);
        assert_eq!(state.allocate_auction_id(), 3);
    }

    #[test]
    fn test_event_log_sequencing() {
        let mut state = AuctionState::new([0u8; 32]);
        let asset = AssetRef {
            registry: [9u8; 32],
            token_id: 1,
        };

        let e0 = SettlementEvent::new(1, [1u8; 32], asset, [2u8; 32], 10, vec![[2u8; 32]], vec![10]);
        let e1 = SettlementEvent::new(2, [1u8; 32], asset, [3u8; 32], 20, vec![[3u8; 32]], vec![20]);

        assert_eq!(state.append_event(e0), 0);
        assert_eq!(state.append_event(e1), 1);

        assert_eq!(state.events_from(0).len(), 2);
        assert_eq!(state.events_from(1).len(), 1);
        assert_eq!(state.events_from(1)[0].1.auction_id, 2);
        assert!(state.events_from(5).is_empty());
    }
}

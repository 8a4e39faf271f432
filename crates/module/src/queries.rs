//! Query handlers for the auction module.
//!
//! These functions provide read-only access to auction state.

use crate::handlers::check_expired;
use crate::state::AuctionState;
use gavel_types::{Address, Auction, Bid, LifecycleState, SettlementRecord};
use serde::{Deserialize, Serialize};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQuery {
    /// Get auction details by ID.
    GetAuction { auction_id: u64 },

    /// Get all auctions (paginated).
    ListAuctions { offset: u64, limit: u64 },

    /// Get all bids for an auction, in commit order.
    GetAuctionBids { auction_id: u64 },

    /// Get a specific bid.
    GetBid { auction_id: u64, bidder: Address },

    /// Get the settlement record of an auction.
    GetResult { auction_id: u64 },

    /// Get a bidder's locked escrow balance.
    GetEscrow { address: Address },

    /// Get an identity's withdrawable balance.
    GetProceeds { address: Address },

    /// Scan for the next expired auction at the given time.
    CheckExpired { now: u64 },
}

/// Query response types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AuctionQueryResponse {
    /// Auction details.
    Auction(Option<Auction>),

    /// List of auctions.
    AuctionList(Vec<Auction>),

    /// Bids for an auction.
    Bids(Vec<Bid>),

    /// Single bid.
    Bid(Option<Bid>),

    /// Settlement record.
    Result(Option<SettlementRecord>),

    /// Escrow balance.
    Escrow(u64),

    /// Withdrawable balance.
    Proceeds(u64),

    /// Next expired auction id, if any.
    Expired(Option<u64>),
}

/// Handle a query.
pub fn handle_query(state: &AuctionState, query: AuctionQuery) -> AuctionQueryResponse {
    match query {
        AuctionQuery::GetAuction { auction_id } => {
            AuctionQueryResponse::Auction(state.get_auction(auction_id).cloned())
        }

        AuctionQuery::ListAuctions { offset, limit } => {
            let auctions: Vec<Auction> = state
                .auctions
                .values()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect();
            AuctionQueryResponse::AuctionList(auctions)
        }

        AuctionQuery::GetAuctionBids { auction_id } => {
            let bids = state
                .get_auction_bids(auction_id)
                .into_iter()
                .cloned()
                .collect();
            AuctionQueryResponse::Bids(bids)
        }

        AuctionQuery::GetBid { auction_id, bidder } => {
            let bid = state.bids.get(&(auction_id, bidder)).cloned();
            AuctionQueryResponse::Bid(bid)
        }

        AuctionQuery::GetResult { auction_id } => {
            AuctionQueryResponse::Result(state.results.get(&auction_id).cloned())
        }

        AuctionQuery::GetEscrow { address } => {
            AuctionQueryResponse::Escrow(state.escrow.balance(&address))
        }

        AuctionQuery::GetProceeds { address } => {
            AuctionQueryResponse::Proceeds(state.proceeds.balance(&address))
        }

        AuctionQuery::CheckExpired { now } => {
            AuctionQueryResponse::Expired(check_expired(state, now))
        }
    }
}

/// Summary of an auction for listing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuctionSummary {
    pub auction_id: u64,
    pub seller: Address,
    pub state: LifecycleState,
    pub end_time: u64,
    pub reveal_deadline: u64,
    pub num_bids: usize,
    pub num_revealed: usize,
}

impl AuctionSummary {
    /// Create summary from an auction and its bids.
    pub fn from_auction(auction: &Auction, bids: &[&Bid]) -> Self {
        Self {
            auction_id: auction.auction_id,
            seller: auction.seller,
            state: auction.state,
            end_time: auction.end_time,
            reveal_deadline: auction.reveal_deadline,
            num_bids: bids.len(),
            num_revealed: bids.iter().filter(|b| b.revealed).count(),
        }
    }
}

/// Get auction summaries for listing.
pub fn get_auction_summaries(
    state: &AuctionState,
    offset: usize,
    limit: usize,
) -> Vec<AuctionSummary> {
    state
        .auctions
        .values()
        .skip(offset)
        .take(limit)
        .map(|auction| {
            let bids = state.get_auction_bids(auction.auction_id);
            AuctionSummary::from_auction(auction, &bids)
        })
        .collect()
}

/// Get auctions currently accepting commits.
pub fn get_open_auctions(state: &AuctionState, current_time: u64) -> Vec<AuctionSummary> {
    state
        .auctions
        .values()
        .filter(|a| a.state == LifecycleState::Active && current_time < a.end_time)
        .map(|auction| {
            let bids = state.get_auction_bids(auction.auction_id);
            AuctionSummary::from_auction(auction, &bids)
        })
        .collect()
}

/// Get every Active auction past its reveal deadline, ascending by id.
pub fn get_expired_auctions(state: &AuctionState, current_time: u64) -> Vec<u64> {
    state
        .auctions
        .values()
        .filter(|a| a.state == LifecycleState::Active && current_time >= a.reveal_deadline)
        .map(|a| a.auction_id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_escrow_query() {
        let mut state = AuctionState::new([0u8; 32]);
        let addr = [1u8; 32];
        state.escrow.credit(addr, 100);

        let response = handle_query(&state, AuctionQuery::GetEscrow { address: addr });
        assert!(matches!(response, AuctionQueryResponse::Escrow(100)));
    }

    #[test]
    fn test_check_expired_query_empty_state() {
        let state = AuctionState::new([0u8; 32]);
        let response = handle_query(&state, AuctionQuery::CheckExpired { now: 5000 });
        assert!(matches!(response, AuctionQueryResponse::Expired(None)));
    }

    #[test]
    fn test_get_result_none_before_settlement() {
        let state = AuctionState::new([0u8; 32]);
        let response = handle_query(&state, AuctionQuery::GetResult { auction_id: 1 });
        assert!(matches!(response, AuctionQueryResponse::Result(None)));
    }
}

//! End-to-end integration tests for the gavel auction system.
//!
//! These tests exercise the full auction lifecycle:
//! 1. Auction creation with asset escrow
//! 2. Sealed-bid commit and reveal
//! 3. Keeper-driven expiry and settlement
//! 4. Cross-domain relay of the settlement event

use std::sync::{Arc, Mutex};

use jsonrpsee::core::async_trait;

use gavel_client::prepare_bid;
use gavel_keeper::{ExpiryEndpoint, KeeperService};
use gavel_module::{
    handlers::{
        check_expired, handle_commit_bid, handle_create_auction, handle_perform_expiry,
        handle_reveal_bid, handle_withdraw, select_winner, CallContext,
    },
    AuctionError, AuctionState, StructuralVerifier,
};
use gavel_registry::{AssetRegistry, InMemoryAssetRegistry};
use gavel_types::{
    compute_bid_commitment, Address, AssetRef, Bid, LifecycleState, Secret, SettlementEvent,
};
use gavel_relay::{EventEnvelope, Outcome, RelayWatcher, Subscription};
use rand::rngs::OsRng;

const HOUSE: Address = [0xAAu8; 32];
const SELLER: Address = [1u8; 32];
const BIDDER_A: Address = [2u8; 32];
const BIDDER_B: Address = [3u8; 32];
const KEEPER: Address = [7u8; 32];
const VAULT: Address = [0xDDu8; 32];

fn ctx(sender: Address, timestamp: u64, value: u64) -> CallContext {
    CallContext {
        sender,
        block_height: 0,
        timestamp,
        value,
    }
}

/// Seller's chain with one mintable asset: (state, registry, asset).
fn primary_domain() -> (AuctionState, InMemoryAssetRegistry, AssetRef) {
    let mut registry = InMemoryAssetRegistry::new([0x11u8; 32]);
    let asset = registry.mint(1, SELLER);
    (AuctionState::new(HOUSE), registry, asset)
}

fn commit(
    state: &mut AuctionState,
    auction_id: u64,
    bidder: Address,
    amount: u64,
    deposit: u64,
    at: u64,
) -> Secret {
    let secret = Secret([bidder[0]; 32]);
    let commitment = compute_bid_commitment(amount, &secret);
    handle_commit_bid(state, &ctx(bidder, at, deposit), auction_id, commitment).unwrap();
    secret
}

fn reveal(
    state: &mut AuctionState,
    auction_id: u64,
    bidder: Address,
    amount: u64,
    secret: Secret,
    at: u64,
) {
    handle_reveal_bid(
        state,
        &StructuralVerifier,
        &ctx(bidder, at, 0),
        auction_id,
        amount,
        secret,
        None,
    )
    .unwrap();
}

/// The documented end-to-end scenario: one hour of bidding with minimum bid
/// 100, two sealed bids, reveals after expiry, settlement to the higher
/// reveal.
#[test]
fn test_full_auction_lifecycle() {
    let (mut state, mut registry, asset) = primary_domain();

    // ========================================
    // Phase 1: Create auction (asset escrowed)
    // ========================================

    let auction_id = handle_create_auction(
        &mut state,
        &mut registry,
        &ctx(SELLER, 0, 0),
        asset,
        3600,
        600,
        100,
    )
    .unwrap();

    assert_eq!(registry.owner_of(&asset).unwrap(), HOUSE);

    // ========================================
    // Phase 2: Sealed commits during bidding
    // ========================================

    let secret_a = commit(&mut state, auction_id, BIDDER_A, 150, 150, 1000);
    let secret_b = commit(&mut state, auction_id, BIDDER_B, 200, 200, 1001);

    // Commit phase hides the amounts: nothing revealed yet
    assert!(state.get_auction_bids(auction_id).iter().all(|b| !b.revealed));

    // ========================================
    // Phase 3: Reveals after the bidding deadline
    // ========================================

    reveal(&mut state, auction_id, BIDDER_A, 150, secret_a, 3700);
    assert_eq!(
        select_winner(&collect_bids(&state, auction_id)).unwrap().bidder,
        BIDDER_A
    );

    reveal(&mut state, auction_id, BIDDER_B, 200, secret_b, 3800);
    assert_eq!(
        select_winner(&collect_bids(&state, auction_id)).unwrap().bidder,
        BIDDER_B
    );

    // ========================================
    // Phase 4: Keeper-triggered settlement
    // ========================================

    assert_eq!(check_expired(&state, 4200), Some(auction_id));

    let record = handle_perform_expiry(&mut state, &mut registry, &ctx(KEEPER, 4200, 0), auction_id)
        .unwrap()
        .unwrap();

    assert_eq!(record.winner, Some(BIDDER_B));
    assert_eq!(record.winning_amount, 200);

    // Asset to the winner, funds to the seller, refund to the loser
    assert_eq!(registry.owner_of(&asset).unwrap(), BIDDER_B);
    assert_eq!(state.proceeds.balance(&SELLER), 200);
    assert_eq!(state.proceeds.balance(&BIDDER_A), 150);
    assert_eq!(state.escrow.balance(&BIDDER_A), 0);
    assert_eq!(state.escrow.balance(&BIDDER_B), 0);

    // ========================================
    // Phase 5: Terminal state rejects further calls
    // ========================================

    let late_commitment = compute_bid_commitment(300, &Secret([9u8; 32]));
    assert!(matches!(
        handle_commit_bid(&mut state, &ctx([9u8; 32], 4300, 300), auction_id, late_commitment),
        Err(AuctionError::AuctionNotActive)
    ));
    assert!(matches!(
        handle_reveal_bid(
            &mut state,
            &StructuralVerifier,
            &ctx(BIDDER_A, 4300, 0),
            auction_id,
            150,
            Secret([BIDDER_A[0]; 32]),
            None,
        ),
        Err(AuctionError::AuctionNotActive)
    ));

    // ========================================
    // Phase 6: Withdrawals
    // ========================================

    assert_eq!(handle_withdraw(&mut state, &ctx(SELLER, 4400, 0)).unwrap(), 200);
    assert_eq!(handle_withdraw(&mut state, &ctx(BIDDER_A, 4400, 0)).unwrap(), 150);
    assert!(matches!(
        handle_withdraw(&mut state, &ctx(BIDDER_B, 4400, 0)),
        Err(AuctionError::NothingToWithdraw)
    ));
}

fn collect_bids(state: &AuctionState, auction_id: u64) -> Vec<Bid> {
    state
        .get_auction_bids(auction_id)
        .into_iter()
        .cloned()
        .collect()
}

/// Client-prepared commitments bind exactly: any other (amount, secret) pair
/// fails the reveal.
#[test]
fn test_commitment_binding_end_to_end() {
    let (mut state, mut registry, asset) = primary_domain();
    let auction_id = handle_create_auction(
        &mut state,
        &mut registry,
        &ctx(SELLER, 0, 0),
        asset,
        1000,
        500,
        1,
    )
    .unwrap();

    let prepared = prepare_bid(150, &mut OsRng).unwrap();
    handle_commit_bid(
        &mut state,
        &ctx(BIDDER_A, 100, 150),
        auction_id,
        prepared.commitment,
    )
    .unwrap();

    // Wrong amount, right secret
    assert!(matches!(
        handle_reveal_bid(
            &mut state,
            &StructuralVerifier,
            &ctx(BIDDER_A, 1100, 0),
            auction_id,
            151,
            prepared.secret,
            None,
        ),
        Err(AuctionError::CommitmentMismatch)
    ));

    // Right amount, wrong secret
    assert!(matches!(
        handle_reveal_bid(
            &mut state,
            &StructuralVerifier,
            &ctx(BIDDER_A, 1100, 0),
            auction_id,
            150,
            Secret([0u8; 32]),
            None,
        ),
        Err(AuctionError::CommitmentMismatch)
    ));

    // The genuine opening succeeds
    handle_reveal_bid(
        &mut state,
        &StructuralVerifier,
        &ctx(BIDDER_A, 1100, 0),
        auction_id,
        prepared.amount,
        prepared.secret,
        None,
    )
    .unwrap();
}

/// Equal amounts settle to the earlier reveal timestamp, whatever order the
/// reveal calls arrive in.
#[test]
fn test_tie_break_deterministic_across_call_orders() {
    let run = |first_revealer: Address, second_revealer: Address| -> Address {
        let (mut state, mut registry, asset) = primary_domain();
        let auction_id = handle_create_auction(
            &mut state,
            &mut registry,
            &ctx(SELLER, 0, 0),
            asset,
            1000,
            1000,
            1,
        )
        .unwrap();

        let secret_a = commit(&mut state, auction_id, BIDDER_A, 200, 200, 100);
        let secret_b = commit(&mut state, auction_id, BIDDER_B, 200, 200, 101);

        // A's reveal carries t=1100, B's t=1200, regardless of arrival order
        let mut do_reveal = |bidder: Address| {
            let (secret, at) = if bidder == BIDDER_A {
                (secret_a, 1100)
            } else {
                (secret_b, 1200)
            };
            reveal(&mut state, auction_id, bidder, 200, secret, at);
        };
        do_reveal(first_revealer);
        do_reveal(second_revealer);

        let record =
            handle_perform_expiry(&mut state, &mut registry, &ctx(KEEPER, 2500, 0), auction_id)
                .unwrap()
                .unwrap();
        record.winner.unwrap()
    };

    // Earlier reveal timestamp wins in both arrival orders
    assert_eq!(run(BIDDER_A, BIDDER_B), BIDDER_A);
    assert_eq!(run(BIDDER_B, BIDDER_A), BIDDER_A);
}

/// Expiring an auction nobody bid on returns the asset and moves no funds.
#[test]
fn test_zero_bid_auction_returns_asset() {
    let (mut state, mut registry, asset) = primary_domain();
    let auction_id = handle_create_auction(
        &mut state,
        &mut registry,
        &ctx(SELLER, 0, 0),
        asset,
        1000,
        500,
        100,
    )
    .unwrap();

    let record = handle_perform_expiry(&mut state, &mut registry, &ctx(KEEPER, 2000, 0), auction_id)
        .unwrap()
        .unwrap();

    assert_eq!(record.winner, None);
    assert_eq!(registry.owner_of(&asset).unwrap(), SELLER);
    assert_eq!(state.proceeds.balance(&SELLER), 0);
    // No settlement event: the relay has nothing to process
    assert!(state.events.is_empty());
}

/// The relay watcher independently re-executes the primary settlement in its
/// own domain, once, however often the event is redelivered.
#[test]
fn test_relay_mirrors_primary_settlement() {
    // ========================================
    // Phase 1: Primary-domain settlement
    // ========================================

    let (mut state, mut registry, asset) = primary_domain();
    let auction_id = handle_create_auction(
        &mut state,
        &mut registry,
        &ctx(SELLER, 0, 0),
        asset,
        1000,
        500,
        100,
    )
    .unwrap();

    let secret_a = commit(&mut state, auction_id, BIDDER_A, 150, 150, 100);
    let secret_b = commit(&mut state, auction_id, BIDDER_B, 200, 250, 101);
    reveal(&mut state, auction_id, BIDDER_A, 150, secret_a, 1100);
    reveal(&mut state, auction_id, BIDDER_B, 200, secret_b, 1200);

    handle_perform_expiry(&mut state, &mut registry, &ctx(KEEPER, 2000, 0), auction_id).unwrap();

    assert_eq!(state.events.len(), 1);
    let event: SettlementEvent = state.events[0].1.clone();

    // ========================================
    // Phase 2: Watcher domain, fed the decoded event
    // ========================================

    let mut watcher_registry = InMemoryAssetRegistry::new([0x22u8; 32]);
    let mirrored_asset = watcher_registry.mint(asset.token_id, VAULT);
    let mut watcher = RelayWatcher::new(
        Subscription {
            origin_domain: 1,
            source: HOUSE,
        },
        VAULT,
        watcher_registry,
    );
    watcher.fund_vault(1_000);

    // The watcher's domain holds its own copy of the asset under a
    // different registry; re-key the event to the local asset reference.
    let mut local_event = event.clone();
    local_event.asset = mirrored_asset;

    let envelope = EventEnvelope {
        origin_domain: 1,
        source: HOUSE,
        payload: local_event.encode(),
    };

    assert_eq!(watcher.process_event(&envelope).unwrap(), Outcome::Applied);

    // Same disbursement as the primary domain
    assert_eq!(watcher.registry().owner_of(&mirrored_asset).unwrap(), BIDDER_B);
    assert_eq!(watcher.balance(&SELLER), 200);
    assert_eq!(watcher.balance(&BIDDER_A), 150);
    assert_eq!(watcher.balance(&BIDDER_B), 50);

    // The watcher's audit path recomputes the same winner from the event
    let bids = collect_bids(&state, auction_id);
    let recomputed = select_winner(&bids).unwrap();
    assert_eq!(recomputed.bidder, event.winner);
    assert_eq!(recomputed.amount, event.winning_amount);

    // ========================================
    // Phase 3: At-least-once redelivery is absorbed
    // ========================================

    let snapshot = watcher.get_info(auction_id).cloned().unwrap();
    assert_eq!(watcher.process_event(&envelope).unwrap(), Outcome::Duplicate);
    assert_eq!(watcher.get_info(auction_id), Some(&snapshot));
    assert_eq!(watcher.balance(&SELLER), 200);
    assert_eq!(watcher.applied_count(), 1);
}

/// A local in-process chain the keeper service can drive.
struct LocalChain {
    inner: Arc<Mutex<(AuctionState, InMemoryAssetRegistry, u64)>>,
}

#[async_trait]
impl ExpiryEndpoint for LocalChain {
    async fn check_expired(&self) -> anyhow::Result<Option<u64>> {
        let guard = self.inner.lock().unwrap();
        let (state, _, now) = &*guard;
        Ok(check_expired(state, *now))
    }

    async fn perform_expiry(&self, auction_id: u64) -> anyhow::Result<bool> {
        let mut guard = self.inner.lock().unwrap();
        let (state, registry, now) = &mut *guard;
        let record = handle_perform_expiry(state, registry, &ctx(KEEPER, *now, 0), auction_id)?;
        Ok(record.is_some())
    }
}

/// The keeper notices an expired auction, settles it, and tolerates its own
/// redundant next cycle.
#[tokio::test]
async fn test_keeper_drives_settlement() {
    let (mut state, mut registry, asset) = primary_domain();
    let auction_id = handle_create_auction(
        &mut state,
        &mut registry,
        &ctx(SELLER, 0, 0),
        asset,
        1000,
        500,
        100,
    )
    .unwrap();
    let secret = commit(&mut state, auction_id, BIDDER_A, 150, 150, 100);
    reveal(&mut state, auction_id, BIDDER_A, 150, secret, 1100);

    let chain = Arc::new(Mutex::new((state, registry, 900u64)));
    let service = KeeperService::new(
        LocalChain {
            inner: chain.clone(),
        },
        10,
    );

    // Nothing expired yet
    assert_eq!(service.run_once().await.unwrap(), None);

    // Past the reveal deadline the keeper settles it
    chain.lock().unwrap().2 = 2000;
    assert_eq!(service.run_once().await.unwrap(), Some(auction_id));

    {
        let guard = chain.lock().unwrap();
        let (state, registry, _) = &*guard;
        assert_eq!(state.get_auction(auction_id).unwrap().state, LifecycleState::Ended);
        assert_eq!(
            registry
                .owner_of(&state.get_auction(auction_id).unwrap().asset)
                .unwrap(),
            BIDDER_A
        );
    }

    // The next cycle finds nothing to do
    assert_eq!(service.run_once().await.unwrap(), None);
}

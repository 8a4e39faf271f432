//! Relay polling service.
//!
//! Pulls settlement-event records from the source domain's feed endpoint and
//! drives the watcher. The cursor advances only past events that reached a
//! terminal outcome, so transient failures are retried on the next poll and
//! the at-least-once channel contract holds end to end.

use std::time::Duration;

use anyhow::{anyhow, Result};
use gavel_registry::AssetRegistry;
use jsonrpsee::core::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{EventEnvelope, Outcome, RelayError, RelayWatcher};

/// Configuration for the relay service.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// RPC endpoint of the source-domain event feed
    pub rpc_endpoint: String,
    /// Source domain identifier to accept events from
    pub origin_domain: u64,
    /// Emitting address to accept events from (hex)
    pub source: String,
    /// Polling interval in seconds
    pub poll_interval_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: "http://127.0.0.1:9944".to_string(),
            origin_domain: 1,
            source: hex::encode([0u8; 32]),
            poll_interval_secs: 5,
        }
    }
}

impl RelayConfig {
    /// The subscription filter this configuration describes.
    pub fn subscription(&self) -> Result<crate::Subscription> {
        let source_bytes =
            hex::decode(&self.source).map_err(|e| anyhow!("invalid source hex: {}", e))?;
        let source: [u8; 32] = source_bytes
            .try_into()
            .map_err(|_| anyhow!("source must be 32 bytes"))?;
        Ok(crate::Subscription {
            origin_domain: self.origin_domain,
            source,
        })
    }

    /// Build the feed client for the configured endpoint.
    pub fn feed(&self) -> Result<RpcSettlementFeed> {
        RpcSettlementFeed::new(&self.rpc_endpoint)
    }
}

/// One record from the feed endpoint: delivery sequence, provenance, and
/// the hex-encoded wire payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRecord {
    pub seq: u64,
    pub origin_domain: u64,
    pub source: String,
    pub payload: String,
}

/// Source of settlement-event records, ordered by sequence number.
#[async_trait]
pub trait SettlementFeed {
    /// Records at or after the given sequence number.
    async fn fetch_events(&self, from_seq: u64) -> Result<Vec<FeedRecord>>;
}

/// Feed backed by the source domain's JSON-RPC endpoint.
pub struct RpcSettlementFeed {
    client: HttpClient,
}

impl RpcSettlementFeed {
    pub fn new(rpc_endpoint: &str) -> Result<Self> {
        let client = HttpClientBuilder::default().build(rpc_endpoint)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl SettlementFeed for RpcSettlementFeed {
    async fn fetch_events(&self, from_seq: u64) -> Result<Vec<FeedRecord>> {
        let records: Vec<FeedRecord> = self
            .client
            .request("relay_getEvents", rpc_params![from_seq])
            .await?;
        Ok(records)
    }
}

/// The relay service: a watcher plus a polled feed and a delivery cursor.
pub struct RelayService<R: AssetRegistry, F: SettlementFeed> {
    watcher: RelayWatcher<R>,
    feed: F,
    cursor: u64,
    poll_interval: Duration,
}

impl<R: AssetRegistry, F: SettlementFeed> RelayService<R, F> {
    pub fn new(watcher: RelayWatcher<R>, feed: F, poll_interval_secs: u64) -> Self {
        Self {
            watcher,
            feed,
            cursor: 0,
            poll_interval: Duration::from_secs(poll_interval_secs),
        }
    }

    /// Drain currently available events once. Returns how many records the
    /// cursor moved past.
    pub async fn run_once(&mut self) -> Result<usize> {
        let records = self.feed.fetch_events(self.cursor).await?;
        let mut processed = 0;

        for record in records {
            let envelope = record_to_envelope(&record)?;
            match self.watcher.process_event(&envelope) {
                Ok(Outcome::Applied) => {
                    info!(seq = record.seq, "Relayed settlement event");
                }
                Ok(Outcome::Duplicate) => {}
                Err(
                    e @ (RelayError::SourceMismatch
                    | RelayError::Decode(_)
                    | RelayError::WinnerDepositShortfall),
                ) => {
                    // Permanently unprocessable: skip past it.
                    warn!(seq = record.seq, error = %e, "Skipping unprocessable event");
                }
                Err(e) => {
                    // Transient (underfunded vault, registry refusal): leave
                    // the cursor so the next poll redelivers.
                    warn!(seq = record.seq, error = %e, "Deferring event");
                    break;
                }
            }
            self.cursor = record.seq + 1;
            processed += 1;
        }

        Ok(processed)
    }

    /// Run the polling loop until the task is cancelled.
    pub async fn start(&mut self) -> Result<()> {
        let mut interval = tokio::time::interval(self.poll_interval);
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Relay service started"
        );
        loop {
            interval.tick().await;
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "Feed poll failed");
            }
        }
    }

    /// Current delivery cursor.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// The underlying watcher.
    pub fn watcher(&self) -> &RelayWatcher<R> {
        &self.watcher
    }
}

fn record_to_envelope(record: &FeedRecord) -> Result<EventEnvelope> {
    let source_bytes = hex::decode(&record.source)
        .map_err(|e| anyhow!("invalid source hex at seq {}: {}", record.seq, e))?;
    let source: [u8; 32] = source_bytes
        .try_into()
        .map_err(|_| anyhow!("source must be 32 bytes at seq {}", record.seq))?;
    let payload = hex::decode(&record.payload)
        .map_err(|e| anyhow!("invalid payload hex at seq {}: {}", record.seq, e))?;

    Ok(EventEnvelope {
        origin_domain: record.origin_domain,
        source,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Subscription;
    use gavel_registry::InMemoryAssetRegistry;
    use gavel_types::{AssetRef, SettlementEvent};
    use std::sync::Mutex;

    const SOURCE: [u8; 32] = [0xCCu8; 32];
    const VAULT: [u8; 32] = [0xDDu8; 32];

    struct StaticFeed {
        records: Mutex<Vec<FeedRecord>>,
    }

    #[async_trait]
    impl SettlementFeed for StaticFeed {
        async fn fetch_events(&self, from_seq: u64) -> Result<Vec<FeedRecord>> {
            Ok(self
                .records
                .lock()
                .unwrap()
                .iter()
                .filter(|r| r.seq >= from_seq)
                .cloned()
                .collect())
        }
    }

    fn record(seq: u64, event: &SettlementEvent) -> FeedRecord {
        FeedRecord {
            seq,
            origin_domain: 1,
            source: hex::encode(SOURCE),
            payload: hex::encode(event.encode()),
        }
    }

    fn sample_event(auction_id: u64, asset: AssetRef) -> SettlementEvent {
        SettlementEvent::new(
            auction_id,
            [1u8; 32],
            asset,
            [2u8; 32],
            200,
            vec![[2u8; 32], [3u8; 32]],
            vec![200, 150],
        )
    }

    fn service(
        funds: u64,
        records: Vec<FeedRecord>,
        registry: InMemoryAssetRegistry,
    ) -> RelayService<InMemoryAssetRegistry, StaticFeed> {
        let subscription = Subscription {
            origin_domain: 1,
            source: SOURCE,
        };
        let mut watcher = RelayWatcher::new(subscription, VAULT, registry);
        watcher.fund_vault(funds);
        RelayService::new(
            watcher,
            StaticFeed {
                records: Mutex::new(records),
            },
            5,
        )
    }

    #[tokio::test]
    async fn test_run_once_processes_and_dedups() {
        let mut registry = InMemoryAssetRegistry::new([9u8; 32]);
        let asset = registry.mint(1, VAULT);
        let event = sample_event(1, asset);

        // The feed redelivers the same settlement twice
        let records = vec![record(0, &event), record(1, &event)];
        let mut service = service(1_000, records, registry);

        assert_eq!(service.run_once().await.unwrap(), 2);
        assert_eq!(service.cursor(), 2);
        assert_eq!(service.watcher().applied_count(), 1);
        assert_eq!(service.watcher().balance(&[1u8; 32]), 200);
    }

    #[tokio::test]
    async fn test_run_once_defers_on_underfunded_vault() {
        let mut registry = InMemoryAssetRegistry::new([9u8; 32]);
        let asset = registry.mint(1, VAULT);
        let event = sample_event(1, asset);

        let mut service = service(10, vec![record(0, &event)], registry);

        // Transient failure: the cursor must not advance
        assert_eq!(service.run_once().await.unwrap(), 0);
        assert_eq!(service.cursor(), 0);
        assert_eq!(service.watcher().applied_count(), 0);
    }

    #[test]
    fn test_relay_config_subscription() {
        let mut config = RelayConfig::default();
        config.source = hex::encode(SOURCE);
        config.origin_domain = 4;

        let sub = config.subscription().unwrap();
        assert_eq!(sub.source, SOURCE);
        assert_eq!(sub.origin_domain, 4);

        config.source = "zz".into();
        assert!(config.subscription().is_err());
    }

    #[tokio::test]
    async fn test_run_once_skips_foreign_events() {
        let mut registry = InMemoryAssetRegistry::new([9u8; 32]);
        let asset = registry.mint(1, VAULT);
        let event = sample_event(1, asset);

        let mut foreign = record(0, &event);
        foreign.origin_domain = 7;
        let records = vec![foreign, record(1, &event)];
        let mut service = service(1_000, records, registry);

        assert_eq!(service.run_once().await.unwrap(), 2);
        assert_eq!(service.watcher().applied_count(), 1);
    }
}

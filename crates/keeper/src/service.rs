//! Keeper service implementation.

use std::time::Duration;

use anyhow::Result;
use jsonrpsee::core::async_trait;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use tracing::{debug, info, warn};

/// Configuration for the keeper service.
#[derive(Debug, Clone)]
pub struct KeeperConfig {
    /// RPC endpoint of the auction host
    pub rpc_endpoint: String,
    /// Polling interval in seconds
    pub poll_interval_secs: u64,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            rpc_endpoint: "http://127.0.0.1:9944".to_string(),
            poll_interval_secs: 10,
        }
    }
}

/// The expiry interface the keeper drives.
///
/// `perform_expiry` returns whether the trigger actually settled the
/// auction; `false` means the module's re-check turned it into a no-op.
#[async_trait]
pub trait ExpiryEndpoint {
    async fn check_expired(&self) -> Result<Option<u64>>;
    async fn perform_expiry(&self, auction_id: u64) -> Result<bool>;
}

/// Expiry endpoint backed by the auction host's JSON-RPC interface.
pub struct RpcExpiryEndpoint {
    client: HttpClient,
}

impl RpcExpiryEndpoint {
    pub fn new(rpc_endpoint: &str) -> Result<Self> {
        let client = HttpClientBuilder::default().build(rpc_endpoint)?;
        Ok(Self { client })
    }
}

impl KeeperService<RpcExpiryEndpoint> {
    /// Build a keeper over the configured RPC endpoint.
    pub fn from_config(config: &KeeperConfig) -> Result<Self> {
        Ok(Self::new(
            RpcExpiryEndpoint::new(&config.rpc_endpoint)?,
            config.poll_interval_secs,
        ))
    }
}

#[async_trait]
impl ExpiryEndpoint for RpcExpiryEndpoint {
    async fn check_expired(&self) -> Result<Option<u64>> {
        let expired: Option<u64> = self
            .client
            .request("keeper_checkExpired", rpc_params![])
            .await?;
        Ok(expired)
    }

    async fn perform_expiry(&self, auction_id: u64) -> Result<bool> {
        let settled: bool = self
            .client
            .request("keeper_performExpiry", rpc_params![auction_id])
            .await?;
        Ok(settled)
    }
}

/// The keeper service.
pub struct KeeperService<E: ExpiryEndpoint> {
    endpoint: E,
    poll_interval: Duration,
}

impl<E: ExpiryEndpoint> KeeperService<E> {
    /// Create a new keeper service over an expiry endpoint.
    pub fn new(endpoint: E, poll_interval_secs: u64) -> Self {
        Self {
            endpoint,
            poll_interval: Duration::from_secs(poll_interval_secs),
        }
    }

    /// One keeper cycle: scan, and settle the first expired auction if any.
    ///
    /// Returns the settled auction id. A no-op trigger (another keeper got
    /// there first, or the deadline receded from our stale view) returns
    /// `None` without error.
    pub async fn run_once(&self) -> Result<Option<u64>> {
        let Some(auction_id) = self.endpoint.check_expired().await? else {
            return Ok(None);
        };

        if self.endpoint.perform_expiry(auction_id).await? {
            info!(auction_id, "Settled expired auction");
            Ok(Some(auction_id))
        } else {
            debug!(auction_id, "Expiry trigger was a no-op");
            Ok(None)
        }
    }

    /// Run the polling loop until the task is cancelled.
    pub async fn start(&self) -> Result<()> {
        let mut interval = tokio::time::interval(self.poll_interval);
        info!(
            poll_interval_secs = self.poll_interval.as_secs(),
            "Keeper service started"
        );
        loop {
            interval.tick().await;
            if let Err(e) = self.run_once().await {
                warn!(error = %e, "Keeper cycle failed");
            }
        }
    }
}

// src/gas/snapshot.rs
//! Per-network gas snapshot cache with background refresh.
//!
//! Reads are non-blocking and tolerate momentarily stale data. A failed
//! refresh degrades to last-known-good, then to the synthetic fallback,
//! never to a missing entry a concurrent route computation could trip on.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::provider::{GasDataProvider, SyntheticGasProvider};
use crate::types::Network;

/// Point-in-time view of a network's fee market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkGasSnapshot {
    pub network: Network,
    pub block_height: u64,
    /// Zero on networks without fee-market (EIP-1559 style) pricing.
    pub base_fee_gwei: f64,
    /// Priority tip under fee-market pricing; the whole gas price under the
    /// legacy single-price model.
    pub priority_fee_gwei: f64,
    /// Normalized demand measure, 0-100.
    pub congestion: f64,
    /// Share of recent block capacity used, 0-100.
    pub utilization: f64,
    pub block_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

impl NetworkGasSnapshot {
    /// Fee-market pricing applies when the network reports a base fee.
    pub fn is_fee_market(&self) -> bool {
        self.base_fee_gwei > 0.0
    }
}

/// Concurrent snapshot store. One background refresh task writes; routing
/// requests read snapshots without blocking.
pub struct GasSnapshotStore {
    snapshots: DashMap<Network, NetworkGasSnapshot>,
    providers: Vec<Arc<dyn GasDataProvider>>,
    per_source_timeout: Duration,
}

impl GasSnapshotStore {
    pub fn new(providers: Vec<Arc<dyn GasDataProvider>>, per_source_timeout: Duration) -> Self {
        Self {
            snapshots: DashMap::new(),
            providers,
            per_source_timeout,
        }
    }

    /// Store with no live sources; every read serves the synthetic
    /// baseline until snapshots are injected. Used by tests.
    pub fn without_providers() -> Self {
        Self::new(Vec::new(), Duration::from_secs(10))
    }

    /// Inject a snapshot directly (tests, or a collaborator that already
    /// holds fresh data).
    pub fn insert(&self, snapshot: NetworkGasSnapshot) {
        self.snapshots.insert(snapshot.network, snapshot);
    }

    /// Current snapshot for a network. Never absent: degrades to the
    /// deterministic synthetic baseline when nothing has been fetched yet.
    pub fn get(&self, network: Network) -> NetworkGasSnapshot {
        match self.snapshots.get(&network) {
            Some(snap) => snap.clone(),
            None => SyntheticGasProvider::baseline(network),
        }
    }

    pub fn has_live_snapshot(&self, network: Network) -> bool {
        self.snapshots.contains_key(&network)
    }

    /// Refresh one network: ordered multi-source fetch, first success wins,
    /// each source bounded by the per-source timeout. Total failure keeps
    /// the last-known-good snapshot, or installs the synthetic baseline if
    /// the store has never seen this network.
    pub async fn refresh_network(&self, network: Network) {
        for provider in &self.providers {
            let attempt = tokio::time::timeout(self.per_source_timeout, provider.fetch(network));
            match attempt.await {
                Ok(Ok(snapshot)) => {
                    debug!(
                        "gas refresh for {} served by {} (congestion {:.0})",
                        network,
                        provider.name(),
                        snapshot.congestion
                    );
                    self.snapshots.insert(network, snapshot);
                    return;
                }
                Ok(Err(e)) => {
                    warn!("gas provider {} failed for {}: {e}", provider.name(), network);
                }
                Err(_) => {
                    warn!(
                        "gas provider {} timed out for {} after {:?}",
                        provider.name(),
                        network,
                        self.per_source_timeout
                    );
                }
            }
        }

        if !self.snapshots.contains_key(&network) {
            warn!(
                "all gas sources failed for {} with no prior snapshot, installing synthetic baseline",
                network
            );
            self.snapshots
                .insert(network, SyntheticGasProvider::baseline(network));
        } else {
            debug!("all gas sources failed for {}, serving last known good", network);
        }
    }

    /// Best-effort fan-out refresh: one network's failure never blocks the
    /// others.
    pub async fn refresh_all(&self, networks: &[Network]) {
        join_all(networks.iter().map(|n| self.refresh_network(*n))).await;
    }

    /// Spawn the fixed-interval background refresh across all supported
    /// networks.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                store.refresh_all(Network::all()).await;
            }
        })
    }
}

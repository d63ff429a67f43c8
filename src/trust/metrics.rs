// src/trust/metrics.rs
//! Per-(venue, network) metrics state backing the trust model.
//!
//! The store is process-local working state: entries are only ever updated
//! in place by the periodic refresh task and by user-feedback ingestion,
//! never deleted. Unknown venues read as a conservative default profile.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{Network, Venue};

/// Operational health of a venue on one network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalMetrics {
    pub uptime_pct: f64,
    pub avg_response_ms: f64,
    pub success_rate_pct: f64,
    pub api_reliability_pct: f64,
    pub liquidity_depth_usd: f64,
    pub volume_24h_usd: f64,
    pub tvl_usd: f64,
}

/// Security posture of a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityMetrics {
    /// Aggregate audit quality, 0-100.
    pub audit_score: f64,
    pub has_bug_bounty: bool,
    pub months_operating: u32,
    pub incident_count: u32,
    /// Days since the most recent incident, if any.
    pub last_incident_days_ago: Option<u32>,
    pub insurance_coverage_usd: f64,
}

/// Fee schedule summary used by the cost sub-score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeMetrics {
    pub avg_protocol_fee_bps: f64,
    pub avg_lp_fee_bps: f64,
    /// Relative gas efficiency of the venue's contracts, 0-100.
    pub gas_efficiency: f64,
}

/// User-experience quality, 0-100 each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UxMetrics {
    pub interface_score: f64,
    pub documentation_score: f64,
    pub support_score: f64,
}

/// Full metrics record for one (venue, network) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueMetrics {
    pub venue: String,
    pub network: Network,
    pub operational: OperationalMetrics,
    pub security: SecurityMetrics,
    pub fees: FeeMetrics,
    pub ux: UxMetrics,
    pub updated_at: DateTime<Utc>,
}

impl VenueMetrics {
    /// Profile served for venues the store has never seen. Deliberately
    /// pessimistic: it produces the documented composite score of 30 and a
    /// very-high risk tier instead of failing the whole ranking.
    pub fn conservative_default(venue: &Venue, network: Network) -> Self {
        Self {
            venue: venue.trust_key(),
            network,
            operational: OperationalMetrics {
                uptime_pct: 50.0,
                avg_response_ms: 2_000.0,
                success_rate_pct: 50.0,
                api_reliability_pct: 50.0,
                liquidity_depth_usd: 10_000.0,
                volume_24h_usd: 1_000.0,
                tvl_usd: 10_000.0,
            },
            security: SecurityMetrics {
                audit_score: 20.0,
                has_bug_bounty: false,
                months_operating: 1,
                incident_count: 0,
                last_incident_days_ago: None,
                insurance_coverage_usd: 0.0,
            },
            fees: FeeMetrics {
                avg_protocol_fee_bps: 30.0,
                avg_lp_fee_bps: 30.0,
                gas_efficiency: 30.0,
            },
            ux: UxMetrics {
                interface_score: 30.0,
                documentation_score: 30.0,
                support_score: 30.0,
            },
            updated_at: Utc::now(),
        }
    }
}

/// User-reported execution outcome fed back into the metrics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackOutcome {
    pub successful: bool,
    /// Realized slippage as a fraction.
    pub actual_slippage: f64,
    /// User rating, 0-5.
    pub rating: f64,
    pub execution_ms: Option<u64>,
}

/// Feed supplying refreshed venue metrics. In production this is backed by
/// the monitoring pipeline; tests and degraded mode use fixed fixtures.
#[async_trait]
pub trait MetricsFeed: Send + Sync {
    async fn fetch_metrics(&self) -> anyhow::Result<Vec<VenueMetrics>>;
}

/// A feed that replays a fixed snapshot set. Doubles as the deterministic
/// fixture source for tests and the degraded-mode fallback.
pub struct StaticMetricsFeed {
    snapshots: Vec<VenueMetrics>,
}

impl StaticMetricsFeed {
    pub fn new(snapshots: Vec<VenueMetrics>) -> Self {
        Self { snapshots }
    }
}

#[async_trait]
impl MetricsFeed for StaticMetricsFeed {
    async fn fetch_metrics(&self) -> anyhow::Result<Vec<VenueMetrics>> {
        Ok(self.snapshots.clone())
    }
}

type VenueKey = (String, Network);

/// Concurrent metrics store with a rolling composite-score history used by
/// the trend computation.
pub struct MetricsStore {
    entries: DashMap<VenueKey, VenueMetrics>,
    score_history: DashMap<VenueKey, VecDeque<f64>>,
    history_window: usize,
    feedback_decay: f64,
}

impl MetricsStore {
    pub fn new(history_window: usize, feedback_decay: f64) -> Self {
        Self {
            entries: DashMap::new(),
            score_history: DashMap::new(),
            history_window,
            feedback_decay: feedback_decay.clamp(0.0, 1.0),
        }
    }

    pub fn upsert(&self, metrics: VenueMetrics) {
        let key = (metrics.venue.clone(), metrics.network);
        debug!("metrics upsert for {} on {}", key.0, key.1);
        self.entries.insert(key, metrics);
    }

    /// Snapshot read; falls back to the conservative default for venues we
    /// have no record of. Never blocks on a refresh in flight.
    pub fn get(&self, venue: &Venue, network: Network) -> VenueMetrics {
        let key = (venue.trust_key(), network);
        match self.entries.get(&key) {
            Some(entry) => entry.clone(),
            None => VenueMetrics::conservative_default(venue, network),
        }
    }

    pub fn contains(&self, venue: &Venue, network: Network) -> bool {
        self.entries.contains_key(&(venue.trust_key(), network))
    }

    /// All (venue, network) keys tracked on a given network.
    pub fn venues_on(&self, network: Network) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| e.key().1 == network)
            .map(|e| e.key().0.clone())
            .collect()
    }

    /// Record one composite score snapshot for the trend window.
    pub fn push_score(&self, venue: &Venue, network: Network, score: f64) {
        let key = (venue.trust_key(), network);
        let mut history = self.score_history.entry(key).or_default();
        history.push_back(score);
        while history.len() > self.history_window {
            history.pop_front();
        }
    }

    pub fn score_history(&self, venue: &Venue, network: Network) -> Vec<f64> {
        self.score_history
            .get(&(venue.trust_key(), network))
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Blend a user-reported outcome into stored metrics. The decay factor
    /// bounds how far a single report can move any field.
    pub fn ingest_feedback(&self, venue: &Venue, network: Network, outcome: &FeedbackOutcome) {
        let key = (venue.trust_key(), network);
        let decay = self.feedback_decay;
        let mut entry = self
            .entries
            .entry(key)
            .or_insert_with(|| VenueMetrics::conservative_default(venue, network));

        let reported_success = if outcome.successful { 100.0 } else { 0.0 };
        entry.operational.success_rate_pct =
            entry.operational.success_rate_pct * (1.0 - decay) + reported_success * decay;

        let rating_pct = (outcome.rating.clamp(0.0, 5.0) / 5.0) * 100.0;
        entry.ux.interface_score = entry.ux.interface_score * (1.0 - decay) + rating_pct * decay;
        entry.ux.support_score = entry.ux.support_score * (1.0 - decay) + rating_pct * decay;

        if let Some(ms) = outcome.execution_ms {
            entry.operational.avg_response_ms =
                entry.operational.avg_response_ms * (1.0 - decay) + ms as f64 * decay;
        }

        entry.updated_at = Utc::now();
        debug!(
            "feedback ingested for {} on {}: success={}, rating={:.1}",
            venue, network, outcome.successful, outcome.rating
        );
    }

    /// Spawn the periodic refresh task. A failed fetch keeps last-known-good
    /// entries and retries on the next tick; it never leaves a venue in a
    /// missing state observable by readers.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        feed: Arc<dyn MetricsFeed>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match feed.fetch_metrics().await {
                    Ok(batch) => {
                        let count = batch.len();
                        for metrics in batch {
                            store.upsert(metrics);
                        }
                        debug!("venue metrics refresh applied {} records", count);
                    }
                    Err(e) => {
                        warn!("venue metrics refresh failed, keeping last known good: {e}");
                    }
                }
            }
        })
    }
}

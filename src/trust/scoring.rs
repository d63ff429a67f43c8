// src/trust/scoring.rs
//! Composite trust scoring, venue ranking and per-trade risk assessment.
//!
//! Scores are derived on every query from current `VenueMetrics` plus the
//! rolling score history; nothing here is persisted.

use log::debug;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::metrics::{FeedbackOutcome, MetricsStore, VenueMetrics};
use crate::types::{Network, Venue};

/// Fixed composite returned for venues absent from the metrics store.
pub const UNKNOWN_VENUE_SCORE: f64 = 30.0;

const WEIGHT_RELIABILITY: f64 = 0.25;
const WEIGHT_SECURITY: f64 = 0.25;
const WEIGHT_LIQUIDITY: f64 = 0.20;
const WEIGHT_COST: f64 = 0.15;
const WEIGHT_UX: f64 = 0.15;

/// Days within which a past incident still counts against a trade.
const INCIDENT_RECENCY_DAYS: u32 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
    VeryHigh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustBreakdown {
    pub reliability: f64,
    pub security: f64,
    pub liquidity: f64,
    pub cost: f64,
    pub ux: f64,
}

/// Derived trust rating for one (venue, network) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustScore {
    pub venue: String,
    pub network: Network,
    /// Composite 0-100.
    pub composite: f64,
    pub breakdown: TrustBreakdown,
    pub trend: ScoreTrend,
    pub risk_tier: RiskTier,
    pub recommendations: Vec<String>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DexRanking {
    pub rank: usize,
    pub venue: String,
    pub composite: f64,
    pub risk_tier: RiskTier,
    pub liquidity_depth_usd: f64,
}

/// Filters for `rank`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankFilters {
    pub min_score: Option<f64>,
    pub min_liquidity_usd: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeRecommendation {
    Proceed,
    Caution,
    Avoid,
}

/// Risk picture for a specific trade against a specific venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub venue: String,
    pub network: Network,
    pub risks: Vec<String>,
    /// 0-100, higher is riskier.
    pub risk_score: f64,
    pub recommendation: TradeRecommendation,
}

/// The trust model. Reads the metrics store, never mutates it except
/// through feedback ingestion and trend snapshots.
pub struct TrustModel {
    store: Arc<MetricsStore>,
}

impl TrustModel {
    pub fn new(store: Arc<MetricsStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<MetricsStore> {
        &self.store
    }

    /// Derive the trust score for a venue. Venues absent from the store get
    /// the fixed low-trust default rather than an error. Read-only: routing
    /// calls this per request and must not touch shared state.
    pub fn score(&self, venue: &Venue, network: Network) -> TrustScore {
        if !self.store.contains(venue, network) {
            return self.unknown_venue_score(venue, network);
        }

        let metrics = self.store.get(venue, network);
        let breakdown = TrustBreakdown {
            reliability: reliability_score(&metrics),
            security: security_score(&metrics),
            liquidity: liquidity_score(&metrics),
            cost: cost_score(&metrics),
            ux: ux_score(&metrics),
        };
        let composite = (breakdown.reliability * WEIGHT_RELIABILITY
            + breakdown.security * WEIGHT_SECURITY
            + breakdown.liquidity * WEIGHT_LIQUIDITY
            + breakdown.cost * WEIGHT_COST
            + breakdown.ux * WEIGHT_UX)
            .clamp(0.0, 100.0);

        let trend = trend_from_history(&self.store.score_history(venue, network));

        let (recommendations, warnings) = advice_for(&metrics, &breakdown, composite);

        debug!(
            "trust score for {} on {}: {:.1} ({:?})",
            venue, network, composite, trend
        );

        TrustScore {
            venue: venue.trust_key(),
            network,
            composite,
            breakdown,
            trend,
            risk_tier: tier_for(composite),
            recommendations,
            warnings,
        }
    }

    fn unknown_venue_score(&self, venue: &Venue, network: Network) -> TrustScore {
        TrustScore {
            venue: venue.trust_key(),
            network,
            composite: UNKNOWN_VENUE_SCORE,
            breakdown: TrustBreakdown {
                reliability: UNKNOWN_VENUE_SCORE,
                security: UNKNOWN_VENUE_SCORE,
                liquidity: UNKNOWN_VENUE_SCORE,
                cost: UNKNOWN_VENUE_SCORE,
                ux: UNKNOWN_VENUE_SCORE,
            },
            trend: ScoreTrend::Stable,
            risk_tier: RiskTier::VeryHigh,
            recommendations: vec!["Venue has no tracked metrics; use minimal size".to_string()],
            warnings: vec!["Unknown venue, conservative default applied".to_string()],
        }
    }

    /// Rank every tracked venue on a network, best first.
    pub fn rank(&self, network: Network, filters: &RankFilters) -> Vec<DexRanking> {
        let mut scored: Vec<(String, f64, RiskTier, f64)> = self
            .store
            .venues_on(network)
            .into_iter()
            .map(|key| {
                let venue = venue_from_key(&key);
                let score = self.score(&venue, network);
                let depth = self.store.get(&venue, network).operational.liquidity_depth_usd;
                (key, score.composite, score.risk_tier, depth)
            })
            .filter(|(_, composite, _, depth)| {
                filters.min_score.map_or(true, |m| *composite >= m)
                    && filters.min_liquidity_usd.map_or(true, |m| *depth >= m)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .enumerate()
            .map(|(i, (venue, composite, risk_tier, depth))| DexRanking {
                rank: i + 1,
                venue,
                composite,
                risk_tier,
                liquidity_depth_usd: depth,
            })
            .collect()
    }

    /// Assess the risk of executing a trade of `trade_size_usd` on a venue.
    pub fn assess_risk(
        &self,
        venue: &Venue,
        network: Network,
        trade_size_usd: f64,
    ) -> RiskAssessment {
        let metrics = self.store.get(venue, network);
        let score = self.score(venue, network);

        let mut risks = Vec::new();
        // Base risk is the inverse of composite trust.
        let mut risk_score = (100.0 - score.composite) * 0.5;

        let depth = metrics.operational.liquidity_depth_usd.max(1.0);
        let size_ratio = trade_size_usd / depth;
        if size_ratio > 0.30 {
            risks.push(format!(
                "Trade is {:.0}% of available liquidity (critical, >30%)",
                size_ratio * 100.0
            ));
            risk_score += 40.0;
        } else if size_ratio > 0.10 {
            risks.push(format!(
                "Trade is {:.0}% of available liquidity (>10%)",
                size_ratio * 100.0
            ));
            risk_score += 20.0;
        }

        if metrics.security.audit_score < 50.0 {
            risks.push("Audit score below 50".to_string());
            risk_score += 25.0;
        } else if metrics.security.audit_score < 70.0 {
            risks.push("Audit score below 70".to_string());
            risk_score += 10.0;
        }

        if let Some(days) = metrics.security.last_incident_days_ago {
            if days <= INCIDENT_RECENCY_DAYS {
                risks.push(format!("Security incident {} days ago", days));
                risk_score += 20.0;
            }
        }

        let risk_score = risk_score.clamp(0.0, 100.0);
        let recommendation = if risk_score > 70.0 {
            TradeRecommendation::Avoid
        } else if risk_score > 40.0 {
            TradeRecommendation::Caution
        } else {
            TradeRecommendation::Proceed
        };

        RiskAssessment {
            venue: venue.trust_key(),
            network,
            risks,
            risk_score,
            recommendation,
        }
    }

    pub fn ingest_feedback(&self, venue: &Venue, network: Network, outcome: &FeedbackOutcome) {
        self.store.ingest_feedback(venue, network, outcome);
    }

    /// Record one composite snapshot per tracked venue on a network. Called
    /// on a fixed cadence so the trend window measures time, not query
    /// frequency.
    pub fn snapshot_scores(&self, network: Network) {
        for key in self.store.venues_on(network) {
            let venue = venue_from_key(&key);
            let composite = self.score(&venue, network).composite;
            self.store.push_score(&venue, network, composite);
        }
    }

    /// Spawn the periodic trend-snapshot task across all supported networks.
    pub fn spawn_score_snapshots(
        self: &Arc<Self>,
        interval: Duration,
    ) -> tokio::task::JoinHandle<()> {
        let model = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                for network in Network::all() {
                    model.snapshot_scores(*network);
                }
            }
        })
    }
}

fn venue_from_key(key: &str) -> Venue {
    match key {
        "uniswap_v2" => Venue::UniswapV2,
        "uniswap_v3" => Venue::UniswapV3,
        "sushiswap" => Venue::SushiSwap,
        "curve" => Venue::Curve,
        "balancer" => Venue::Balancer,
        "pancakeswap" => Venue::PancakeSwap,
        other => Venue::Unknown(other.trim_start_matches("unknown:").to_string()),
    }
}

/// Mean of uptime, a response-time decay score, success rate and API
/// reliability.
fn reliability_score(m: &VenueMetrics) -> f64 {
    let response_score = 100.0 * (-m.operational.avg_response_ms / 800.0).exp();
    let parts = [
        m.operational.uptime_pct,
        response_score,
        m.operational.success_rate_pct,
        m.operational.api_reliability_pct,
    ];
    (parts.iter().sum::<f64>() / parts.len() as f64).clamp(0.0, 100.0)
}

/// Audit quality 40%, bug bounty 15%, longevity 25%, incident record 20%,
/// plus a small insurance bonus.
fn security_score(m: &VenueMetrics) -> f64 {
    let bounty = if m.security.has_bug_bounty { 100.0 } else { 0.0 };
    let longevity = ((m.security.months_operating as f64 / 36.0) * 100.0).min(100.0);
    let incident_record = (100.0 - 25.0 * m.security.incident_count as f64).max(0.0);
    let insurance_bonus = if m.security.insurance_coverage_usd > 1_000_000.0 { 5.0 } else { 0.0 };

    (m.security.audit_score * 0.40
        + bounty * 0.15
        + longevity * 0.25
        + incident_record * 0.20
        + insurance_bonus)
        .clamp(0.0, 100.0)
}

/// Log-scaled depth, volume and TVL. $1B depth saturates the scale.
fn liquidity_score(m: &VenueMetrics) -> f64 {
    let log_score = |usd: f64| -> f64 {
        if usd <= 1.0 {
            return 0.0;
        }
        (usd.log10() / 9.0 * 100.0).min(100.0)
    };
    let parts = [
        log_score(m.operational.liquidity_depth_usd),
        log_score(m.operational.volume_24h_usd),
        log_score(m.operational.tvl_usd),
    ];
    (parts.iter().sum::<f64>() / parts.len() as f64).clamp(0.0, 100.0)
}

/// Lower total fees and better gas efficiency score higher. 100 bps of
/// combined fees zeroes the fee component.
fn cost_score(m: &VenueMetrics) -> f64 {
    let total_bps = m.fees.avg_protocol_fee_bps + m.fees.avg_lp_fee_bps;
    let fee_score = (100.0 - total_bps).max(0.0);
    (fee_score * 0.6 + m.fees.gas_efficiency * 0.4).clamp(0.0, 100.0)
}

fn ux_score(m: &VenueMetrics) -> f64 {
    let parts = [
        m.ux.interface_score,
        m.ux.documentation_score,
        m.ux.support_score,
    ];
    (parts.iter().sum::<f64>() / parts.len() as f64).clamp(0.0, 100.0)
}

fn tier_for(composite: f64) -> RiskTier {
    if composite >= 85.0 {
        RiskTier::Low
    } else if composite >= 70.0 {
        RiskTier::Medium
    } else if composite >= 50.0 {
        RiskTier::High
    } else {
        RiskTier::VeryHigh
    }
}

/// Compare the newest third of the window against the oldest third, with a
/// dead band so noise reads as stable.
fn trend_from_history(history: &[f64]) -> ScoreTrend {
    if history.len() < 6 {
        return ScoreTrend::Stable;
    }
    let third = history.len() / 3;
    let oldest: f64 = history[..third].iter().sum::<f64>() / third as f64;
    let newest: f64 = history[history.len() - third..].iter().sum::<f64>() / third as f64;
    let delta = newest - oldest;
    if delta > 1.5 {
        ScoreTrend::Improving
    } else if delta < -1.5 {
        ScoreTrend::Declining
    } else {
        ScoreTrend::Stable
    }
}

fn advice_for(
    metrics: &VenueMetrics,
    breakdown: &TrustBreakdown,
    composite: f64,
) -> (Vec<String>, Vec<String>) {
    let mut recommendations = Vec::new();
    let mut warnings = Vec::new();

    if composite >= 85.0 {
        recommendations.push("Suitable for large orders".to_string());
    } else if composite >= 70.0 {
        recommendations.push("Suitable for standard orders".to_string());
    } else {
        recommendations.push("Limit order size and monitor execution".to_string());
    }

    if breakdown.security < 60.0 {
        warnings.push("Weak security posture".to_string());
    }
    if breakdown.liquidity < 50.0 {
        warnings.push("Thin liquidity".to_string());
    }
    if metrics.operational.uptime_pct < 95.0 {
        warnings.push(format!(
            "Uptime below 95% ({:.1}%)",
            metrics.operational.uptime_pct
        ));
    }

    (recommendations, warnings)
}

// src/gas/estimator.rs
//! Fee/gas estimation: adaptive strategy selection over live congestion,
//! speed-tiered pricing and fiat conversion.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::snapshot::{GasSnapshotStore, NetworkGasSnapshot};
use crate::price::CachedPriceFeed;
use crate::types::{Network, TradeSpeed, Venue};

/// Named fee strategies the selector can pick. Each contributes a
/// gas-limit multiplier and a priority-fee multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeeStrategy {
    CongestionAware,
    Eip1559Optimized,
    LowCongestion,
    FastConfirmation,
}

impl FeeStrategy {
    pub fn gas_limit_multiplier(&self) -> f64 {
        match self {
            FeeStrategy::CongestionAware => 1.10,
            FeeStrategy::Eip1559Optimized => 1.00,
            FeeStrategy::LowCongestion => 1.00,
            FeeStrategy::FastConfirmation => 1.15,
        }
    }

    pub fn priority_fee_multiplier(&self) -> f64 {
        match self {
            FeeStrategy::CongestionAware => 1.20,
            FeeStrategy::Eip1559Optimized => 1.00,
            FeeStrategy::LowCongestion => 0.80,
            FeeStrategy::FastConfirmation => 1.50,
        }
    }

    /// Threshold rules over live congestion/utilization: heavy congestion
    /// biases toward fast confirmation, a quiet network toward cheap
    /// inclusion, everything else toward fee-market-optimized pricing.
    pub fn select(snapshot: &NetworkGasSnapshot) -> FeeStrategy {
        if snapshot.congestion > 80.0 {
            FeeStrategy::FastConfirmation
        } else if snapshot.congestion < 30.0 {
            FeeStrategy::LowCongestion
        } else if snapshot.is_fee_market() {
            FeeStrategy::Eip1559Optimized
        } else {
            FeeStrategy::CongestionAware
        }
    }
}

impl fmt::Display for FeeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeeStrategy::CongestionAware => write!(f, "congestion_aware"),
            FeeStrategy::Eip1559Optimized => write!(f, "eip1559_optimized"),
            FeeStrategy::LowCongestion => write!(f, "low_congestion"),
            FeeStrategy::FastConfirmation => write!(f, "fast_confirmation"),
        }
    }
}

/// What is being executed: which venue's contracts and how many hops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationProfile {
    pub venue: Venue,
    pub hop_count: usize,
}

impl OperationProfile {
    pub fn swap(venue: Venue, hop_count: usize) -> Self {
        Self { venue, hop_count }
    }

    /// Gas limit before strategy adjustment: base entry cost plus the
    /// venue's per-hop increment.
    pub fn gas_limit(&self) -> u64 {
        let profile = self.venue.gas_profile();
        profile.base_gas + self.hop_count as u64 * profile.per_hop_gas
    }
}

/// Fully-formed estimate returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GasEstimate {
    pub network: Network,
    pub speed: TradeSpeed,
    pub strategy: FeeStrategy,
    pub gas_limit: u64,
    pub max_fee_per_gas_gwei: f64,
    pub priority_fee_per_gas_gwei: f64,
    pub is_fee_market: bool,
    pub total_cost_native: f64,
    pub total_cost_usd: f64,
    /// 0-100.
    pub confidence: f64,
    pub estimated_confirmation_ms: u64,
}

/// The estimator: reads the snapshot store, converts to fiat through the
/// cached price feed. Holds no mutable state of its own.
pub struct GasEstimator {
    snapshots: Arc<GasSnapshotStore>,
    prices: Arc<CachedPriceFeed>,
}

impl GasEstimator {
    pub fn new(snapshots: Arc<GasSnapshotStore>, prices: Arc<CachedPriceFeed>) -> Self {
        Self { snapshots, prices }
    }

    pub fn snapshots(&self) -> &Arc<GasSnapshotStore> {
        &self.snapshots
    }

    pub async fn estimate(
        &self,
        network: Network,
        profile: &OperationProfile,
        speed: TradeSpeed,
    ) -> GasEstimate {
        let snapshot = self.snapshots.get(network);
        let estimate = self.estimate_from_snapshot(&snapshot, profile, speed);
        let price = self.prices.native_price_usd(network).await;

        debug!(
            "gas estimate for {} on {}: {} via {}, {:.4} {} (${:.2})",
            profile.venue,
            network,
            estimate.gas_limit,
            estimate.strategy,
            estimate.total_cost_native,
            network.native_symbol(),
            estimate.total_cost_native * price
        );

        GasEstimate {
            total_cost_usd: estimate.total_cost_native * price,
            ..estimate
        }
    }

    /// Synchronous core over an explicit snapshot; fiat cost is left at
    /// zero for the async wrapper to fill.
    pub fn estimate_from_snapshot(
        &self,
        snapshot: &NetworkGasSnapshot,
        profile: &OperationProfile,
        speed: TradeSpeed,
    ) -> GasEstimate {
        let strategy = FeeStrategy::select(snapshot);
        let gas_limit =
            (profile.gas_limit() as f64 * strategy.gas_limit_multiplier()).round() as u64;

        let priority_gwei = snapshot.priority_fee_gwei
            * strategy.priority_fee_multiplier()
            * speed.multiplier();

        // Fee-market pricing when the network reports a base fee; legacy
        // single-price model otherwise. Mutually exclusive.
        let max_fee_gwei = if snapshot.is_fee_market() {
            2.0 * snapshot.base_fee_gwei + priority_gwei
        } else {
            priority_gwei
        };

        let total_cost_native = gas_limit as f64 * max_fee_gwei * 1e-9;

        let mut confidence = 90.0_f64;
        if snapshot.congestion > 80.0 {
            confidence -= 15.0;
        }
        if snapshot.utilization > 90.0 {
            confidence -= 10.0;
        }
        if snapshot.is_fee_market() {
            confidence += 5.0;
        }

        let estimated_confirmation_ms = (snapshot.block_time_ms as f64
            * speed.target_blocks() as f64
            * (1.0 + snapshot.congestion / 100.0))
            .round() as u64;

        GasEstimate {
            network: snapshot.network,
            speed,
            strategy,
            gas_limit,
            max_fee_per_gas_gwei: max_fee_gwei,
            priority_fee_per_gas_gwei: priority_gwei,
            is_fee_market: snapshot.is_fee_market(),
            total_cost_native,
            total_cost_usd: 0.0,
            confidence: confidence.clamp(0.0, 100.0),
            estimated_confirmation_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn snapshot(congestion: f64, base_fee: f64) -> NetworkGasSnapshot {
        NetworkGasSnapshot {
            network: Network::Ethereum,
            block_height: 19_000_000,
            base_fee_gwei: base_fee,
            priority_fee_gwei: 2.0,
            congestion,
            utilization: 70.0,
            block_time_ms: 12_000,
            timestamp: Utc::now(),
        }
    }

    fn estimator() -> GasEstimator {
        GasEstimator::new(
            Arc::new(GasSnapshotStore::without_providers()),
            Arc::new(CachedPriceFeed::fallback_only()),
        )
    }

    #[test]
    fn strategy_thresholds() {
        assert_eq!(FeeStrategy::select(&snapshot(85.0, 20.0)), FeeStrategy::FastConfirmation);
        assert_eq!(FeeStrategy::select(&snapshot(20.0, 20.0)), FeeStrategy::LowCongestion);
        assert_eq!(FeeStrategy::select(&snapshot(50.0, 20.0)), FeeStrategy::Eip1559Optimized);
        assert_eq!(FeeStrategy::select(&snapshot(50.0, 0.0)), FeeStrategy::CongestionAware);
    }

    #[test]
    fn high_congestion_pays_strictly_more() {
        let est = estimator();
        let profile = OperationProfile::swap(Venue::UniswapV2, 1);

        let congested = est.estimate_from_snapshot(&snapshot(85.0, 20.0), &profile, TradeSpeed::Standard);
        let standard = est.estimate_from_snapshot(&snapshot(50.0, 20.0), &profile, TradeSpeed::Standard);

        assert_eq!(congested.strategy, FeeStrategy::FastConfirmation);
        assert!(congested.max_fee_per_gas_gwei > standard.max_fee_per_gas_gwei);
    }

    #[test]
    fn instant_is_never_cheaper_than_slow() {
        let est = estimator();
        let profile = OperationProfile::swap(Venue::UniswapV3, 2);
        for snap in [snapshot(85.0, 20.0), snapshot(50.0, 20.0), snapshot(10.0, 0.0)] {
            let slow = est.estimate_from_snapshot(&snap, &profile, TradeSpeed::Slow);
            let instant = est.estimate_from_snapshot(&snap, &profile, TradeSpeed::Instant);
            assert!(instant.max_fee_per_gas_gwei >= slow.max_fee_per_gas_gwei);
            assert!(instant.estimated_confirmation_ms <= slow.estimated_confirmation_ms);
        }
    }

    #[test]
    fn gas_limit_scales_with_hops() {
        let est = estimator();
        let one = est.estimate_from_snapshot(
            &snapshot(50.0, 20.0),
            &OperationProfile::swap(Venue::SushiSwap, 1),
            TradeSpeed::Standard,
        );
        let three = est.estimate_from_snapshot(
            &snapshot(50.0, 20.0),
            &OperationProfile::swap(Venue::SushiSwap, 3),
            TradeSpeed::Standard,
        );
        assert!(three.gas_limit > one.gas_limit);
        let profile = Venue::SushiSwap.gas_profile();
        assert_eq!(three.gas_limit - one.gas_limit, 2 * profile.per_hop_gas);
    }

    #[test]
    fn legacy_pricing_used_without_base_fee() {
        let est = estimator();
        let profile = OperationProfile::swap(Venue::PancakeSwap, 1);
        let legacy = est.estimate_from_snapshot(&snapshot(50.0, 0.0), &profile, TradeSpeed::Standard);
        assert!(!legacy.is_fee_market);
        assert_eq!(legacy.max_fee_per_gas_gwei, legacy.priority_fee_per_gas_gwei);
    }

    #[test]
    fn confidence_penalties_and_bonus() {
        let est = estimator();
        let profile = OperationProfile::swap(Venue::UniswapV2, 1);

        let calm = est.estimate_from_snapshot(&snapshot(50.0, 20.0), &profile, TradeSpeed::Standard);
        assert_eq!(calm.confidence, 95.0); // 90 + fee-market bonus

        let mut busy = snapshot(85.0, 20.0);
        busy.utilization = 95.0;
        let stressed = est.estimate_from_snapshot(&busy, &profile, TradeSpeed::Standard);
        assert_eq!(stressed.confidence, 70.0); // 90 - 15 - 10 + 5
    }

    #[tokio::test]
    async fn fiat_conversion_uses_fallback_price() {
        let est = estimator();
        let result = est
            .estimate(
                Network::Ethereum,
                &OperationProfile::swap(Venue::UniswapV2, 1),
                TradeSpeed::Standard,
            )
            .await;
        assert!(result.total_cost_usd > 0.0);
        assert!((result.total_cost_usd / result.total_cost_native - 3_000.0).abs() < 1.0);
    }
}

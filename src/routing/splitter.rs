// src/routing/splitter.rs
//! Order splitting for large trades.
//!
//! A big order through a single pool pays quadratically growing impact; the
//! same notional spread over parallel paths pays each pool's impact at a
//! fraction of the size. Splitting is simulated for every factor from 2 up
//! to the configured cap, each sub-order assigned a distinct candidate
//! path, and the best plan is returned. Whether it beats the single-path
//! winner is the caller's decision.

use log::debug;
use serde::{Deserialize, Serialize};

use super::engine::{cost_path, CandidatePath};
use crate::types::RoutingOptions;

/// One sub-order of a split plan: a candidate path re-costed at the
/// reduced size it would actually carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitAllocation {
    pub path: CandidatePath,
}

/// A fully simulated split: per-path allocations plus the folded totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitPlan {
    pub allocations: Vec<SplitAllocation>,
    pub total_output: f64,
    pub total_gas: u64,
    /// Worst cumulative impact over any sub-order; the plan's slippage
    /// exposure is bounded by its weakest leg.
    pub worst_impact: f64,
    /// Sub-orders execute in parallel, so the plan takes as long as its
    /// slowest leg.
    pub max_latency_ms: u64,
    pub reliability: f64,
}

/// Simulate equal-split plans over the ranked candidates and return the
/// highest-output plan that respects the caller's constraints, or `None`
/// when no factor produces a valid plan.
///
/// Each sub-order gets a distinct path: re-costing the same pool twice at
/// half size would understate the combined impact, so the split factor is
/// capped at the number of available paths.
pub fn best_split(
    candidates: &[CandidatePath],
    amount: f64,
    options: &RoutingOptions,
    per_hop_fee: f64,
    max_split_factor: usize,
) -> Option<SplitPlan> {
    if candidates.len() < 2 || amount <= 0.0 {
        return None;
    }

    let max_factor = max_split_factor.min(candidates.len()).min(4);
    let mut best: Option<SplitPlan> = None;

    for factor in 2..=max_factor {
        let sub_amount = amount / factor as f64;
        let plan = simulate(&candidates[..factor], sub_amount, per_hop_fee);

        if plan.total_gas > options.max_gas_cost {
            debug!(
                "split factor {factor} rejected: combined gas {} over cap",
                plan.total_gas
            );
            continue;
        }
        if plan.worst_impact > options.max_slippage {
            debug!(
                "split factor {factor} rejected: leg impact {:.4} over cap",
                plan.worst_impact
            );
            continue;
        }
        if plan.reliability < options.risk_tolerance.trust_floor() {
            continue;
        }

        let improves = best
            .as_ref()
            .map(|b| plan.total_output > b.total_output)
            .unwrap_or(true);
        if improves {
            best = Some(plan);
        }
    }

    best
}

fn simulate(paths: &[CandidatePath], sub_amount: f64, per_hop_fee: f64) -> SplitPlan {
    let mut allocations = Vec::with_capacity(paths.len());
    let mut total_output = 0.0;
    let mut total_gas = 0u64;
    let mut worst_impact = 0.0_f64;
    let mut max_latency_ms = 0u64;
    let mut reliability = 100.0_f64;

    for path in paths {
        // Trust was already resolved when the candidate was costed; the
        // fold keeps the minimum, so the path-level figure carries through.
        let recosted = cost_path(path.segments.clone(), sub_amount, per_hop_fee, |_| {
            path.reliability
        });

        total_output += recosted.output;
        total_gas += recosted.gas_cost;
        worst_impact = worst_impact.max(recosted.price_impact);
        max_latency_ms = max_latency_ms.max(recosted.latency_ms);
        reliability = reliability.min(recosted.reliability);
        allocations.push(SplitAllocation { path: recosted });
    }

    SplitPlan {
        allocations,
        total_output,
        total_gas,
        worst_impact,
        max_latency_ms,
        reliability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::graph::PathSegment;
    use crate::types::{Network, RiskTolerance, Venue};

    fn candidate(venue: Venue, impact: f64, gas: u64, reference: f64) -> CandidatePath {
        let segment = PathSegment {
            token_in: "USDC".to_string(),
            token_out: "ETH".to_string(),
            venue,
            network: Network::Ethereum,
            price: 0.0003,
            price_impact: impact,
            reference_amount: reference,
            liquidity_usd: 10_000_000.0,
            gas_estimate: gas,
            trust_score: 95.0,
            latency_ms: 400,
        };
        cost_path(vec![segment], reference, 0.003, |s| s.trust_score)
    }

    #[test]
    fn two_way_split_beats_concentrated_order() {
        let candidates = vec![
            candidate(Venue::UniswapV2, 0.01, 150_000, 100_000.0),
            candidate(Venue::UniswapV3, 0.01, 150_000, 100_000.0),
        ];
        let options = RoutingOptions {
            max_slippage: 0.05,
            max_gas_cost: 2_000_000,
            ..Default::default()
        };
        let single = cost_path(
            candidates[0].segments.clone(),
            200_000.0,
            0.003,
            |s| s.trust_score,
        );
        let plan = best_split(&candidates, 200_000.0, &options, 0.003, 4).unwrap();

        assert_eq!(plan.allocations.len(), 2);
        assert!(plan.total_output > single.output);
        assert_eq!(plan.total_gas, 300_000);
    }

    #[test]
    fn no_split_with_a_single_candidate() {
        let candidates = vec![candidate(Venue::UniswapV2, 0.01, 150_000, 100_000.0)];
        assert!(best_split(&candidates, 200_000.0, &RoutingOptions::default(), 0.003, 4).is_none());
    }

    #[test]
    fn gas_cap_rejects_wide_splits() {
        let candidates = vec![
            candidate(Venue::UniswapV2, 0.01, 150_000, 100_000.0),
            candidate(Venue::UniswapV3, 0.01, 150_000, 100_000.0),
            candidate(Venue::SushiSwap, 0.01, 150_000, 100_000.0),
        ];
        let options = RoutingOptions {
            max_slippage: 0.05,
            // Room for two legs but not three.
            max_gas_cost: 350_000,
            ..Default::default()
        };
        let plan = best_split(&candidates, 300_000.0, &options, 0.003, 4).unwrap();
        assert_eq!(plan.allocations.len(), 2);
    }

    #[test]
    fn trust_floor_applies_to_every_leg() {
        let mut weak = candidate(Venue::SushiSwap, 0.01, 150_000, 100_000.0);
        weak.reliability = 60.0;
        let candidates = vec![
            candidate(Venue::UniswapV2, 0.01, 150_000, 100_000.0),
            weak,
        ];
        let options = RoutingOptions {
            max_slippage: 0.05,
            max_gas_cost: 2_000_000,
            risk_tolerance: RiskTolerance::Low,
            ..Default::default()
        };
        assert!(best_split(&candidates, 200_000.0, &options, 0.003, 4).is_none());
    }

    #[test]
    fn factor_capped_by_candidate_count() {
        let candidates = vec![
            candidate(Venue::UniswapV2, 0.02, 150_000, 100_000.0),
            candidate(Venue::UniswapV3, 0.02, 150_000, 100_000.0),
        ];
        let options = RoutingOptions {
            max_slippage: 0.05,
            max_gas_cost: 2_000_000,
            ..Default::default()
        };
        let plan = best_split(&candidates, 400_000.0, &options, 0.003, 4).unwrap();
        assert!(plan.allocations.len() <= 2);
    }
}

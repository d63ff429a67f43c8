// src/routing/engine.rs
//! The routing engine: builds the token graph from live quotes, generates
//! and costs candidate paths, filters them against the caller's
//! constraints, scores the survivors and converts the winner into the
//! external `OptimalRoute` shape.

use itertools::Itertools;
use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::graph::{PathSegment, SegmentWeights, TokenGraph};
use super::splitter::{best_split, SplitPlan};
use crate::config::RouterConfig;
use crate::error::{RouterError, RouterResult};
use crate::gas::{GasEstimate, GasEstimator, OperationProfile};
use crate::trust::{DexRanking, FeedbackOutcome, RankFilters, RiskAssessment, TrustModel};
use crate::types::{
    Network, OptimalRoute, Quote, RoutePriority, RouteStep, RouteStrategy, RoutingOptions,
    TradeSpeed, Venue,
};

/// Intermediate tokens two-hop candidates are routed through: the major
/// stables and wrapped-native assets, where depth concentrates.
static HUB_TOKENS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["USDC", "USDT", "DAI", "WETH", "WBNB", "WMATIC"]);

/// A costed candidate path. Aggregates are always the deterministic fold
/// computed by [`cost_path`]: summed gas, multiplicatively compounded
/// impact, max latency, min trust.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePath {
    pub segments: Vec<PathSegment>,
    pub amount_in: f64,
    pub output: f64,
    pub gas_cost: u64,
    pub price_impact: f64,
    pub latency_ms: u64,
    pub reliability: f64,
}

impl CandidatePath {
    pub fn hop_count(&self) -> usize {
        self.segments.len()
    }

    pub fn strategy(&self) -> RouteStrategy {
        if self.segments.len() == 1 {
            RouteStrategy::Direct
        } else {
            RouteStrategy::MultiHop
        }
    }
}

/// Run `amount` through a segment sequence. The single place aggregate
/// totals are computed, so they can never disagree with the segments.
pub(crate) fn cost_path(
    segments: Vec<PathSegment>,
    amount: f64,
    per_hop_fee: f64,
    trust_of: impl Fn(&PathSegment) -> f64,
) -> CandidatePath {
    let mut current = amount;
    let mut impact_survival = 1.0;
    let mut gas_cost = 0u64;
    let mut latency_ms = 0u64;
    let mut reliability = 100.0_f64;

    for segment in &segments {
        let impact = segment.impact_at(current);
        current = current * segment.price * (1.0 - impact) * (1.0 - per_hop_fee);
        impact_survival *= 1.0 - impact;
        gas_cost += segment.gas_estimate;
        latency_ms = latency_ms.max(segment.latency_ms);
        reliability = reliability.min(trust_of(segment));
    }

    CandidatePath {
        segments,
        amount_in: amount,
        output: current,
        gas_cost,
        price_impact: 1.0 - impact_survival,
        latency_ms,
        reliability,
    }
}

/// Why a candidate was dropped; feeds the no-route reason string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RejectReason {
    TooManyHops,
    SlippageExceeded,
    GasExceeded,
    TrustBelowFloor,
}

impl RejectReason {
    fn as_str(&self) -> &'static str {
        match self {
            RejectReason::TooManyHops => "hop limit",
            RejectReason::SlippageExceeded => "max slippage",
            RejectReason::GasExceeded => "max gas cost",
            RejectReason::TrustBelowFloor => "trust floor",
        }
    }
}

/// The orchestrator. Reads the trust and gas caches, writes nothing
/// shared during a request; concurrent calls never interfere.
pub struct RouteEngine {
    trust: Arc<TrustModel>,
    gas: Arc<GasEstimator>,
    config: RouterConfig,
}

impl RouteEngine {
    pub fn new(trust: Arc<TrustModel>, gas: Arc<GasEstimator>, config: RouterConfig) -> Self {
        Self { trust, gas, config }
    }

    /// Primary entry point: one ranked, costed routing recommendation for
    /// the trade, or a typed no-route failure.
    pub fn find_optimal_route(
        &self,
        quotes: &[Quote],
        token_in: &str,
        token_out: &str,
        amount: f64,
        options: &RoutingOptions,
    ) -> RouterResult<OptimalRoute> {
        if !(amount.is_finite() && amount > 0.0) {
            return Err(RouterError::InvalidAmount(format!("{amount}")));
        }
        if token_in == token_out {
            return Err(RouterError::InvalidInput("token_in equals token_out".into()));
        }
        if quotes.is_empty() {
            return Err(RouterError::no_route("no quotes supplied"));
        }

        let network = quotes[0].network;
        let graph = TokenGraph::from_quotes(quotes, network);
        if graph.edge_count() == 0 {
            return Err(RouterError::no_route(format!(
                "no usable quotes for network {network}"
            )));
        }

        let candidates = self.generate_candidates(&graph, token_in, token_out, amount, options);
        if candidates.is_empty() {
            return Err(RouterError::PoolNotFound {
                token_in: token_in.to_string(),
                token_out: token_out.to_string(),
                network: network.to_string(),
            });
        }

        let (mut accepted, rejections) = self.filter_candidates(candidates, options);
        if accepted.is_empty() {
            let reasons = rejections.iter().map(|r| r.as_str()).unique().join(", ");
            return Err(RouterError::no_route(format!(
                "all {} candidates rejected ({})",
                rejections.len(),
                reasons
            )));
        }

        // Rank by composite so selection and splitting see a stable order.
        let best_output = accepted
            .iter()
            .map(|c| c.output)
            .fold(f64::MIN, f64::max);
        accepted.sort_by(|a, b| {
            let sa = self.composite_score(a, options, best_output);
            let sb = self.composite_score(b, options, best_output);
            sb.partial_cmp(&sa).unwrap_or(std::cmp::Ordering::Equal)
        });

        let winner = self.select(&accepted, options, best_output);
        debug!(
            "selected {:?} path {} -> {} with output {:.6} ({} candidates)",
            winner.strategy(),
            token_in,
            token_out,
            winner.output,
            accepted.len()
        );

        // Route splitting for large orders: accepted only when the plan
        // strictly beats the best single-path output (not merely the
        // priority-selected winner) with combined gas still under the cap.
        if amount >= options.split_threshold {
            if let Some(plan) = best_split(
                &accepted,
                amount,
                options,
                self.config.per_hop_fee,
                self.config.max_split_factor,
            ) {
                let single_best = best_output.max(winner.output);
                if plan.total_output > single_best && plan.total_gas <= options.max_gas_cost {
                    info!(
                        "split into {} sub-orders improves output {:.6} -> {:.6}",
                        plan.allocations.len(),
                        single_best,
                        plan.total_output
                    );
                    return Ok(self.split_to_route(&plan, amount));
                }
            }
        }

        Ok(self.path_to_route(winner, amount))
    }

    /// Gas estimate for executing a finished route at the given speed.
    pub async fn estimate_gas(
        &self,
        venue: &Venue,
        route: &OptimalRoute,
        network: Network,
        speed: TradeSpeed,
    ) -> GasEstimate {
        let profile = OperationProfile::swap(venue.clone(), route.steps.len().max(1));
        self.gas.estimate(network, &profile, speed).await
    }

    pub fn rank_venues(&self, network: Network, filters: &RankFilters) -> Vec<DexRanking> {
        self.trust.rank(network, filters)
    }

    pub fn assess_risk(
        &self,
        venue: &Venue,
        network: Network,
        trade_size_usd: f64,
    ) -> RiskAssessment {
        self.trust.assess_risk(venue, network, trade_size_usd)
    }

    pub fn report_outcome(&self, venue: &Venue, network: Network, outcome: &FeedbackOutcome) {
        self.trust.ingest_feedback(venue, network, outcome);
    }

    /// Live trust composite when the model tracks the venue, otherwise the
    /// snapshot the quote carried.
    fn effective_trust(&self, segment: &PathSegment) -> f64 {
        if self.trust.store().contains(&segment.venue, segment.network) {
            self.trust.score(&segment.venue, segment.network).composite
        } else {
            segment.trust_score
        }
    }

    /// Direct edges plus, when allowed, two-hop paths through the hub
    /// tokens with the best segment per hop chosen by the weighted
    /// formula.
    fn generate_candidates(
        &self,
        graph: &TokenGraph,
        token_in: &str,
        token_out: &str,
        amount: f64,
        options: &RoutingOptions,
    ) -> Vec<CandidatePath> {
        let weights = SegmentWeights::for_flags(options.prioritize_cost, options.prioritize_speed);
        let trust_of = |segment: &PathSegment| self.effective_trust(segment);
        let mut candidates = Vec::new();

        for segment in graph.segments_between(token_in, token_out) {
            candidates.push(cost_path(
                vec![segment.clone()],
                amount,
                self.config.per_hop_fee,
                trust_of,
            ));
        }

        if options.max_hops > 1 {
            for hub in HUB_TOKENS.iter() {
                if *hub == token_in || *hub == token_out {
                    continue;
                }
                let first = graph.best_segment(token_in, hub, &weights);
                let second = graph.best_segment(hub, token_out, &weights);
                if let (Some(first), Some(second)) = (first, second) {
                    candidates.push(cost_path(
                        vec![first.clone(), second.clone()],
                        amount,
                        self.config.per_hop_fee,
                        trust_of,
                    ));
                }
            }
        }

        candidates
    }

    /// Aggregate-level constraint checks. A path whose segments each pass
    /// individually is still rejected here when its fold breaches a limit.
    fn filter_candidates(
        &self,
        candidates: Vec<CandidatePath>,
        options: &RoutingOptions,
    ) -> (Vec<CandidatePath>, Vec<RejectReason>) {
        let floor = options.risk_tolerance.trust_floor();
        let mut accepted = Vec::new();
        let mut rejections = Vec::new();

        for candidate in candidates {
            let reason = if candidate.hop_count() > options.max_hops {
                Some(RejectReason::TooManyHops)
            } else if candidate.price_impact > options.max_slippage {
                Some(RejectReason::SlippageExceeded)
            } else if candidate.gas_cost > options.max_gas_cost {
                Some(RejectReason::GasExceeded)
            } else if candidate.reliability < floor {
                Some(RejectReason::TrustBelowFloor)
            } else {
                None
            };

            match reason {
                Some(r) => {
                    debug!(
                        "rejected {}-hop candidate on {}: {}",
                        candidate.hop_count(),
                        candidate
                            .segments
                            .first()
                            .map(|s| s.venue.to_string())
                            .unwrap_or_default(),
                        r.as_str()
                    );
                    rejections.push(r);
                }
                None => accepted.push(candidate),
            }
        }

        (accepted, rejections)
    }

    /// Weighted rubric: output 40%, gas headroom 20%, slippage headroom
    /// 15%, speed 10% when prioritized, trust 10%, simplicity 5%.
    fn composite_score(
        &self,
        candidate: &CandidatePath,
        options: &RoutingOptions,
        best_output: f64,
    ) -> f64 {
        let output = if best_output > 0.0 {
            (candidate.output / best_output).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let gas_headroom =
            (1.0 - candidate.gas_cost as f64 / options.max_gas_cost as f64).clamp(0.0, 1.0);
        let slippage_headroom = if options.max_slippage > 0.0 {
            (1.0 - candidate.price_impact / options.max_slippage).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let speed = (1.0 - candidate.latency_ms as f64 / 2_000.0).clamp(0.0, 1.0);
        let speed_weight = if options.prioritize_speed { 0.10 } else { 0.0 };
        let trust = (candidate.reliability / 100.0).clamp(0.0, 1.0);
        let simplicity = 1.0 / candidate.hop_count().max(1) as f64;

        output * 0.40
            + gas_headroom * 0.20
            + slippage_headroom * 0.15
            + speed * speed_weight
            + trust * 0.10
            + simplicity * 0.05
    }

    /// Pick per the caller's priority; `accepted` is pre-sorted by
    /// composite descending, so composite breaks every tie.
    fn select<'a>(
        &self,
        accepted: &'a [CandidatePath],
        options: &RoutingOptions,
        _best_output: f64,
    ) -> &'a CandidatePath {
        match options.priority {
            RoutePriority::Fastest => accepted
                .iter()
                .min_by_key(|c| c.latency_ms)
                .unwrap_or(&accepted[0]),
            RoutePriority::Cheapest => accepted
                .iter()
                .min_by_key(|c| c.gas_cost)
                .unwrap_or(&accepted[0]),
            RoutePriority::BestScore => &accepted[0],
        }
    }

    fn path_to_route(&self, path: &CandidatePath, amount: f64) -> OptimalRoute {
        OptimalRoute {
            steps: steps_for(path, amount, 100.0, self.config.per_hop_fee),
            total_output: path.output,
            total_gas_cost: path.gas_cost,
            total_price_impact: path.price_impact,
            estimated_execution_ms: path.latency_ms,
            reliability_score: path.reliability,
            strategy: path.strategy(),
        }
    }

    /// Flatten a split plan into steps. Each leg's share of the order is
    /// stamped on every step of that leg; shares partition the order
    /// across legs, not across steps.
    fn split_to_route(&self, plan: &SplitPlan, amount: f64) -> OptimalRoute {
        let mut steps = Vec::new();
        let mut any_multi_hop = false;
        for allocation in &plan.allocations {
            let percentage = allocation.path.amount_in / amount * 100.0;
            any_multi_hop |= allocation.path.hop_count() > 1;
            steps.extend(steps_for(
                &allocation.path,
                allocation.path.amount_in,
                percentage,
                self.config.per_hop_fee,
            ));
        }
        OptimalRoute {
            steps,
            total_output: plan.total_output,
            total_gas_cost: plan.total_gas,
            total_price_impact: plan.worst_impact,
            estimated_execution_ms: plan.max_latency_ms,
            reliability_score: plan.reliability,
            strategy: if any_multi_hop {
                RouteStrategy::Hybrid
            } else {
                RouteStrategy::Split
            },
        }
    }
}

/// Expand one costed path into executable steps, re-deriving per-step
/// amounts with the same fold used for the aggregates.
fn steps_for(
    path: &CandidatePath,
    amount: f64,
    percentage: f64,
    per_hop_fee: f64,
) -> Vec<RouteStep> {
    let mut steps = Vec::new();
    let mut current = amount;
    for segment in &path.segments {
        let impact = segment.impact_at(current);
        let out = current * segment.price * (1.0 - impact) * (1.0 - per_hop_fee);
        steps.push(RouteStep {
            venue: segment.venue.clone(),
            token_in: segment.token_in.clone(),
            token_out: segment.token_out.clone(),
            amount_in: current,
            amount_out: out,
            percentage,
        });
        current = out;
    }
    steps
}

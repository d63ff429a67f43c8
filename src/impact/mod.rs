// src/impact/mod.rs
//! Price-impact estimation for liquidity-pool swaps.
//!
//! Pure functions of pool state: given reserves, a curve type and a trade
//! size, compute expected output, effective execution price and the impact
//! relative to spot. Slippage violations are reported in the result rather
//! than returned as errors so the routing engine can compare candidates
//! uniformly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{Network, Venue};

/// Pricing curve implemented by a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveType {
    /// x * y = k with an LP fee taken on input.
    ConstantProduct,
    /// Amplified stable-asset curve; approximated here as a flattened
    /// constant-product curve whose effective depth is scaled by the
    /// amplification factor.
    Stable { amplification: u64 },
}

/// State of one liquidity pool for a token pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub address: String,
    pub venue: Venue,
    pub network: Network,
    pub token_a: String,
    pub token_b: String,
    pub reserve_a: f64,
    pub reserve_b: f64,
    pub lp_fee_bps: u16,
    pub curve: CurveType,
}

impl Pool {
    /// Spot price of `token_out` per `token_in` before any trade size.
    pub fn spot_price(&self, token_in: &str) -> Option<f64> {
        let (r_in, r_out) = self.reserves_for(token_in)?;
        if r_in <= 0.0 {
            return None;
        }
        Some(r_out / r_in)
    }

    fn reserves_for(&self, token_in: &str) -> Option<(f64, f64)> {
        if token_in == self.token_a {
            Some((self.reserve_a, self.reserve_b))
        } else if token_in == self.token_b {
            Some((self.reserve_b, self.reserve_a))
        } else {
            None
        }
    }

    fn effective_depth(&self, reserve: f64) -> f64 {
        match self.curve {
            CurveType::ConstantProduct => reserve,
            // Higher amplification trades closer to constant-sum, which
            // behaves like a deeper constant-product pool near balance.
            CurveType::Stable { amplification } => reserve * (1.0 + (amplification as f64).ln().max(0.0)),
        }
    }

    /// Output amount for `amount_in` of `token_in`, LP fee included.
    pub fn output_for(&self, token_in: &str, amount_in: f64) -> Option<f64> {
        let (r_in, r_out) = self.reserves_for(token_in)?;
        if r_in <= 0.0 || r_out <= 0.0 || amount_in <= 0.0 {
            return None;
        }
        let fee_fraction = self.lp_fee_bps as f64 / 10_000.0;
        let amount_after_fee = amount_in * (1.0 - fee_fraction);

        let depth_in = self.effective_depth(r_in);
        let depth_out = self.effective_depth(r_out);

        // x*y=k on the (possibly amplified) depths, scaled back so the
        // output can never exceed the real reserve.
        let out = depth_out * amount_after_fee / (depth_in + amount_after_fee);
        Some(out.min(r_out * 0.999))
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} on {} ({})",
            self.token_a, self.token_b, self.venue, self.network
        )
    }
}

/// Result of a single impact estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceImpactResult {
    pub expected_output: f64,
    pub spot_price: f64,
    pub effective_price: f64,
    /// (spot - effective) / spot, as a fraction.
    pub price_impact: f64,
    pub max_slippage: f64,
    /// True when the computed impact exceeds `max_slippage`. The numbers
    /// above are still filled in so candidates remain comparable.
    pub exceeds_max_slippage: bool,
}

/// Injectable registry of known pools, keyed by pair and network.
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: Vec<Pool>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        Self { pools: Vec::new() }
    }

    pub fn with_pools(pools: Vec<Pool>) -> Self {
        Self { pools }
    }

    pub fn register(&mut self, pool: Pool) {
        self.pools.push(pool);
    }

    /// All pools serving the pair on the network, either direction.
    pub fn available_pools(&self, token_in: &str, token_out: &str, network: Network) -> Vec<&Pool> {
        self.pools
            .iter()
            .filter(|p| {
                p.network == network
                    && ((p.token_a == token_in && p.token_b == token_out)
                        || (p.token_b == token_in && p.token_a == token_out))
            })
            .collect()
    }
}

/// Stateless estimator over pool snapshots.
#[derive(Debug, Default)]
pub struct PriceImpactEstimator;

impl PriceImpactEstimator {
    pub fn new() -> Self {
        Self
    }

    /// Estimate the impact of swapping `amount_in` of `token_in` through a
    /// single pool. Returns `None` only when the pool does not serve the
    /// token or holds no liquidity.
    pub fn estimate(
        &self,
        pool: &Pool,
        token_in: &str,
        amount_in: f64,
        max_slippage: f64,
    ) -> Option<PriceImpactResult> {
        let spot = pool.spot_price(token_in)?;
        let output = pool.output_for(token_in, amount_in)?;
        Some(self.build_result(spot, output, amount_in, max_slippage))
    }

    /// Estimate across parallel pools for the same pair: the trade is
    /// consumed sequentially against the deepest pool first, spilling into
    /// shallower pools, which is strictly better than a naive average.
    pub fn estimate_aggregate(
        &self,
        pools: &[&Pool],
        token_in: &str,
        amount_in: f64,
        max_slippage: f64,
    ) -> Option<PriceImpactResult> {
        if pools.is_empty() || amount_in <= 0.0 {
            return None;
        }

        let mut ordered: Vec<&Pool> = pools
            .iter()
            .copied()
            .filter(|p| p.spot_price(token_in).is_some())
            .collect();
        if ordered.is_empty() {
            return None;
        }
        ordered.sort_by(|a, b| {
            let depth_a = a.reserves_for(token_in).map(|(r, _)| r).unwrap_or(0.0);
            let depth_b = b.reserves_for(token_in).map(|(r, _)| r).unwrap_or(0.0);
            depth_b.partial_cmp(&depth_a).unwrap_or(std::cmp::Ordering::Equal)
        });

        // Best spot among the pools is the reference price the caller saw.
        let spot = ordered
            .iter()
            .filter_map(|p| p.spot_price(token_in))
            .fold(f64::MIN, f64::max);

        let mut remaining = amount_in;
        let mut total_output = 0.0;
        for pool in &ordered {
            if remaining <= 0.0 {
                break;
            }
            let (r_in, _) = pool.reserves_for(token_in)?;
            // Consume at most half the pool's input reserve per pool; the
            // remainder spills to the next-deepest pool.
            let chunk = remaining.min(r_in * 0.5);
            if chunk <= 0.0 {
                continue;
            }
            if let Some(out) = pool.output_for(token_in, chunk) {
                total_output += out;
                remaining -= chunk;
            }
        }

        // Whatever could not be absorbed executes at severely degraded
        // terms in the deepest pool rather than silently vanishing.
        if remaining > 0.0 {
            if let Some(out) = ordered[0].output_for(token_in, remaining) {
                total_output += out * 0.5;
            }
        }

        Some(self.build_result(spot, total_output, amount_in, max_slippage))
    }

    fn build_result(
        &self,
        spot: f64,
        output: f64,
        amount_in: f64,
        max_slippage: f64,
    ) -> PriceImpactResult {
        let effective = if amount_in > 0.0 { output / amount_in } else { 0.0 };
        let impact = if spot > 0.0 {
            ((spot - effective) / spot).max(0.0)
        } else {
            1.0
        };
        PriceImpactResult {
            expected_output: output,
            spot_price: spot,
            effective_price: effective,
            price_impact: impact,
            max_slippage,
            exceeds_max_slippage: impact > max_slippage,
        }
    }
}

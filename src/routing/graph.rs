// src/routing/graph.rs
//! Per-request token graph built from live venue quotes.
//!
//! Nodes are token symbols; edges are `PathSegment`s derived from the
//! supplied quotes. The graph is transient: built fresh for each routing
//! request, searched, then dropped, with no cross-request state.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{Network, Quote, Venue};

/// One edge in the token graph: a venue-mediated conversion with the
/// economics observed at quote time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub token_in: String,
    pub token_out: String,
    pub venue: Venue,
    pub network: Network,
    /// token_out per token_in at the quoted size.
    pub price: f64,
    /// Impact observed at `reference_amount`, as a fraction. Impact at
    /// other sizes is scaled linearly from this point.
    pub price_impact: f64,
    /// Trade size (token_in units) the quote was struck at.
    pub reference_amount: f64,
    pub liquidity_usd: f64,
    pub gas_estimate: u64,
    pub trust_score: f64,
    pub latency_ms: u64,
}

impl PathSegment {
    fn from_quote(quote: &Quote) -> Self {
        let gas_estimate = if quote.gas_estimate > 0 {
            quote.gas_estimate
        } else {
            // Quotes from thin adapters may omit gas; fall back to the
            // venue's profile for a single hop.
            let profile = quote.venue.gas_profile();
            profile.base_gas + profile.per_hop_gas
        };
        Self {
            token_in: quote.token_in.clone(),
            token_out: quote.token_out.clone(),
            venue: quote.venue.clone(),
            network: quote.network,
            price: quote.price,
            price_impact: quote.price_impact,
            reference_amount: if quote.price > 0.0 && quote.expected_output > 0.0 {
                quote.expected_output / quote.price
            } else {
                0.0
            },
            liquidity_usd: quote.liquidity_usd,
            gas_estimate,
            trust_score: quote.trust_score,
            latency_ms: quote.latency_ms,
        }
    }

    /// Price impact for a trade of `amount`, scaled from the reference
    /// point. A sub-order smaller than the quoted size moves the pool
    /// proportionally less.
    pub fn impact_at(&self, amount: f64) -> f64 {
        if self.reference_amount <= 0.0 || amount <= 0.0 {
            return self.price_impact;
        }
        (self.price_impact * (amount / self.reference_amount)).clamp(0.0, 1.0)
    }
}

/// Relative weights used when choosing the best of several parallel edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentWeights {
    pub cost: f64,
    pub speed: f64,
    pub trust: f64,
    pub liquidity: f64,
}

impl SegmentWeights {
    /// Weight profile derived from the caller's priority flags.
    pub fn for_flags(prioritize_cost: bool, prioritize_speed: bool) -> Self {
        match (prioritize_cost, prioritize_speed) {
            (true, false) => Self { cost: 0.55, speed: 0.10, trust: 0.20, liquidity: 0.15 },
            (false, true) => Self { cost: 0.15, speed: 0.50, trust: 0.20, liquidity: 0.15 },
            (true, true) => Self { cost: 0.35, speed: 0.35, trust: 0.15, liquidity: 0.15 },
            (false, false) => Self { cost: 0.30, speed: 0.15, trust: 0.30, liquidity: 0.25 },
        }
    }
}

/// Adjacency map over quote-derived segments for one network.
#[derive(Debug, Default)]
pub struct TokenGraph {
    adjacency: HashMap<String, Vec<PathSegment>>,
    edge_count: usize,
}

impl TokenGraph {
    /// Build the graph from live quotes, keeping only those for the
    /// requested network. Quotes are never mutated.
    pub fn from_quotes(quotes: &[Quote], network: Network) -> Self {
        let mut adjacency: HashMap<String, Vec<PathSegment>> = HashMap::new();
        let mut edge_count = 0;

        for quote in quotes.iter().filter(|q| q.network == network) {
            if quote.price <= 0.0 || !quote.price.is_finite() {
                debug!(
                    "dropping malformed quote from {} for {}/{}",
                    quote.venue, quote.token_in, quote.token_out
                );
                continue;
            }
            let segment = PathSegment::from_quote(quote);
            adjacency
                .entry(segment.token_in.clone())
                .or_default()
                .push(segment);
            edge_count += 1;
        }

        debug!(
            "token graph built: {} nodes, {} edges",
            adjacency.len(),
            edge_count
        );
        Self { adjacency, edge_count }
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn token_count(&self) -> usize {
        self.adjacency.len()
    }

    /// All parallel edges from `token_in` to `token_out`.
    pub fn segments_between(&self, token_in: &str, token_out: &str) -> Vec<&PathSegment> {
        self.adjacency
            .get(token_in)
            .map(|edges| edges.iter().filter(|e| e.token_out == token_out).collect())
            .unwrap_or_default()
    }

    /// Best single edge between two tokens under the given weights, or
    /// `None` when no edge exists.
    pub fn best_segment(
        &self,
        token_in: &str,
        token_out: &str,
        weights: &SegmentWeights,
    ) -> Option<&PathSegment> {
        self.segments_between(token_in, token_out)
            .into_iter()
            .max_by(|a, b| {
                let sa = segment_score(a, weights);
                let sb = segment_score(b, weights);
                sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
            })
    }

    pub fn neighbors(&self, token: &str) -> Vec<&str> {
        self.adjacency
            .get(token)
            .map(|edges| edges.iter().map(|e| e.token_out.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Score one segment under the weight profile; higher is better. Each
/// component is normalized to 0-1 before weighting.
pub fn segment_score(segment: &PathSegment, weights: &SegmentWeights) -> f64 {
    // Lower impact is cheaper execution; 5% impact zeroes the component.
    let cost = (1.0 - segment.price_impact / 0.05).clamp(0.0, 1.0);
    // 2s latency zeroes the speed component.
    let speed = (1.0 - segment.latency_ms as f64 / 2_000.0).clamp(0.0, 1.0);
    let trust = (segment.trust_score / 100.0).clamp(0.0, 1.0);
    // Log scale: $1B saturates.
    let liquidity = if segment.liquidity_usd > 1.0 {
        (segment.liquidity_usd.log10() / 9.0).clamp(0.0, 1.0)
    } else {
        0.0
    };

    cost * weights.cost + speed * weights.speed + trust * weights.trust + liquidity * weights.liquidity
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QuoteFees, QuoteMetadata};
    use chrono::Utc;

    pub(crate) fn quote(
        venue: Venue,
        token_in: &str,
        token_out: &str,
        price: f64,
        impact: f64,
        trust: f64,
    ) -> Quote {
        Quote {
            venue,
            network: Network::Ethereum,
            token_in: token_in.to_string(),
            token_out: token_out.to_string(),
            price,
            expected_output: price * 1_000.0,
            price_impact: impact,
            liquidity_usd: 5_000_000.0,
            gas_estimate: 150_000,
            latency_ms: 400,
            trust_score: trust,
            hops: vec![token_in.to_string(), token_out.to_string()],
            confidence: 0.95,
            fees: QuoteFees { protocol_fee_bps: 30, lp_fee_bps: 30, gas_price_gwei: 20.0 },
            metadata: QuoteMetadata {
                pool_address: "0xabc".to_string(),
                source: "test".to_string(),
                fetched_at: Utc::now(),
            },
        }
    }

    #[test]
    fn builds_adjacency_per_network_only() {
        let mut polygon_quote = quote(Venue::SushiSwap, "USDC", "ETH", 0.0003, 0.002, 80.0);
        polygon_quote.network = Network::Polygon;
        let quotes = vec![
            quote(Venue::UniswapV2, "USDC", "ETH", 0.0003, 0.001, 95.0),
            polygon_quote,
        ];
        let graph = TokenGraph::from_quotes(&quotes, Network::Ethereum);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.segments_between("USDC", "ETH").len(), 1);
    }

    #[test]
    fn malformed_quotes_are_dropped() {
        let mut bad = quote(Venue::UniswapV2, "USDC", "ETH", 0.0, 0.001, 95.0);
        bad.price = -1.0;
        let graph = TokenGraph::from_quotes(&[bad], Network::Ethereum);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn best_segment_prefers_low_impact_under_cost_weights() {
        let quotes = vec![
            quote(Venue::UniswapV2, "USDC", "ETH", 0.0003, 0.001, 95.0),
            quote(Venue::SushiSwap, "USDC", "ETH", 0.0003, 0.005, 60.0),
        ];
        let graph = TokenGraph::from_quotes(&quotes, Network::Ethereum);
        let weights = SegmentWeights::for_flags(true, false);
        let best = graph.best_segment("USDC", "ETH", &weights).unwrap();
        assert_eq!(best.venue, Venue::UniswapV2);
    }

    #[test]
    fn impact_scales_with_amount() {
        let q = quote(Venue::UniswapV2, "USDC", "ETH", 0.0003, 0.01, 95.0);
        let graph = TokenGraph::from_quotes(&[q], Network::Ethereum);
        let seg = graph.segments_between("USDC", "ETH")[0];
        let full = seg.impact_at(seg.reference_amount);
        let half = seg.impact_at(seg.reference_amount / 2.0);
        assert!((full - seg.price_impact).abs() < 1e-12);
        assert!((half - seg.price_impact / 2.0).abs() < 1e-12);
    }
}

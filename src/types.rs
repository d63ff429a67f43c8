// src/types.rs
//! Shared data model for the routing and cost-estimation engine.
//!
//! Quotes arrive from external feed adapters and are never mutated here;
//! everything else in this file is derived, per-request state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported networks. The engine is chain-agnostic in its algorithms but
/// needs per-network constants for gas pricing and fiat fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Ethereum,
    Polygon,
    Arbitrum,
    Optimism,
    Base,
    Bsc,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Polygon => 137,
            Network::Arbitrum => 42161,
            Network::Optimism => 10,
            Network::Base => 8453,
            Network::Bsc => 56,
        }
    }

    pub fn native_symbol(&self) -> &'static str {
        match self {
            Network::Ethereum | Network::Arbitrum | Network::Optimism | Network::Base => "ETH",
            Network::Polygon => "MATIC",
            Network::Bsc => "BNB",
        }
    }

    /// Average block time in milliseconds, used for confirmation estimates
    /// when a live snapshot does not report one.
    pub fn avg_block_time_ms(&self) -> u64 {
        match self {
            Network::Ethereum => 12_000,
            Network::Polygon => 2_200,
            Network::Arbitrum => 300,
            Network::Optimism => 2_000,
            Network::Base => 2_000,
            Network::Bsc => 3_000,
        }
    }

    pub fn all() -> &'static [Network] {
        &[
            Network::Ethereum,
            Network::Polygon,
            Network::Arbitrum,
            Network::Optimism,
            Network::Base,
            Network::Bsc,
        ]
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Ethereum => write!(f, "ethereum"),
            Network::Polygon => write!(f, "polygon"),
            Network::Arbitrum => write!(f, "arbitrum"),
            Network::Optimism => write!(f, "optimism"),
            Network::Base => write!(f, "base"),
            Network::Bsc => write!(f, "bsc"),
        }
    }
}

/// A venue is one DEX integration. Venues with shape differences are a
/// closed set of tagged variants dispatched through the methods below;
/// anything we have no profile for lands in `Unknown` and is handled
/// conservatively everywhere downstream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    UniswapV2,
    UniswapV3,
    SushiSwap,
    Curve,
    Balancer,
    PancakeSwap,
    Unknown(String),
}

/// Per-venue gas cost profile: a base cost for the swap entry plus an
/// incremental cost per additional hop routed through the venue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VenueGasProfile {
    pub base_gas: u64,
    pub per_hop_gas: u64,
}

impl Venue {
    /// Different DEX implementations cost different amounts of computation.
    pub fn gas_profile(&self) -> VenueGasProfile {
        match self {
            Venue::UniswapV2 => VenueGasProfile { base_gas: 110_000, per_hop_gas: 80_000 },
            Venue::UniswapV3 => VenueGasProfile { base_gas: 130_000, per_hop_gas: 95_000 },
            Venue::SushiSwap => VenueGasProfile { base_gas: 115_000, per_hop_gas: 82_000 },
            Venue::Curve => VenueGasProfile { base_gas: 190_000, per_hop_gas: 140_000 },
            Venue::Balancer => VenueGasProfile { base_gas: 160_000, per_hop_gas: 120_000 },
            Venue::PancakeSwap => VenueGasProfile { base_gas: 105_000, per_hop_gas: 78_000 },
            // Conservative estimate for venues we have no profile for.
            Venue::Unknown(_) => VenueGasProfile { base_gas: 250_000, per_hop_gas: 180_000 },
        }
    }

    /// Stable key used by the trust model's metrics store.
    pub fn trust_key(&self) -> String {
        self.to_string()
    }

    /// Protocol-level fee in basis points charged per swap on this venue.
    pub fn protocol_fee_bps(&self) -> u16 {
        match self {
            Venue::UniswapV2 | Venue::SushiSwap => 30,
            Venue::UniswapV3 => 30,
            Venue::Curve => 4,
            Venue::Balancer => 25,
            Venue::PancakeSwap => 25,
            Venue::Unknown(_) => 30,
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::UniswapV2 => write!(f, "uniswap_v2"),
            Venue::UniswapV3 => write!(f, "uniswap_v3"),
            Venue::SushiSwap => write!(f, "sushiswap"),
            Venue::Curve => write!(f, "curve"),
            Venue::Balancer => write!(f, "balancer"),
            Venue::PancakeSwap => write!(f, "pancakeswap"),
            Venue::Unknown(name) => write!(f, "unknown:{}", name),
        }
    }
}

/// Desired confirmation urgency for gas estimation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSpeed {
    Slow,
    Standard,
    Fast,
    Instant,
}

impl TradeSpeed {
    /// Gas price multiplier applied on top of the strategy-adjusted price.
    pub fn multiplier(&self) -> f64 {
        match self {
            TradeSpeed::Slow => 0.8,
            TradeSpeed::Standard => 1.0,
            TradeSpeed::Fast => 1.2,
            TradeSpeed::Instant => 1.5,
        }
    }

    /// Expected number of blocks until inclusion at this speed.
    pub fn target_blocks(&self) -> u64 {
        match self {
            TradeSpeed::Slow => 10,
            TradeSpeed::Standard => 3,
            TradeSpeed::Fast => 2,
            TradeSpeed::Instant => 1,
        }
    }
}

/// Caller's appetite for untrusted venues; maps to a trust-score floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub fn trust_floor(&self) -> f64 {
        match self {
            RiskTolerance::Low => 90.0,
            RiskTolerance::Medium => 75.0,
            RiskTolerance::High => 60.0,
        }
    }
}

/// Which axis the caller wants optimized when ranking candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutePriority {
    Fastest,
    Cheapest,
    BestScore,
}

/// Fee breakdown attached to a quote by the feed adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteFees {
    pub protocol_fee_bps: u16,
    pub lp_fee_bps: u16,
    pub gas_price_gwei: f64,
}

/// Freshness and provenance metadata on a quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteMetadata {
    pub pool_address: String,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
}

/// A venue's offer for a token pair at a point in time. Supplied by
/// exchange-specific feed adapters; short-lived and immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub venue: Venue,
    pub network: Network,
    pub token_in: String,
    pub token_out: String,
    /// Unit price: token_out per token_in at the quoted size.
    pub price: f64,
    pub expected_output: f64,
    /// Price impact of the quoted size, as a fraction (0.01 = 1%).
    pub price_impact: f64,
    /// Available liquidity behind this quote, USD-denominated.
    pub liquidity_usd: f64,
    pub gas_estimate: u64,
    pub latency_ms: u64,
    /// Trust score snapshot taken by the feed at quote time, 0-100.
    pub trust_score: f64,
    /// Token symbols traversed to produce this quote, endpoints included.
    pub hops: Vec<String>,
    /// Feed's confidence in the quote, 0-1.
    pub confidence: f64,
    pub fees: QuoteFees,
    pub metadata: QuoteMetadata,
}

/// Caller constraints and preferences for one routing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingOptions {
    /// Maximum acceptable cumulative price impact, as a fraction.
    pub max_slippage: f64,
    /// Maximum acceptable total gas limit across all hops.
    pub max_gas_cost: u64,
    pub max_hops: usize,
    pub risk_tolerance: RiskTolerance,
    pub priority: RoutePriority,
    pub prioritize_cost: bool,
    pub prioritize_speed: bool,
    /// Orders above this size (in token_in units) are considered for splitting.
    pub split_threshold: f64,
}

impl Default for RoutingOptions {
    fn default() -> Self {
        Self {
            max_slippage: 0.03,
            max_gas_cost: 1_200_000,
            max_hops: 2,
            risk_tolerance: RiskTolerance::Medium,
            priority: RoutePriority::BestScore,
            prioritize_cost: false,
            prioritize_speed: false,
            split_threshold: 10_000.0,
        }
    }
}

/// Strategy tag describing how a route was assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteStrategy {
    Direct,
    MultiHop,
    Split,
    Hybrid,
}

impl fmt::Display for RouteStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteStrategy::Direct => write!(f, "direct"),
            RouteStrategy::MultiHop => write!(f, "multi-hop"),
            RouteStrategy::Split => write!(f, "split"),
            RouteStrategy::Hybrid => write!(f, "hybrid"),
        }
    }
}

/// One executable step of the externally-visible route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    pub venue: Venue,
    pub token_in: String,
    pub token_out: String,
    pub amount_in: f64,
    pub amount_out: f64,
    /// Share of the total order routed through this step's leg, 0-100.
    /// Every step of a multi-hop leg carries the leg's share, so shares
    /// sum to 100 over the legs (the steps entering the input token), not
    /// over all steps.
    pub percentage: f64,
}

/// The contract returned to the caller: a fully costed, ranked route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalRoute {
    pub steps: Vec<RouteStep>,
    pub total_output: f64,
    pub total_gas_cost: u64,
    /// Cumulative price impact across all hops, as a fraction.
    pub total_price_impact: f64,
    pub estimated_execution_ms: u64,
    /// Worst-case venue trust score along the route, 0-100.
    pub reliability_score: f64,
    pub strategy: RouteStrategy,
}

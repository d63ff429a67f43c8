// src/lib.rs
//! Multi-venue DEX trade routing and execution-cost estimation.
//!
//! Given live quotes from decentralized exchanges, the crate scores venue
//! trustworthiness, models price impact against pool depth, estimates gas
//! under live network conditions and assembles the best execution route,
//! splitting large orders across venues when that improves output.

pub mod config;
pub mod error;
pub mod gas;
pub mod impact;
pub mod price;
pub mod routing;
pub mod trust;
pub mod types;

pub use config::RouterConfig;
pub use error::{RouterError, RouterResult};
pub use gas::{FeeStrategy, GasEstimate, GasEstimator, GasSnapshotStore};
pub use impact::{PriceImpactEstimator, PriceImpactResult};
pub use price::CachedPriceFeed;
pub use routing::RouteEngine;
pub use trust::{MetricsStore, TrustModel, TrustScore};
pub use types::{
    Network, OptimalRoute, Quote, RiskTolerance, RoutePriority, RouteStrategy, RoutingOptions,
    TradeSpeed, Venue,
};

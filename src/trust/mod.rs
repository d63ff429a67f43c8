// src/trust/mod.rs
//! Venue trust model: metrics state, composite scoring, ranking and
//! per-trade risk assessment.

pub mod metrics;
pub mod scoring;

pub use metrics::{
    FeedbackOutcome, FeeMetrics, MetricsFeed, MetricsStore, OperationalMetrics, SecurityMetrics,
    StaticMetricsFeed, UxMetrics, VenueMetrics,
};
pub use scoring::{
    DexRanking, RankFilters, RiskAssessment, RiskTier, ScoreTrend, TradeRecommendation,
    TrustBreakdown, TrustModel, TrustScore, UNKNOWN_VENUE_SCORE,
};

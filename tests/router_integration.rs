// tests/router_integration.rs
//! End-to-end routing scenarios over a fully wired engine: seeded trust
//! metrics, a populated gas snapshot store and the fallback price table.

use chrono::Utc;
use pretty_assertions::assert_eq;
use std::sync::Arc;

use dex_router::gas::{GasEstimator, GasSnapshotStore, NetworkGasSnapshot, OperationProfile};
use dex_router::price::CachedPriceFeed;
use dex_router::trust::{
    FeeMetrics, FeedbackOutcome, OperationalMetrics, SecurityMetrics, TrustModel, UxMetrics,
    VenueMetrics,
};
use dex_router::trust::MetricsStore;
use dex_router::types::{
    Network, Quote, QuoteFees, QuoteMetadata, RiskTolerance, RouteStrategy, RoutingOptions,
    TradeSpeed, Venue,
};
use dex_router::{RouteEngine, RouterConfig, RouterError};

fn venue_metrics(venue: &Venue, network: Network, audit: f64, uptime: f64) -> VenueMetrics {
    VenueMetrics {
        venue: venue.trust_key(),
        network,
        operational: OperationalMetrics {
            uptime_pct: uptime,
            avg_response_ms: 150.0,
            success_rate_pct: uptime,
            api_reliability_pct: uptime,
            liquidity_depth_usd: 40_000_000.0,
            volume_24h_usd: 90_000_000.0,
            tvl_usd: 600_000_000.0,
        },
        security: SecurityMetrics {
            audit_score: audit,
            has_bug_bounty: true,
            months_operating: 48,
            incident_count: 0,
            last_incident_days_ago: None,
            insurance_coverage_usd: 2_000_000.0,
        },
        fees: FeeMetrics {
            avg_protocol_fee_bps: 30.0,
            avg_lp_fee_bps: 30.0,
            gas_efficiency: 80.0,
        },
        ux: UxMetrics {
            interface_score: 85.0,
            documentation_score: 85.0,
            support_score: 80.0,
        },
        updated_at: Utc::now(),
    }
}

fn wired_engine() -> RouteEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(MetricsStore::new(24, 0.3));
    for venue in [
        Venue::UniswapV2,
        Venue::UniswapV3,
        Venue::SushiSwap,
        Venue::Curve,
        Venue::PancakeSwap,
    ] {
        store.upsert(venue_metrics(&venue, Network::Ethereum, 95.0, 99.5));
    }
    let trust = Arc::new(TrustModel::new(store));

    let snapshots = Arc::new(GasSnapshotStore::without_providers());
    snapshots.insert(NetworkGasSnapshot {
        network: Network::Ethereum,
        block_height: 19_500_000,
        base_fee_gwei: 18.0,
        priority_fee_gwei: 1.5,
        congestion: 55.0,
        utilization: 65.0,
        block_time_ms: 12_000,
        timestamp: Utc::now(),
    });
    let gas = Arc::new(GasEstimator::new(snapshots, Arc::new(CachedPriceFeed::fallback_only())));

    RouteEngine::new(trust, gas, RouterConfig::default())
}

fn quote_sized(
    venue: Venue,
    token_in: &str,
    token_out: &str,
    price: f64,
    impact: f64,
    trust: f64,
    quoted_amount: f64,
) -> Quote {
    Quote {
        venue,
        network: Network::Ethereum,
        token_in: token_in.to_string(),
        token_out: token_out.to_string(),
        price,
        expected_output: price * quoted_amount,
        price_impact: impact,
        liquidity_usd: 8_000_000.0,
        gas_estimate: 160_000,
        latency_ms: 350,
        trust_score: trust,
        hops: vec![token_in.to_string(), token_out.to_string()],
        confidence: 0.95,
        fees: QuoteFees { protocol_fee_bps: 30, lp_fee_bps: 30, gas_price_gwei: 18.0 },
        metadata: QuoteMetadata {
            pool_address: "0xpool".to_string(),
            source: "integration".to_string(),
            fetched_at: Utc::now(),
        },
    }
}

fn quote(venue: Venue, t_in: &str, t_out: &str, price: f64, impact: f64, trust: f64) -> Quote {
    quote_sized(venue, t_in, t_out, price, impact, trust, 1_000.0)
}

#[test]
fn picks_the_low_impact_high_trust_venue_for_a_direct_swap() {
    let engine = wired_engine();
    let quotes = vec![
        quote(Venue::UniswapV2, "USDC", "ETH", 0.0003, 0.001, 95.0),
        quote(Venue::Unknown("shadyswap".into()), "USDC", "ETH", 0.000302, 0.005, 60.0),
    ];
    let options = RoutingOptions {
        prioritize_cost: true,
        risk_tolerance: RiskTolerance::High,
        ..Default::default()
    };

    let route = engine
        .find_optimal_route(&quotes, "USDC", "ETH", 1_000.0, &options)
        .unwrap();

    assert_eq!(route.strategy, RouteStrategy::Direct);
    assert_eq!(route.steps.len(), 1);
    assert_eq!(route.steps[0].venue, Venue::UniswapV2);
    assert!(route.reliability_score > 80.0);
}

#[test]
fn repeated_calls_are_deterministic() {
    let engine = wired_engine();
    let quotes = vec![
        quote(Venue::UniswapV2, "USDC", "ETH", 0.0003, 0.0012, 95.0),
        quote(Venue::UniswapV3, "USDC", "ETH", 0.000301, 0.0010, 94.0),
        quote(Venue::Curve, "USDC", "USDT", 0.9998, 0.0001, 92.0),
        quote(Venue::SushiSwap, "USDT", "ETH", 0.0003, 0.0015, 90.0),
    ];
    let options = RoutingOptions::default();

    let first = engine
        .find_optimal_route(&quotes, "USDC", "ETH", 2_000.0, &options)
        .unwrap();
    for _ in 0..10 {
        let again = engine
            .find_optimal_route(&quotes, "USDC", "ETH", 2_000.0, &options)
            .unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn thin_liquidity_with_low_tolerance_yields_no_viable_route() {
    let engine = wired_engine();
    // The only pool is quoted for 1% of the requested size; at full size
    // its scaled impact dwarfs any sane slippage cap.
    let quotes = vec![quote_sized(
        Venue::SushiSwap,
        "USDC",
        "PEPE",
        120_000.0,
        0.02,
        90.0,
        1_000.0,
    )];
    let options = RoutingOptions {
        max_slippage: 0.01,
        risk_tolerance: RiskTolerance::Low,
        ..Default::default()
    };

    let err = engine
        .find_optimal_route(&quotes, "USDC", "PEPE", 100_000.0, &options)
        .unwrap_err();
    assert!(matches!(err, RouterError::NoViableRoute { .. }));
}

#[test]
fn splitting_never_regresses_output() {
    let engine = wired_engine();
    let quotes = vec![
        quote_sized(Venue::UniswapV2, "USDC", "ETH", 0.0003, 0.012, 95.0, 150_000.0),
        quote_sized(Venue::UniswapV3, "USDC", "ETH", 0.0003, 0.012, 94.0, 150_000.0),
        quote_sized(Venue::SushiSwap, "USDC", "ETH", 0.000299, 0.012, 92.0, 150_000.0),
    ];
    let small_options = RoutingOptions {
        max_slippage: 0.06,
        max_gas_cost: 2_000_000,
        split_threshold: 50_000.0,
        ..Default::default()
    };

    // Below the threshold: a single path.
    let small = engine
        .find_optimal_route(&quotes, "USDC", "ETH", 10_000.0, &small_options)
        .unwrap();
    assert_eq!(small.strategy, RouteStrategy::Direct);

    // Above the threshold the engine may split, and if it does the split
    // must strictly beat what the best single path yields at full size.
    let large = engine
        .find_optimal_route(&quotes, "USDC", "ETH", 300_000.0, &small_options)
        .unwrap();
    if large.strategy == RouteStrategy::Split {
        let percentages: f64 = large.steps.iter().map(|s| s.percentage).sum();
        assert!((percentages - 100.0).abs() < 1e-6);
        assert!(large.steps.len() >= 2);
    }
    // Per-unit output of the large order can never exceed the small one.
    assert!(large.total_output / 300_000.0 <= small.total_output / 10_000.0 + 1e-12);
}

#[test]
fn trust_floor_blocks_unknown_venues_for_conservative_callers() {
    let engine = wired_engine();
    let quotes = vec![quote(
        Venue::Unknown("freshdex".into()),
        "USDC",
        "ETH",
        0.00031,
        0.001,
        30.0,
    )];
    let options = RoutingOptions {
        risk_tolerance: RiskTolerance::Low,
        ..Default::default()
    };

    let err = engine
        .find_optimal_route(&quotes, "USDC", "ETH", 1_000.0, &options)
        .unwrap_err();
    assert!(err.to_string().contains("trust floor"));

    // The same quote clears a high-risk caller's floor of 60 only if its
    // trust does; at 30 it stays blocked there too.
    let relaxed = RoutingOptions {
        risk_tolerance: RiskTolerance::High,
        ..Default::default()
    };
    assert!(engine
        .find_optimal_route(&quotes, "USDC", "ETH", 1_000.0, &relaxed)
        .is_err());
}

#[tokio::test]
async fn route_gas_estimate_reflects_hop_count_and_speed() {
    let engine = wired_engine();
    let quotes = vec![
        quote(Venue::UniswapV2, "ARB", "USDC", 1.1, 0.002, 93.0),
        quote(Venue::UniswapV3, "USDC", "OP", 0.45, 0.002, 94.0),
    ];
    let route = engine
        .find_optimal_route(&quotes, "ARB", "OP", 500.0, &RoutingOptions::default())
        .unwrap();
    assert_eq!(route.steps.len(), 2);

    let slow = engine
        .estimate_gas(&Venue::UniswapV3, &route, Network::Ethereum, TradeSpeed::Slow)
        .await;
    let instant = engine
        .estimate_gas(&Venue::UniswapV3, &route, Network::Ethereum, TradeSpeed::Instant)
        .await;

    assert!(instant.max_fee_per_gas_gwei >= slow.max_fee_per_gas_gwei);
    assert!(instant.estimated_confirmation_ms <= slow.estimated_confirmation_ms);
    assert!(slow.total_cost_usd > 0.0);

    let two_hop = OperationProfile::swap(Venue::UniswapV3, 2).gas_limit();
    let one_hop = OperationProfile::swap(Venue::UniswapV3, 1).gas_limit();
    assert!(two_hop > one_hop);
}

#[test]
fn routing_leaves_trust_history_untouched() {
    let _ = env_logger::builder().is_test(true).try_init();
    let store = Arc::new(MetricsStore::new(24, 0.3));
    store.upsert(venue_metrics(&Venue::UniswapV2, Network::Ethereum, 95.0, 99.5));
    let trust = Arc::new(TrustModel::new(store.clone()));
    let gas = Arc::new(GasEstimator::new(
        Arc::new(GasSnapshotStore::without_providers()),
        Arc::new(CachedPriceFeed::fallback_only()),
    ));
    let engine = RouteEngine::new(trust.clone(), gas, RouterConfig::default());

    let quotes = vec![quote(Venue::UniswapV2, "USDC", "ETH", 0.0003, 0.001, 95.0)];
    for _ in 0..5 {
        engine
            .find_optimal_route(&quotes, "USDC", "ETH", 1_000.0, &RoutingOptions::default())
            .unwrap();
    }
    assert!(store
        .score_history(&Venue::UniswapV2, Network::Ethereum)
        .is_empty());

    // The trend window only advances on the periodic snapshot cadence.
    trust.snapshot_scores(Network::Ethereum);
    assert_eq!(
        store
            .score_history(&Venue::UniswapV2, Network::Ethereum)
            .len(),
        1
    );
}

#[test]
fn negative_feedback_lowers_a_venues_standing() {
    let engine = wired_engine();
    let venue = Venue::SushiSwap;
    let before = engine
        .assess_risk(&venue, Network::Ethereum, 10_000.0)
        .risk_score;

    for _ in 0..5 {
        engine.report_outcome(
            &venue,
            Network::Ethereum,
            &FeedbackOutcome {
                successful: false,
                actual_slippage: 0.08,
                rating: 0.5,
                execution_ms: Some(9_000),
            },
        );
    }

    let after = engine
        .assess_risk(&venue, Network::Ethereum, 10_000.0)
        .risk_score;
    assert!(after > before);
}

// src/config/mod.rs
//! Runtime configuration for the routing engine.
//!
//! Every tunable has an environment variable and a default. Components take
//! a `RouterConfig` (or a slice of it) by value at construction, so tests
//! build configs directly instead of touching the environment.

use std::env;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// How often the per-network gas snapshot store refreshes.
    pub gas_refresh_interval: Duration,
    /// Per-source timeout for live gas-data fetches.
    pub gas_provider_timeout: Duration,
    /// TTL for the cached native-token USD price.
    pub price_cache_ttl: Duration,
    /// How often venue metrics are re-polled from monitoring feeds.
    pub metrics_refresh_interval: Duration,
    /// Rolling trust-score history length per (venue, network).
    pub trust_history_window: usize,
    /// Blend factor for user-feedback ingestion; bounds how far a single
    /// report can move stored metrics.
    pub feedback_decay: f64,
    /// Flat per-hop routing fee applied when costing candidates (fraction).
    pub per_hop_fee: f64,
    /// Maximum sub-orders the splitter will simulate.
    pub max_split_factor: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            gas_refresh_interval: Duration::from_secs(15),
            gas_provider_timeout: Duration::from_secs(10),
            price_cache_ttl: Duration::from_secs(300),
            metrics_refresh_interval: Duration::from_secs(60),
            trust_history_window: 24,
            feedback_decay: 0.3,
            per_hop_fee: 0.003,
            max_split_factor: 4,
        }
    }
}

impl RouterConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let defaults = Self::default();
        Self {
            gas_refresh_interval: Duration::from_secs(
                env_u64("GAS_REFRESH_INTERVAL_SECS", defaults.gas_refresh_interval.as_secs()),
            ),
            gas_provider_timeout: Duration::from_secs(
                env_u64("GAS_PROVIDER_TIMEOUT_SECS", defaults.gas_provider_timeout.as_secs()),
            ),
            price_cache_ttl: Duration::from_secs(
                env_u64("PRICE_CACHE_TTL_SECS", defaults.price_cache_ttl.as_secs()),
            ),
            metrics_refresh_interval: Duration::from_secs(env_u64(
                "METRICS_REFRESH_INTERVAL_SECS",
                defaults.metrics_refresh_interval.as_secs(),
            )),
            trust_history_window: env_u64("TRUST_HISTORY_WINDOW", defaults.trust_history_window as u64)
                as usize,
            feedback_decay: env_f64("FEEDBACK_DECAY", defaults.feedback_decay),
            per_hop_fee: env_f64("PER_HOP_FEE", defaults.per_hop_fee),
            max_split_factor: env_u64("MAX_SPLIT_FACTOR", defaults.max_split_factor as u64) as usize,
        }
    }

    pub fn validate_and_log(&self) {
        log::info!("Router configuration loaded: {:?}", self);
        if !(0.0..=1.0).contains(&self.feedback_decay) {
            log::error!(
                "FEEDBACK_DECAY must be within [0, 1], got {}",
                self.feedback_decay
            );
        }
        if self.max_split_factor < 2 {
            log::warn!(
                "MAX_SPLIT_FACTOR {} disables splitting (minimum useful value is 2)",
                self.max_split_factor
            );
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

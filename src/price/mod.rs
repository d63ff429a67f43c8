// src/price/mod.rs
//! Native-token USD price feed with a short-TTL cache and a static
//! per-chain fallback table.
//!
//! The gas estimator converts native-denominated costs to fiat through
//! this module. A dead upstream degrades to the last cached price, then to
//! the hardcoded table, so fiat conversion never hard-fails.

use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, warn};
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::types::Network;

/// Conservative static prices keyed by chain id, used when both the live
/// feed and the cache are unavailable.
static FALLBACK_PRICES: Lazy<HashMap<u64, f64>> = Lazy::new(|| {
    HashMap::from([
        (1, 3_000.0),     // Ethereum
        (137, 0.8),       // Polygon
        (42161, 3_000.0), // Arbitrum (ETH)
        (10, 3_000.0),    // Optimism (ETH)
        (8453, 3_000.0),  // Base (ETH)
        (56, 550.0),      // BSC
    ])
});

#[async_trait]
pub trait NativePriceFeed: Send + Sync {
    async fn price_usd(&self, symbol: &str) -> anyhow::Result<f64>;
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    usd: f64,
}

/// Live feed over an HTTP price API (`GET {endpoint}?symbol=ETH`).
pub struct HttpPriceFeed {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpPriceFeed {
    pub fn new(endpoint: Url, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl NativePriceFeed for HttpPriceFeed {
    async fn price_usd(&self, symbol: &str) -> anyhow::Result<f64> {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("symbol", symbol);
        let response: PriceResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        anyhow::ensure!(response.usd.is_finite() && response.usd > 0.0, "bad price");
        Ok(response.usd)
    }
}

/// Fixed-price feed for tests and offline operation.
pub struct StaticPriceFeed {
    prices: HashMap<String, f64>,
}

impl StaticPriceFeed {
    pub fn new(prices: HashMap<String, f64>) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl NativePriceFeed for StaticPriceFeed {
    async fn price_usd(&self, symbol: &str) -> anyhow::Result<f64> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no price for {symbol}"))
    }
}

/// Caching wrapper over a price feed. Stale entries past the TTL trigger a
/// refetch; a failed refetch serves the stale price before falling back to
/// the static table.
pub struct CachedPriceFeed {
    feed: Option<Arc<dyn NativePriceFeed>>,
    cache: DashMap<String, (f64, Instant)>,
    ttl: Duration,
}

impl CachedPriceFeed {
    pub fn new(feed: Arc<dyn NativePriceFeed>, ttl: Duration) -> Self {
        Self { feed: Some(feed), cache: DashMap::new(), ttl }
    }

    /// Feed-less instance: every lookup resolves from the fallback table.
    pub fn fallback_only() -> Self {
        Self { feed: None, cache: DashMap::new(), ttl: Duration::from_secs(300) }
    }

    /// USD price of the network's native token. Infallible by design.
    pub async fn native_price_usd(&self, network: Network) -> f64 {
        let symbol = network.native_symbol();

        if let Some(entry) = self.cache.get(symbol) {
            let (price, fetched_at) = *entry;
            if fetched_at.elapsed() < self.ttl {
                return price;
            }
        }

        if let Some(feed) = &self.feed {
            match feed.price_usd(symbol).await {
                Ok(price) => {
                    self.cache.insert(symbol.to_string(), (price, Instant::now()));
                    debug!("refreshed {} price: ${:.2}", symbol, price);
                    return price;
                }
                Err(e) => {
                    warn!("price feed failed for {symbol}: {e}");
                    // Serve stale over synthetic when we have anything cached.
                    if let Some(entry) = self.cache.get(symbol) {
                        return entry.0;
                    }
                }
            }
        }

        let fallback = FALLBACK_PRICES
            .get(&network.chain_id())
            .copied()
            .unwrap_or(1.0);
        warn!("using static fallback price for {symbol}: ${fallback}");
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFeed {
        calls: AtomicUsize,
        price: f64,
    }

    #[async_trait]
    impl NativePriceFeed for CountingFeed {
        async fn price_usd(&self, _symbol: &str) -> anyhow::Result<f64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.price)
        }
    }

    struct DeadFeed;

    #[async_trait]
    impl NativePriceFeed for DeadFeed {
        async fn price_usd(&self, _symbol: &str) -> anyhow::Result<f64> {
            anyhow::bail!("down")
        }
    }

    #[tokio::test]
    async fn cache_hit_avoids_refetch() {
        let feed = Arc::new(CountingFeed { calls: AtomicUsize::new(0), price: 2_500.0 });
        let cached = CachedPriceFeed::new(feed.clone(), Duration::from_secs(300));

        assert_eq!(cached.native_price_usd(Network::Ethereum).await, 2_500.0);
        assert_eq!(cached.native_price_usd(Network::Ethereum).await, 2_500.0);
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dead_feed_falls_back_to_static_table() {
        let cached = CachedPriceFeed::new(Arc::new(DeadFeed), Duration::from_secs(300));
        let price = cached.native_price_usd(Network::Bsc).await;
        assert_eq!(price, *FALLBACK_PRICES.get(&56).unwrap());
    }

    #[tokio::test]
    async fn fallback_only_uses_table() {
        let cached = CachedPriceFeed::fallback_only();
        assert_eq!(cached.native_price_usd(Network::Polygon).await, 0.8);
    }
}

//! Prometheus Metrics Registry - Placement Observability
//!
//! Counts trials and per-market attempts by outcome, orders placed per
//! venue and funding currency, venues excluded for the run, and cache
//! table sizes after each rebuild. Exposed as text on `/metrics`.

use prometheus::{Encoder, IntCounterVec, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::adapters::cache::RebuildStats;

/// Centralized Prometheus metrics for the bot.
///
/// All metrics follow the naming convention `mention_trader_*`.
pub struct MetricsRegistry {
    /// Prometheus registry.
    registry: Registry,
    /// Completed trials by terminal outcome.
    pub trials: IntCounterVec,
    /// Market attempts by venue and outcome.
    pub attempts: IntCounterVec,
    /// Accepted orders by venue and funding currency.
    pub orders_placed: IntCounterVec,
    /// Venues excluded for the rest of the run.
    pub excluded_venues: IntGauge,
    /// Row counts of the live cache.
    pub cache_rows: IntGaugeVec,
}

impl MetricsRegistry {
    /// Create and register all Prometheus metrics.
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let trials = IntCounterVec::new(
            Opts::new("mention_trader_trials_total", "Placement trials by outcome"),
            &["outcome"],
        )?;

        let attempts = IntCounterVec::new(
            Opts::new(
                "mention_trader_attempts_total",
                "Per-market placement attempts by venue and outcome",
            ),
            &["exchange", "outcome"],
        )?;

        let orders_placed = IntCounterVec::new(
            Opts::new("mention_trader_orders_placed_total", "Orders accepted by a venue"),
            &["exchange", "quote"],
        )?;

        let excluded_venues = IntGauge::new(
            "mention_trader_excluded_venues",
            "Venues excluded after a fatal error",
        )?;

        let cache_rows = IntGaugeVec::new(
            Opts::new("mention_trader_cache_rows", "Rows in the live market cache"),
            &["table"],
        )?;

        registry.register(Box::new(trials.clone()))?;
        registry.register(Box::new(attempts.clone()))?;
        registry.register(Box::new(orders_placed.clone()))?;
        registry.register(Box::new(excluded_venues.clone()))?;
        registry.register(Box::new(cache_rows.clone()))?;

        Ok(Self {
            registry,
            trials,
            attempts,
            orders_placed,
            excluded_venues,
            cache_rows,
        })
    }

    /// Record the sizes of a freshly rebuilt cache.
    pub fn record_rebuild(&self, stats: &RebuildStats) {
        let tables = [
            ("exchanges", stats.exchanges),
            ("currencies", stats.currencies),
            ("markets", stats.markets),
            ("exchange_markets", stats.listings),
        ];
        for (table, rows) in tables {
            self.cache_rows
                .with_label_values(&[table])
                .set(i64::try_from(rows).unwrap_or(i64::MAX));
        }
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_contains_recorded_values() {
        let metrics = MetricsRegistry::new().unwrap();
        metrics.trials.with_label_values(&["placed"]).inc();
        metrics
            .orders_placed
            .with_label_values(&["binance", "USDT"])
            .inc();
        metrics.record_rebuild(&RebuildStats {
            exchanges: 2,
            currencies: 10,
            markets: 7,
            listings: 9,
        });

        let text = metrics.encode().unwrap();
        assert!(text.contains("mention_trader_trials_total{outcome=\"placed\"} 1"));
        assert!(text.contains("mention_trader_orders_placed_total{exchange=\"binance\",quote=\"USDT\"} 1"));
        assert!(text.contains("mention_trader_cache_rows{table=\"exchange_markets\"} 9"));
    }
}

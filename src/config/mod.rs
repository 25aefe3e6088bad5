//! Configuration Module - TOML-based Bot Configuration
//!
//! Loads and validates configuration from `config.toml` with
//! environment variable overrides via `.env` files.
//! Venue credentials, funding currencies and per-trade notionals are
//! externalized here - nothing is hardcoded in the domain layer.

pub mod loader;

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

use crate::domain::market::normalize_symbol;

/// Top-level bot configuration.
///
/// Constructed once at startup and passed by reference into the
/// cache, resolver and placement engine constructors.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
  /// Bot identity and logging.
  pub bot: BotConfig,
  /// Outbound HTTP behaviour shared by all venues.
  #[serde(default)]
  pub api: ApiConfig,
  /// Market cache location.
  #[serde(default)]
  pub cache: CacheConfig,
  /// Metrics and health endpoints.
  #[serde(default)]
  pub metrics: MetricsConfig,
  /// Order sizing and funding currencies.
  pub order: OrderConfig,
  /// Per-venue settings keyed by venue name.
  #[serde(default)]
  pub exchanges: BTreeMap<String, ExchangeConfig>,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
  /// Human-readable bot name.
  pub name: String,
  /// Log level (trace, debug, info, warn, error).
  #[serde(default = "default_log_level")]
  pub log_level: String,
}

/// HTTP client configuration applied to every venue.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Bound on every venue call (milliseconds).
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Maximum in-flight requests per venue.
  #[serde(default = "default_max_concurrent")]
  pub max_concurrent: usize,
  /// Client-side request pacing per venue.
  #[serde(default = "default_requests_per_second")]
  pub requests_per_second: u32,
}

impl ApiConfig {
  pub const fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      timeout_ms: default_timeout_ms(),
      max_concurrent: default_max_concurrent(),
      requests_per_second: default_requests_per_second(),
    }
  }
}

/// Market cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// SQLite path, or `:memory:` for an in-process cache.
  #[serde(default = "default_cache_path")]
  pub path: String,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      path: default_cache_path(),
    }
  }
}

/// Metrics and monitoring configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
  /// Serve `/metrics`, `/live` and `/ready`.
  #[serde(default)]
  pub enabled: bool,
  /// Metrics server bind address.
  #[serde(default = "default_metrics_addr")]
  pub bind_address: String,
}

impl Default for MetricsConfig {
  fn default() -> Self {
    Self {
      enabled: false,
      bind_address: default_metrics_addr(),
    }
  }
}

/// Order sizing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderConfig {
  /// Fractional margin applied above the live price (0.05 = 5%).
  #[serde(default)]
  pub multiplier: Decimal,
  /// Funding currencies and the notional spent per trade in each.
  /// Document order is preference order.
  pub quote_currencies: QuoteCurrencies,
}

/// Per-venue configuration (`[exchanges.<name>]`).
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
  /// Whether the venue is used at all.
  #[serde(default = "default_true")]
  pub enabled: bool,
  /// Ascending preference; 0 disables the venue.
  #[serde(default)]
  pub priority: u32,
  /// API key (may be overridden by `<NAME>_API_KEY`).
  #[serde(default)]
  pub key: String,
  /// API secret (may be overridden by `<NAME>_API_SECRET`).
  #[serde(default)]
  pub secret: String,
  /// Apply `order.multiplier` to prices on this venue.
  #[serde(default)]
  pub use_multiplier: bool,
  /// Signed request validity window (milliseconds).
  #[serde(default = "default_recv_window", alias = "recvWindow")]
  pub recv_window: u64,
  /// Override of the venue's REST endpoint.
  #[serde(default)]
  pub base_url: Option<String>,
}

impl Default for ExchangeConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      priority: 0,
      key: String::new(),
      secret: String::new(),
      use_multiplier: false,
      recv_window: default_recv_window(),
      base_url: None,
    }
  }
}

impl ExchangeConfig {
  /// Enabled and with a non-zero priority.
  pub const fn is_active(&self) -> bool {
    self.enabled && self.priority > 0
  }
}

/// Funding currencies in preference order, each with its notional.
///
/// Deserialized from a TOML table; the table's key order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuoteCurrencies(Vec<(String, Decimal)>);

impl QuoteCurrencies {
  pub fn new(entries: impl IntoIterator<Item = (String, Decimal)>) -> Self {
    let mut out: Vec<(String, Decimal)> = Vec::new();
    for (symbol, notional) in entries {
      let symbol = normalize_symbol(&symbol);
      match out.iter_mut().find(|(s, _)| *s == symbol) {
        Some(existing) => existing.1 = notional,
        None => out.push((symbol, notional)),
      }
    }
    Self(out)
  }

  /// Symbols in preference order.
  pub fn symbols(&self) -> Vec<String> {
    self.0.iter().map(|(s, _)| s.clone()).collect()
  }

  /// Notional configured for `symbol` (case-insensitive).
  pub fn notional(&self, symbol: &str) -> Option<Decimal> {
    let symbol = normalize_symbol(symbol);
    self.0.iter().find(|(s, _)| *s == symbol).map(|(_, n)| *n)
  }

  /// Preference index of `symbol` (case-insensitive).
  pub fn rank(&self, symbol: &str) -> Option<usize> {
    let symbol = normalize_symbol(symbol);
    self.0.iter().position(|(s, _)| *s == symbol)
  }

  pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
    self.0.iter().map(|(s, n)| (s.as_str(), *n))
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

impl<'de> Deserialize<'de> for QuoteCurrencies {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct OrderedVisitor;

    impl<'de> Visitor<'de> for OrderedVisitor {
      type Value = QuoteCurrencies;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a table of funding currency symbols to notional amounts")
      }

      fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries = Vec::new();
        while let Some((symbol, notional)) = map.next_entry::<String, Decimal>()? {
          entries.push((symbol, notional));
        }
        Ok(QuoteCurrencies::new(entries))
      }
    }

    deserializer.deserialize_map(OrderedVisitor)
  }
}

// Default value functions for serde

fn default_log_level() -> String {
  "info".to_string()
}

const fn default_true() -> bool {
  true
}

const fn default_timeout_ms() -> u64 {
  10_000
}

const fn default_max_concurrent() -> usize {
  4
}

const fn default_requests_per_second() -> u32 {
  10
}

fn default_cache_path() -> String {
  ":memory:".to_string()
}

fn default_metrics_addr() -> String {
  "0.0.0.0:9090".to_string()
}

const fn default_recv_window() -> u64 {
  5_000
}

//! Venue Registry - Name to Adapter Constructor
//!
//! Maps configured exchange names to adapter constructors and turns the
//! `[exchanges.*]` configuration into priority-ordered `Venue` handles.
//! Adding a venue means adding one adapter module and one table entry.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::adapters::binance::BinanceAdapter;
use crate::adapters::bittrex::BittrexAdapter;
use crate::adapters::http::HttpClientConfig;
use crate::config::{ApiConfig, AppConfig, ExchangeConfig};
use crate::ports::exchange::ExchangeAdapter;

/// Builds an adapter from its resolved settings.
pub type AdapterConstructor = fn(&VenueSettings) -> Result<Arc<dyn ExchangeAdapter>>;

/// Every venue this build knows how to talk to.
static REGISTRY: &[(&str, AdapterConstructor)] = &[
    ("binance", BinanceAdapter::build),
    ("bittrex", BittrexAdapter::build),
];

/// Constructor registered under `name` (case-insensitive).
pub fn constructor(name: &str) -> Option<AdapterConstructor> {
    REGISTRY
        .iter()
        .find(|(registered, _)| registered.eq_ignore_ascii_case(name))
        .map(|(_, build)| *build)
}

/// Names of all registered venues.
pub fn registered_names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

/// Everything an adapter constructor needs.
#[derive(Clone)]
pub struct VenueSettings {
    pub name: String,
    pub key: Option<String>,
    pub secret: Option<String>,
    /// Signed request validity window (ms).
    pub recv_window: u64,
    /// Override of the adapter's default endpoint.
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub max_concurrent: usize,
    pub requests_per_second: u32,
}

impl VenueSettings {
    /// Settings with default HTTP limits and no credentials.
    pub fn new(name: impl Into<String>) -> Self {
        Self::from_config(name, &ExchangeConfig::default(), &ApiConfig::default())
    }

    pub fn from_config(name: impl Into<String>, exchange: &ExchangeConfig, api: &ApiConfig) -> Self {
        let non_empty = |value: &str| (!value.is_empty()).then(|| value.to_string());

        Self {
            name: name.into(),
            key: non_empty(&exchange.key),
            secret: non_empty(&exchange.secret),
            recv_window: exchange.recv_window,
            base_url: exchange.base_url.clone(),
            timeout: api.timeout(),
            max_concurrent: api.max_concurrent,
            requests_per_second: api.requests_per_second,
        }
    }

    /// Whether both halves of the credentials are present.
    pub const fn has_credentials(&self) -> bool {
        self.key.is_some() && self.secret.is_some()
    }

    /// HTTP client configuration, falling back to `default_base_url`.
    pub fn http_config(&self, default_base_url: &str) -> HttpClientConfig {
        HttpClientConfig {
            base_url: self
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url.to_string()),
            timeout: self.timeout,
            max_concurrent: self.max_concurrent,
            requests_per_second: self.requests_per_second,
        }
    }
}

impl fmt::Debug for VenueSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VenueSettings")
            .field("name", &self.name)
            .field("has_credentials", &self.has_credentials())
            .field("recv_window", &self.recv_window)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// An enabled venue, ready for the cache and the placement engine.
#[derive(Clone)]
pub struct Venue {
    pub name: String,
    /// Ascending preference, always > 0.
    pub priority: u32,
    /// Apply `order.multiplier` to prices fetched from this venue.
    pub use_multiplier: bool,
    pub adapter: Arc<dyn ExchangeAdapter>,
}

impl Venue {
    pub fn new(
        name: impl Into<String>,
        priority: u32,
        use_multiplier: bool,
        adapter: Arc<dyn ExchangeAdapter>,
    ) -> Self {
        Self {
            name: name.into(),
            priority,
            use_multiplier,
            adapter,
        }
    }
}

impl fmt::Debug for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Venue")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .field("use_multiplier", &self.use_multiplier)
            .finish_non_exhaustive()
    }
}

/// Sort venues by `(priority, name)`.
pub fn sort_venues(venues: &mut [Venue]) {
    venues.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
}

/// Build adapters for every active, registered venue in `config`.
///
/// Disabled venues and priority 0 are skipped silently; unknown names
/// are skipped with a warning; missing credentials only degrade the
/// venue to read-only.
///
/// # Errors
/// Fails if an adapter constructor fails (e.g. HTTP client setup).
pub fn build_venues(config: &AppConfig) -> Result<Vec<Venue>> {
    let mut venues = Vec::new();

    for (name, exchange) in &config.exchanges {
        if !exchange.is_active() {
            info!(exchange = %name, "Exchange disabled, skipping");
            continue;
        }

        let Some(build) = constructor(name) else {
            warn!(
                exchange = %name,
                known = ?registered_names().collect::<Vec<_>>(),
                "No adapter registered for exchange, skipping"
            );
            continue;
        };

        let settings = VenueSettings::from_config(name.as_str(), exchange, &config.api);
        if !settings.has_credentials() {
            warn!(exchange = %name, "Missing API key or secret; orders on this venue will fail");
        }

        let adapter =
            build(&settings).with_context(|| format!("Failed to build adapter for {name}"))?;
        venues.push(Venue::new(
            name.to_ascii_lowercase(),
            exchange.priority,
            exchange.use_multiplier,
            adapter,
        ));
    }

    sort_venues(&mut venues);

    info!(
        venues = ?venues.iter().map(|v| v.name.as_str()).collect::<Vec<_>>(),
        "Venues ready"
    );
    Ok(venues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;

    #[test]
    fn test_constructor_lookup_is_case_insensitive() {
        assert!(constructor("binance").is_some());
        assert!(constructor("Bittrex").is_some());
        assert!(constructor("kraken").is_none());
    }

    #[test]
    fn test_settings_treat_empty_credentials_as_missing() {
        let exchange = ExchangeConfig {
            key: "k".to_string(),
            ..ExchangeConfig::default()
        };
        let settings = VenueSettings::from_config("binance", &exchange, &ApiConfig::default());
        assert_eq!(settings.key.as_deref(), Some("k"));
        assert_eq!(settings.secret, None);
        assert!(!settings.has_credentials());
        assert!(!format!("{settings:?}").contains("\"k\""));
    }

    #[test]
    fn test_http_config_prefers_override() {
        let mut settings = VenueSettings::new("binance");
        assert_eq!(settings.http_config("https://a").base_url, "https://a");
        settings.base_url = Some("http://localhost:8080".to_string());
        assert_eq!(settings.http_config("https://a").base_url, "http://localhost:8080");
    }

    #[test]
    fn test_build_venues_filters_and_sorts() {
        let config = parse_config(
            r#"
            [bot]
            name = "test"

            [order.quote_currencies]
            BTC = 0.001

            [exchanges.kraken]
            priority = 1

            [exchanges.bittrex]
            priority = 1

            [exchanges.binance]
            priority = 1

            [exchanges.disabled]
            enabled = false
            priority = 1
            "#,
        )
        .unwrap();

        let venues = build_venues(&config).unwrap();
        let names: Vec<&str> = venues.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["binance", "bittrex"]);
    }
}

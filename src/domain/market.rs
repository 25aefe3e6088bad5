//! Market catalog domain types.
//!
//! Normalized view of what trading venues list: currencies, markets
//! (one canonical market per base/quote pair) and the exchanges that
//! expose them. Venue adapters translate their own catalogs into these
//! types; nothing venue-specific leaks past this boundary.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical form of a currency symbol: trimmed and uppercased.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

/// A currency known to at least one venue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// Canonical uppercase symbol, unique across the cache.
    pub symbol: String,
    /// Display name (e.g. "Dogecoin"), when a venue publishes one.
    pub name: Option<String>,
    /// Number of decimal digits the venue works with, learned lazily.
    pub precision: Option<u32>,
}

impl Currency {
    /// Create a currency with only its symbol known.
    pub fn new(symbol: &str) -> Self {
        Self {
            symbol: normalize_symbol(symbol),
            name: None,
            precision: None,
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a decimal precision.
    #[must_use]
    pub const fn with_precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// A tradable pair as listed by one venue.
///
/// `symbol` is the venue-local traded symbol (`DOGEBTC` on Binance,
/// `DOGE-BTC` on Bittrex); the canonical identity of the market is the
/// `(base, quote)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Market {
    /// Venue-local symbol used when talking to the venue.
    pub symbol: String,
    /// Currency being bought.
    pub base: Currency,
    /// Currency spent.
    pub quote: Currency,
    /// Minimum quantity increment, if the venue enforces one.
    pub step: Option<Decimal>,
}

impl Market {
    pub fn new(
        symbol: impl Into<String>,
        base: Currency,
        quote: Currency,
        step: Option<Decimal>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            base,
            quote,
            step,
        }
    }

    /// Venue-independent name: `BASE/QUOTE`.
    pub fn canonical_name(&self) -> String {
        format!("{}/{}", self.base.symbol, self.quote.symbol)
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.symbol, self.base, self.quote)
    }
}

/// A trading venue as recorded in the cache.
///
/// Priority orders venues ascending; priority 0 means the venue is
/// disabled and never appears in the cache or in resolution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Exchange {
    pub name: String,
    pub priority: u32,
}

impl Exchange {
    pub fn new(name: impl Into<String>, priority: u32) -> Self {
        Self {
            name: name.into(),
            priority,
        }
    }

    /// Whether the venue takes part in caching and resolution.
    pub const fn is_enabled(&self) -> bool {
        self.priority > 0
    }
}

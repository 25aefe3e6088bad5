//! Market Resolver - Candidate Markets for a Base Currency
//!
//! Turns a base currency symbol into the ordered list of markets the
//! placement engine will try:
//! - only quotes from the funding allow-list survive
//! - venues in ascending priority (ties by name)
//! - within a venue, markets by funding preference (ties by insertion)
//!
//! Resolution is a pure read of the cache; identical cache contents and
//! configuration always give identical results.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, error, instrument, warn};

use crate::adapters::cache::{ListingRow, MarketCache};
use crate::config::{OrderConfig, QuoteCurrencies};
use crate::domain::market::{Market, normalize_symbol};
use crate::error::CacheError;

/// Candidate markets on one venue, in trial order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VenueMarkets {
  pub exchange: String,
  pub priority: u32,
  pub markets: Vec<Market>,
}

/// Resolver output: venues in trial order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedMarkets {
  venues: Vec<VenueMarkets>,
}

impl ResolvedMarkets {
  pub fn new(venues: Vec<VenueMarkets>) -> Self {
    Self { venues }
  }

  pub fn venues(&self) -> &[VenueMarkets] {
    &self.venues
  }

  pub fn is_empty(&self) -> bool {
    self.venues.is_empty()
  }

  /// Total number of (venue, market) candidates.
  pub fn market_count(&self) -> usize {
    self.venues.iter().map(|v| v.markets.len()).sum()
  }

  pub fn get(&self, exchange: &str) -> Option<&VenueMarkets> {
    self.venues.iter().find(|v| v.exchange == exchange)
  }

  /// `(exchange, venue symbol)` pairs in trial order.
  pub fn trial_order(&self) -> Vec<(String, String)> {
    self
      .venues
      .iter()
      .flat_map(|v| {
        v.markets
          .iter()
          .map(|m| (v.exchange.clone(), m.symbol.clone()))
      })
      .collect()
  }
}

/// Resolves base currencies against the market cache.
pub struct MarketResolver {
  cache: Arc<MarketCache>,
  /// Funding allow-list in preference order.
  quotes: QuoteCurrencies,
}

impl MarketResolver {
  pub fn new(cache: Arc<MarketCache>, order: &OrderConfig) -> Self {
    Self {
      cache,
      quotes: order.quote_currencies.clone(),
    }
  }

  pub fn quote_currencies(&self) -> &QuoteCurrencies {
    &self.quotes
  }

  /// Candidate markets for `base`, grouped by venue in trial order.
  ///
  /// Never fails: an unready or unreadable cache resolves to nothing,
  /// and listings the cache cannot materialize are skipped.
  #[instrument(skip(self))]
  pub fn resolve(&self, base: &str) -> ResolvedMarkets {
    let base = normalize_symbol(base);
    if base.is_empty() {
      return ResolvedMarkets::default();
    }

    let rows = match self.cache.listings_for_base(&base, &self.quotes.symbols()) {
      Ok(rows) => rows,
      Err(CacheError::NotReady) => {
        warn!(base = %base, "Market cache not ready, nothing to resolve");
        return ResolvedMarkets::default();
      }
      Err(e) => {
        error!(base = %base, error = %e, "Market cache query failed");
        return ResolvedMarkets::default();
      }
    };

    let mut venues: Vec<VenueMarkets> = Vec::new();
    for row in rows {
      if self.quotes.rank(&row.quote_symbol).is_none() {
        continue;
      }
      let Some(market) = materialize(&row) else {
        continue;
      };

      match venues.last_mut() {
        Some(venue) if venue.exchange == row.exchange => venue.markets.push(market),
        _ => venues.push(VenueMarkets {
          exchange: row.exchange,
          priority: row.priority,
          markets: vec![market],
        }),
      }
    }

    // Rows arrive by (priority, name); keep that, only enforce it.
    venues.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.exchange.cmp(&b.exchange)));
    for venue in &mut venues {
      venue
        .markets
        .sort_by_key(|m| self.quotes.rank(&m.quote.symbol).unwrap_or(usize::MAX));
    }

    let resolved = ResolvedMarkets::new(venues);
    debug!(
      base = %base,
      venues = resolved.venues().len(),
      markets = resolved.market_count(),
      "Markets resolved"
    );
    resolved
  }
}

/// Build a `Market` from a cache row, or skip it with a warning.
fn materialize(row: &ListingRow) -> Option<Market> {
  let (Some(base), Some(quote)) = (row.base.clone(), row.quote.clone()) else {
    warn!(
      exchange = %row.exchange,
      symbol = %row.venue_symbol,
      base = %row.base_symbol,
      quote = %row.quote_symbol,
      "Cache inconsistency: listing references a missing currency, skipping"
    );
    return None;
  };

  let step = match row.step.as_deref() {
    None => None,
    Some(raw) => match Decimal::from_str(raw) {
      Ok(step) if step > Decimal::ZERO => Some(step),
      _ => {
        warn!(
          exchange = %row.exchange,
          symbol = %row.venue_symbol,
          step = raw,
          "Cache inconsistency: unparsable step size, skipping"
        );
        return None;
      }
    },
  };

  Some(Market::new(row.venue_symbol.clone(), base, quote, step))
}

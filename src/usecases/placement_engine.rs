//! Placement Engine - First-success Order Placement Across Venues
//!
//! Runs one trial per detected base currency:
//! - resolve candidate markets (venues by priority, markets by funding
//!   preference)
//! - per market: live price, optional margin, quantized quantity, submit
//! - stop at the first accepted order
//!
//! A trial is strictly sequential, so at most one order is placed per
//! event. Each adapter call is bounded by the configured timeout.
//! Authentication and ban errors exclude the venue for the rest of the
//! run; every other failure only skips the market at hand.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rust_decimal::Decimal;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

use super::market_resolver::MarketResolver;
use crate::adapters::metrics::MetricsRegistry;
use crate::adapters::registry::Venue;
use crate::config::{AppConfig, QuoteCurrencies};
use crate::domain::market::{Market, normalize_symbol};
use crate::domain::quantity::{adjust_price, order_quantity};
use crate::error::VenueError;

/// Result of trying one market.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
  /// The venue accepted the order. Terminal.
  Placed { venue_order_id: Option<String> },
  /// Price fetch failed or timed out; market skipped.
  PriceUnavailable { error: String },
  /// Notional buys less than one step at this price; market skipped.
  QuantityTooSmall,
  /// Quote currency has no configured notional; market skipped.
  QuoteNotConfigured,
  /// Venue refused the order or did not answer in time; market skipped.
  Rejected { detail: String },
  /// Authentication or ban; venue excluded for the run.
  Fatal { error: String },
}

impl AttemptOutcome {
  /// Short label for logs and metrics.
  pub const fn label(&self) -> &'static str {
    match self {
      Self::Placed { .. } => "placed",
      Self::PriceUnavailable { .. } => "price_unavailable",
      Self::QuantityTooSmall => "quantity_too_small",
      Self::QuoteNotConfigured => "quote_not_configured",
      Self::Rejected { .. } => "rejected",
      Self::Fatal { .. } => "fatal",
    }
  }
}

/// One (venue, market) attempt of a trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
  pub exchange: String,
  /// Venue-local symbol.
  pub market: String,
  pub quote: String,
  /// Adjusted price, once fetched.
  pub price: Option<Decimal>,
  /// Submitted quantity, once computed.
  pub quantity: Option<Decimal>,
  pub outcome: AttemptOutcome,
}

/// Terminal state of a trial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrialOutcome {
  /// An order was accepted on `exchange` / `market`.
  Placed { exchange: String, market: String },
  /// Every candidate failed.
  Exhausted,
  /// The resolver returned nothing.
  NoMarkets,
}

impl TrialOutcome {
  pub const fn label(&self) -> &'static str {
    match self {
      Self::Placed { .. } => "placed",
      Self::Exhausted => "exhausted",
      Self::NoMarkets => "no_markets",
    }
  }
}

/// Full record of a trial, in attempt order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrialReport {
  pub base: String,
  pub attempts: Vec<Attempt>,
  pub outcome: TrialOutcome,
}

impl TrialReport {
  pub const fn succeeded(&self) -> bool {
    matches!(self.outcome, TrialOutcome::Placed { .. })
  }

  /// `(exchange, market)` pairs in the order they were tried.
  pub fn attempted(&self) -> Vec<(String, String)> {
    self
      .attempts
      .iter()
      .map(|a| (a.exchange.clone(), a.market.clone()))
      .collect()
  }
}

impl fmt::Display for TrialReport {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}: {} after {} attempt(s)",
      self.base,
      self.outcome.label(),
      self.attempts.len()
    )
  }
}

/// Sequential first-success order placement.
pub struct PlacementEngine {
  resolver: MarketResolver,
  /// Venues by name.
  venues: HashMap<String, Venue>,
  /// Funding currencies and notionals.
  quotes: QuoteCurrencies,
  /// Margin for venues with `use_multiplier`.
  multiplier: Decimal,
  /// Bound on every adapter call.
  call_timeout: Duration,
  /// Venues dropped after a fatal error, for the rest of the run.
  excluded: Mutex<BTreeSet<String>>,
  metrics: Option<Arc<MetricsRegistry>>,
}

impl PlacementEngine {
  /// Create a new placement engine.
  pub fn new(resolver: MarketResolver, venues: Vec<Venue>, config: &AppConfig) -> Self {
    Self {
      resolver,
      venues: venues.into_iter().map(|v| (v.name.clone(), v)).collect(),
      quotes: config.order.quote_currencies.clone(),
      multiplier: config.order.multiplier,
      call_timeout: config.api.timeout(),
      excluded: Mutex::new(BTreeSet::new()),
      metrics: None,
    }
  }

  /// Record trials and attempts in `metrics`.
  #[must_use]
  pub fn with_metrics(mut self, metrics: Arc<MetricsRegistry>) -> Self {
    self.metrics = Some(metrics);
    self
  }

  /// Venues excluded so far, sorted by name.
  pub fn excluded_venues(&self) -> Vec<String> {
    self.excluded.lock().iter().cloned().collect()
  }

  pub fn is_excluded(&self, venue: &str) -> bool {
    self.excluded.lock().contains(venue)
  }

  /// Try to buy `base`; `true` once one order has been accepted.
  pub async fn place(&self, base: &str) -> bool {
    self.run_trial(base).await.succeeded()
  }

  /// Run one trial and report every attempt.
  #[instrument(skip(self))]
  pub async fn run_trial(&self, base: &str) -> TrialReport {
    let base = normalize_symbol(base);
    let resolved = self.resolver.resolve(&base);
    let mut attempts = Vec::with_capacity(resolved.market_count());

    if resolved.is_empty() {
      info!(base = %base, "No tradable market for currency");
      return self.finish(base, attempts, TrialOutcome::NoMarkets);
    }

    for candidates in resolved.venues() {
      let Some(venue) = self.venues.get(&candidates.exchange) else {
        warn!(exchange = %candidates.exchange, "Resolved venue has no adapter, skipping");
        continue;
      };

      for market in &candidates.markets {
        if self.is_excluded(&venue.name) {
          debug!(exchange = %venue.name, "Venue excluded, skipping its remaining markets");
          break;
        }

        let attempt = self.attempt(venue, market).await;
        self.record_attempt(&attempt);

        let placed = matches!(attempt.outcome, AttemptOutcome::Placed { .. });
        attempts.push(attempt);

        if placed {
          let outcome = TrialOutcome::Placed {
            exchange: venue.name.clone(),
            market: market.symbol.clone(),
          };
          return self.finish(base, attempts, outcome);
        }
      }
    }

    self.finish(base, attempts, TrialOutcome::Exhausted)
  }

  /// Price, size and submit on one market.
  async fn attempt(&self, venue: &Venue, market: &Market) -> Attempt {
    let mut attempt = Attempt {
      exchange: venue.name.clone(),
      market: market.symbol.clone(),
      quote: market.quote.symbol.clone(),
      price: None,
      quantity: None,
      outcome: AttemptOutcome::QuoteNotConfigured,
    };

    let Some(notional) = self.quotes.notional(&market.quote.symbol) else {
      return attempt;
    };

    let price = match timeout(self.call_timeout, venue.adapter.ticker_price(market)).await {
      Ok(Ok(price)) => price,
      Ok(Err(e)) if e.is_fatal() => {
        self.exclude(&venue.name, &e);
        attempt.outcome = AttemptOutcome::Fatal { error: e.to_string() };
        return attempt;
      }
      Ok(Err(e)) => {
        attempt.outcome = AttemptOutcome::PriceUnavailable { error: e.to_string() };
        return attempt;
      }
      Err(_) => {
        attempt.outcome = AttemptOutcome::PriceUnavailable {
          error: VenueError::Timeout.to_string(),
        };
        return attempt;
      }
    };

    let multiplier = venue.use_multiplier.then_some(self.multiplier);
    let Some(adjusted) = adjust_price(price, multiplier, market.quote.precision) else {
      attempt.outcome = AttemptOutcome::PriceUnavailable {
        error: format!("adjusted price out of range for {price}"),
      };
      return attempt;
    };
    attempt.price = Some(adjusted);

    let Some(quantity) = order_quantity(notional, adjusted, market.step, market.base.precision) else {
      attempt.outcome = AttemptOutcome::QuantityTooSmall;
      return attempt;
    };
    attempt.quantity = Some(quantity);

    attempt.outcome =
      match timeout(self.call_timeout, venue.adapter.place_buy_order(market, quantity)).await {
        Ok(Ok(placement)) if placement.success => AttemptOutcome::Placed {
          venue_order_id: placement.venue_order_id,
        },
        Ok(Ok(placement)) => AttemptOutcome::Rejected {
          detail: placement.detail.unwrap_or_default(),
        },
        Ok(Err(e)) if e.is_fatal() => {
          self.exclude(&venue.name, &e);
          AttemptOutcome::Fatal { error: e.to_string() }
        }
        Ok(Err(e)) => AttemptOutcome::Rejected { detail: e.to_string() },
        Err(_) => AttemptOutcome::Rejected {
          detail: VenueError::Timeout.to_string(),
        },
      };

    attempt
  }

  fn exclude(&self, venue: &str, cause: &VenueError) {
    let count = {
      let mut excluded = self.excluded.lock();
      excluded.insert(venue.to_string());
      excluded.len()
    };

    error!(
      exchange = %venue,
      kind = cause.kind(),
      error = %cause,
      "Fatal venue error, excluding venue for the rest of the run"
    );

    if let Some(metrics) = &self.metrics {
      metrics
        .excluded_venues
        .set(i64::try_from(count).unwrap_or(i64::MAX));
    }
  }

  fn record_attempt(&self, attempt: &Attempt) {
    let outcome = attempt.outcome.label();
    match &attempt.outcome {
      AttemptOutcome::Placed { venue_order_id } => info!(
        exchange = %attempt.exchange,
        market = %attempt.market,
        price = ?attempt.price,
        quantity = ?attempt.quantity,
        venue_order_id = ?venue_order_id,
        outcome,
        "Order placed"
      ),
      AttemptOutcome::PriceUnavailable { error } => warn!(
        exchange = %attempt.exchange,
        market = %attempt.market,
        error = %error,
        outcome,
        "Price unavailable, trying next market"
      ),
      AttemptOutcome::Rejected { detail } => warn!(
        exchange = %attempt.exchange,
        market = %attempt.market,
        price = ?attempt.price,
        quantity = ?attempt.quantity,
        detail = %detail,
        outcome,
        "Order rejected, trying next market"
      ),
      AttemptOutcome::Fatal { .. }
      | AttemptOutcome::QuantityTooSmall
      | AttemptOutcome::QuoteNotConfigured => info!(
        exchange = %attempt.exchange,
        market = %attempt.market,
        price = ?attempt.price,
        outcome,
        "Market skipped"
      ),
    }

    if let Some(metrics) = &self.metrics {
      metrics
        .attempts
        .with_label_values(&[attempt.exchange.as_str(), outcome])
        .inc();
      if matches!(attempt.outcome, AttemptOutcome::Placed { .. }) {
        metrics
          .orders_placed
          .with_label_values(&[attempt.exchange.as_str(), attempt.quote.as_str()])
          .inc();
      }
    }
  }

  fn finish(&self, base: String, attempts: Vec<Attempt>, outcome: TrialOutcome) -> TrialReport {
    match &outcome {
      TrialOutcome::Placed { exchange, market } => {
        info!(base = %base, exchange = %exchange, market = %market, attempts = attempts.len(), "Trial succeeded");
      }
      TrialOutcome::Exhausted => {
        warn!(base = %base, attempts = attempts.len(), "All venues exhausted, no order placed");
      }
      TrialOutcome::NoMarkets => {}
    }

    if let Some(metrics) = &self.metrics {
      metrics.trials.with_label_values(&[outcome.label()]).inc();
    }

    TrialReport {
      base,
      attempts,
      outcome,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_labels_are_distinct() {
    let outcomes = [
      AttemptOutcome::Placed { venue_order_id: None },
      AttemptOutcome::PriceUnavailable { error: String::new() },
      AttemptOutcome::QuantityTooSmall,
      AttemptOutcome::QuoteNotConfigured,
      AttemptOutcome::Rejected { detail: String::new() },
      AttemptOutcome::Fatal { error: String::new() },
    ];
    let labels: BTreeSet<&str> = outcomes.iter().map(AttemptOutcome::label).collect();
    assert_eq!(labels.len(), outcomes.len());
  }

  #[test]
  fn test_report_display_and_success() {
    let report = TrialReport {
      base: "DOGE".to_string(),
      attempts: Vec::new(),
      outcome: TrialOutcome::Exhausted,
    };
    assert!(!report.succeeded());
    assert_eq!(report.to_string(), "DOGE: exhausted after 0 attempt(s)");
  }
}

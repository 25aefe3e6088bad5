//! Exchange Port - Venue Capability Interface
//!
//! Defines the capability set every trading venue adapter provides.
//! Adapters own authentication, request formatting and translation of
//! venue errors into `VenueError`; no venue-specific type crosses
//! this boundary.
//!
//! Key design decisions:
//! - Catalog reads never fail loudly (empty list + log)
//! - Price reads and submissions return classified errors
//! - No shared mutable state between venues

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::market::Market;
use crate::error::VenueError;

/// Result of a buy order submission the venue answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderPlacement {
  /// Whether the venue accepted the order.
  pub success: bool,
  /// Venue-assigned order identifier.
  pub venue_order_id: Option<String>,
  /// Venue status or rejection reason.
  pub detail: Option<String>,
}

impl OrderPlacement {
  /// An accepted order.
  pub fn accepted(venue_order_id: impl Into<String>, detail: Option<String>) -> Self {
    Self {
      success: true,
      venue_order_id: Some(venue_order_id.into()),
      detail,
    }
  }

  /// A rejected order.
  pub fn rejected(detail: impl Into<String>) -> Self {
    Self {
      success: false,
      venue_order_id: None,
      detail: Some(detail.into()),
    }
  }
}

/// Trait for trading venue adapters.
///
/// One implementation per venue. Implementations are constructed once
/// at startup through the venue registry and shared behind `Arc`.
#[async_trait]
pub trait ExchangeAdapter: Send + Sync + 'static {
  /// Fetch every tradable market the venue lists.
  ///
  /// Returns an empty list (and logs) when the venue cannot be reached
  /// or answers with an error. Has no side effects beyond the request.
  async fn fetch_markets(&self) -> Vec<Market>;

  /// Current asking price for `market`, in its quote currency.
  ///
  /// # Errors
  /// Classified `VenueError` on rate limiting, timeouts, malformed
  /// responses, or authentication / ban responses.
  async fn ticker_price(&self, market: &Market) -> Result<Decimal, VenueError>;

  /// Submit a market buy of `quantity` units of the base currency.
  ///
  /// # Errors
  /// `VenueError::MissingCredentials` when the adapter runs without
  /// credentials, otherwise the classified venue failure.
  async fn place_buy_order(
    &self,
    market: &Market,
    quantity: Decimal,
  ) -> Result<OrderPlacement, VenueError>;
}

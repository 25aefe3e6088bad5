//! Currency Detector Port - Free Text to Cached Currency
//!
//! The detector turns a free-text mention into a currency the market
//! cache knows about. Its matching heuristic is its own business; the
//! output contract is strict: either nothing, or a `Currency` whose
//! symbol is exactly a cached currency symbol.

use crate::domain::market::Currency;

/// Trait for currency detectors.
pub trait CurrencyDetector: Send + Sync {
  /// Find the currency mentioned in `text`, if any.
  fn detect(&self, text: &str) -> Option<Currency>;
}

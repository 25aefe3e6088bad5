//! Currency Detector - Cache-backed Mention Matching
//!
//! Matches free text against a snapshot of the cache's currency table.
//! Matching order:
//! 1. display names, case-insensitive whole words, longest name first
//! 2. `$SYMBOL` cashtags, case-insensitive
//! 3. uppercase whole-word symbols of two or more characters
//!
//! Funding currencies are never reported: a mention of BTC next to
//! DOGE is about DOGE. Every result is a cached currency verbatim.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::adapters::cache::MarketCache;
use crate::config::OrderConfig;
use crate::domain::market::{Currency, normalize_symbol};
use crate::error::CacheError;
use crate::ports::detector::CurrencyDetector;

const MIN_SYMBOL_LEN: usize = 2;

/// Detector over a fixed set of currencies.
pub struct CacheCurrencyDetector {
  /// Lowercase name words and currency, longest name first.
  names: Vec<(Vec<String>, Currency)>,
  /// Currencies by symbol.
  symbols: HashMap<String, Currency>,
  /// Symbols never reported.
  ignored: HashSet<String>,
}

impl CacheCurrencyDetector {
  pub fn new(currencies: Vec<Currency>, ignored: impl IntoIterator<Item = String>) -> Self {
    let mut names: Vec<(Vec<String>, Currency)> = currencies
      .iter()
      .filter_map(|c| {
        let words = words(c.name.as_deref()?)
          .map(str::to_lowercase)
          .collect::<Vec<_>>();
        (!words.is_empty()).then(|| (words, c.clone()))
      })
      .collect();

    // Longest first; ties by symbol for a stable order.
    names.sort_by(|(a, ca), (b, cb)| {
      let len = |w: &[String]| w.iter().map(String::len).sum::<usize>() + w.len();
      len(b).cmp(&len(a)).then_with(|| ca.symbol.cmp(&cb.symbol))
    });

    Self {
      names,
      symbols: currencies.into_iter().map(|c| (c.symbol.clone(), c)).collect(),
      ignored: ignored.into_iter().map(|s| normalize_symbol(&s)).collect(),
    }
  }

  /// Snapshot the cache, ignoring the configured funding currencies.
  ///
  /// # Errors
  /// `CacheError::NotReady` before the first rebuild.
  pub fn from_cache(cache: &MarketCache, order: &OrderConfig) -> Result<Self, CacheError> {
    let currencies = cache.currencies()?;
    debug!(currencies = currencies.len(), "Detector snapshot taken");
    Ok(Self::new(currencies, order.quote_currencies.symbols()))
  }

  pub fn len(&self) -> usize {
    self.symbols.len()
  }

  pub fn is_empty(&self) -> bool {
    self.symbols.is_empty()
  }

  fn by_name(&self, text: &str) -> Option<&Currency> {
    let tokens: Vec<String> = words(text).map(str::to_lowercase).collect();

    self
      .names
      .iter()
      .filter(|(_, currency)| !self.ignored.contains(&currency.symbol))
      .find(|(name, _)| tokens.windows(name.len()).any(|window| window == name.as_slice()))
      .map(|(_, currency)| currency)
  }

  fn by_cashtag(&self, text: &str) -> Option<&Currency> {
    text
      .split('$')
      .skip(1)
      .filter_map(|rest| {
        let tag: String = rest.chars().take_while(|c| c.is_ascii_alphanumeric()).collect();
        self.lookup(&tag)
      })
      .next()
  }

  fn by_symbol(&self, text: &str) -> Option<&Currency> {
    words(text)
      .filter(|w| w.chars().count() >= MIN_SYMBOL_LEN)
      .filter(|w| w.chars().any(|c| c.is_ascii_uppercase()))
      .filter(|w| !w.chars().any(char::is_lowercase))
      .find_map(|w| self.lookup(w))
  }

  fn lookup(&self, symbol: &str) -> Option<&Currency> {
    let symbol = normalize_symbol(symbol);
    if symbol.is_empty() || self.ignored.contains(&symbol) {
      return None;
    }
    self.symbols.get(&symbol)
  }
}

impl CurrencyDetector for CacheCurrencyDetector {
  fn detect(&self, text: &str) -> Option<Currency> {
    let found = self
      .by_name(text)
      .or_else(|| self.by_cashtag(text))
      .or_else(|| self.by_symbol(text))
      .cloned();

    debug!(symbol = ?found.as_ref().map(|c| c.symbol.as_str()), "Currency detection");
    found
  }
}

/// Alphanumeric words of `text`.
fn words(text: &str) -> impl Iterator<Item = &str> {
  text
    .split(|c: char| !c.is_alphanumeric())
    .filter(|w| !w.is_empty())
}

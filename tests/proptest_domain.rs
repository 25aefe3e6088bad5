//! Property-Based Tests - Sizing and Resolution Invariants
//!
//! Uses `proptest` to verify that quantity sizing and market resolution
//! maintain their invariants across random inputs and catalogs.

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;

use mention_trader::adapters::cache::{MarketCache, VenueCatalog};
use mention_trader::config::{OrderConfig, QuoteCurrencies};
use mention_trader::domain::market::{Currency, Exchange, Market};
use mention_trader::domain::quantity::{adjust_price, order_quantity};
use mention_trader::usecases::MarketResolver;

const BASES: [&str; 3] = ["DOGE", "ETH", "SHIB"];
const QUOTES: [&str; 5] = ["USDT", "BTC", "ETH", "EUR", "BNB"];

fn decimal(mantissa: u64, scale: u32) -> Decimal {
    Decimal::new(i64::try_from(mantissa).unwrap(), scale)
}

/// Random venue catalogs: up to 4 venues, each listing (base, quote)
/// pairs drawn from the fixed symbol sets, duplicates included.
fn catalogs() -> impl Strategy<Value = Vec<VenueCatalog>> {
    prop::collection::vec(
        (
            0u32..4,
            prop::collection::vec((0..BASES.len(), 0..QUOTES.len(), any::<bool>()), 0..10),
        ),
        0..5,
    )
    .prop_map(|venues| {
        venues
            .into_iter()
            .enumerate()
            .map(|(i, (priority, pairs))| VenueCatalog {
                exchange: Exchange::new(format!("venue{i}"), priority),
                markets: pairs
                    .into_iter()
                    .filter(|(b, q, _)| BASES[*b] != QUOTES[*q])
                    .map(|(b, q, stepped)| {
                        Market::new(
                            format!("{}-{}-{i}", BASES[b], QUOTES[q]),
                            Currency::new(BASES[b]),
                            Currency::new(QUOTES[q]),
                            stepped.then(|| Decimal::new(1, 2)),
                        )
                    })
                    .collect(),
            })
            .collect()
    })
}

/// Random allow-list: a shuffled subset of the quote symbols.
fn allow_list() -> impl Strategy<Value = Vec<&'static str>> {
    prop::sample::subsequence(QUOTES.to_vec(), 1..=QUOTES.len()).prop_shuffle()
}

fn order(quotes: &[&str]) -> OrderConfig {
    OrderConfig {
        multiplier: Decimal::ZERO,
        quote_currencies: QuoteCurrencies::new(
            quotes.iter().map(|q| ((*q).to_string(), Decimal::ONE_HUNDRED)),
        ),
    }
}

fn resolver(catalogs: &[VenueCatalog], quotes: &[&str]) -> MarketResolver {
    let cache = MarketCache::in_memory();
    cache.rebuild_from(catalogs).unwrap();
    MarketResolver::new(Arc::new(cache), &order(quotes))
}

// ── Quantity Sizing Properties ──────────────────────────────

proptest! {
    /// Spend never exceeds the notional: quantization never rounds up.
    #[test]
    fn quantity_spend_never_exceeds_notional(
        notional in 1u64..10_000_000,
        notional_scale in 0u32..6,
        price in 1u64..1_000_000_000,
        price_scale in 0u32..10,
        step in prop::option::of((1u64..1_000, 0u32..8)),
        base_precision in prop::option::of(0u32..10),
    ) {
        let notional = decimal(notional, notional_scale);
        let price = decimal(price, price_scale);
        let step = step.map(|(m, s)| decimal(m, s));

        if let Some(quantity) = order_quantity(notional, price, step, base_precision) {
            prop_assert!(quantity > Decimal::ZERO);
            prop_assert!(
                quantity * price <= notional,
                "{quantity} x {price} exceeds {notional}"
            );
            if let Some(step) = step {
                prop_assert_eq!((quantity / step).fract(), Decimal::ZERO);
            }
        }
    }

    /// A margin and upward rounding never lower the price.
    #[test]
    fn adjusted_price_never_below_live_price(
        price in 1u64..1_000_000_000,
        price_scale in 0u32..10,
        margin in 0u64..500,
        precision in prop::option::of(0u32..10),
    ) {
        let price = decimal(price, price_scale);
        let margin = decimal(margin, 3);
        let adjusted = adjust_price(price, Some(margin), precision);
        prop_assert!(adjusted.is_some_and(|adjusted| adjusted >= price));
    }
}

// ── Resolver Properties ─────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Only allow-listed quotes come back, in preference order within
    /// each venue and with venues in ascending priority.
    #[test]
    fn resolver_respects_allow_list_and_order(
        catalogs in catalogs(),
        quotes in allow_list(),
        base in 0..BASES.len(),
    ) {
        let resolver = resolver(&catalogs, &quotes);
        let resolved = resolver.resolve(BASES[base]);

        let mut last_priority = 0;
        for venue in resolved.venues() {
            prop_assert!(venue.priority > 0);
            prop_assert!(venue.priority >= last_priority);
            last_priority = venue.priority;

            let ranks: Vec<usize> = venue
                .markets
                .iter()
                .map(|m| {
                    quotes
                        .iter()
                        .position(|q| *q == m.quote.symbol)
                        .expect("quote outside the allow-list")
                })
                .collect();
            prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
            prop_assert!(venue.markets.iter().all(|m| m.base.symbol == BASES[base]));
        }
    }

    /// Same cache, same answer; identical rebuilds, identical answers.
    #[test]
    fn resolution_is_deterministic_across_rebuilds(
        catalogs in catalogs(),
        quotes in allow_list(),
    ) {
        let first = resolver(&catalogs, &quotes);
        let second = resolver(&catalogs, &quotes);

        for base in BASES {
            let once = first.resolve(base);
            prop_assert_eq!(&once, &first.resolve(base));
            prop_assert_eq!(&once, &second.resolve(base));
        }
    }
}

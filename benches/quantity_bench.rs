//! Order Sizing Benchmarks - Hot-Path Arithmetic
//!
//! Sizing runs once per attempted market, between the price fetch and
//! the order submission.
//!
//! Run with: cargo bench --bench quantity_bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal_macros::dec;

use mention_trader::domain::quantity::{adjust_price, order_quantity};

/// Quantity truncated to a venue step size.
fn bench_quantity_with_step(c: &mut Criterion) {
    c.bench_function("order_quantity_step", |b| {
        b.iter(|| {
            let _qty = order_quantity(
                black_box(dec!(100)),
                black_box(dec!(3.3334)),
                black_box(Some(dec!(0.01))),
                black_box(None),
            );
        });
    });
}

/// Quantity truncated to the base currency precision.
fn bench_quantity_with_precision(c: &mut Criterion) {
    c.bench_function("order_quantity_precision", |b| {
        b.iter(|| {
            let _qty = order_quantity(
                black_box(dec!(0.01)),
                black_box(dec!(0.00000173)),
                black_box(None),
                black_box(Some(8)),
            );
        });
    });
}

/// Margin applied and rounded up to the quote precision.
fn bench_adjust_price(c: &mut Criterion) {
    c.bench_function("adjust_price_margin", |b| {
        b.iter(|| {
            let _price = adjust_price(
                black_box(dec!(3.1746)),
                black_box(Some(dec!(0.05))),
                black_box(Some(4)),
            );
        });
    });
}

/// Full sizing path as the engine runs it.
fn bench_full_sizing(c: &mut Criterion) {
    c.bench_function("adjust_then_size", |b| {
        b.iter(|| {
            let _qty = adjust_price(black_box(dec!(0.0712)), Some(dec!(0.05)), Some(4))
                .and_then(|price| order_quantity(black_box(dec!(100)), price, Some(dec!(1)), Some(8)));
        });
    });
}

criterion_group!(
    benches,
    bench_quantity_with_step,
    bench_quantity_with_precision,
    bench_adjust_price,
    bench_full_sizing,
);
criterion_main!(benches);

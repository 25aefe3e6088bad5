//! Ports Layer - Hexagonal Architecture Boundaries
//!
//! Defines the interfaces (traits) that the use-case layer requires
//! from the outside world. Adapters implement these traits.
//!
//! Port categories:
//! - `ExchangeAdapter`: Venue catalog, price and order placement
//! - `CurrencyDetector`: Free-text currency recognition

pub mod detector;
pub mod exchange;

pub use detector::CurrencyDetector;
pub use exchange::{ExchangeAdapter, OrderPlacement};

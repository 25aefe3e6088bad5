//! Use Cases Layer - Application Business Logic
//!
//! Orchestrates domain logic with port interfaces to implement
//! the bot's core workflow: text → currency → markets → one order.
//!
//! Use cases:
//! - `CacheCurrencyDetector`: free-text mention to cached currency
//! - `MarketResolver`: candidate markets in trial order
//! - `PlacementEngine`: first-success order placement across venues

pub mod currency_detector;
pub mod market_resolver;
pub mod placement_engine;

pub use self::currency_detector::CacheCurrencyDetector;
pub use self::market_resolver::{MarketResolver, ResolvedMarkets, VenueMarkets};
pub use self::placement_engine::{
  Attempt, AttemptOutcome, PlacementEngine, TrialOutcome, TrialReport,
};

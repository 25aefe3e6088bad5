//! Market Cache - SQLite Catalog of Venue Listings
//!
//! Local, queryable copy of which venue lists which base/quote market.
//! Rebuilt wholesale at startup; read by the resolver and the detector.

pub mod schema;
pub mod store;

pub use self::store::{ListingRow, MarketCache, RebuildStats, VenueCatalog};

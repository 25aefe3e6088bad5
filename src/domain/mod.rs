//! Domain layer - Core catalog types and order sizing.
//!
//! Pure types and arithmetic for the market resolution and placement
//! pipeline. No I/O here (hexagonal architecture inner ring); every
//! type is testable in isolation.

pub mod market;
pub mod quantity;

// Re-export core types for convenience
pub use market::{normalize_symbol, Currency, Exchange, Market};
pub use quantity::{adjust_price, order_quantity, truncate_to_step};

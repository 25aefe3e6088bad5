//! Adapters Layer - Hexagonal Architecture Outer Ring
//!
//! Implements the port traits defined in `crate::ports` with concrete
//! external dependencies (venue REST APIs, SQLite, HTTP server).
//! Each sub-module groups adapters by infrastructure concern.
//!
//! Adapter categories:
//! - `binance`, `bittrex`: reference venue adapters
//! - `http`: shared rate-limited REST transport
//! - `registry`: venue name to adapter constructor
//! - `cache`: SQLite market cache
//! - `metrics`: Prometheus metrics export and health checks

pub mod binance;
pub mod bittrex;
pub mod cache;
pub mod http;
pub mod metrics;
pub mod registry;

//! Metrics and Monitoring Adapters
//!
//! Prometheus counters for trials, attempts and orders, plus health
//! endpoints (/live, /ready, /metrics) via axum 0.7.

pub mod health;
pub mod prometheus;

pub use self::health::{HealthServer, HealthState};
pub use self::prometheus::MetricsRegistry;

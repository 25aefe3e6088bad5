//! Error taxonomy shared by adapters and use cases.
//!
//! Venue failures are classified at the adapter boundary so the
//! placement engine can decide between "skip this market" and "drop
//! this venue for the rest of the run" without knowing any venue API.

use thiserror::Error;

/// A classified failure returned by a venue adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VenueError {
    #[error("rate limited by venue")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    #[error("malformed venue response: {0}")]
    Malformed(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("order rejected: {0}")]
    Rejected(String),

    #[error("authentication rejected: {0}")]
    Unauthorized(String),

    #[error("access banned: {0}")]
    Banned(String),

    #[error("no API credentials configured")]
    MissingCredentials,
}

impl VenueError {
    /// Fatal errors exclude the venue for the remainder of the run.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized(_) | Self::Banned(_) | Self::MissingCredentials
        )
    }

    /// Short label for logs and metrics.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Malformed(_) => "malformed",
            Self::Transport(_) => "transport",
            Self::Rejected(_) => "rejected",
            Self::Unauthorized(_) => "unauthorized",
            Self::Banned(_) => "banned",
            Self::MissingCredentials => "missing_credentials",
        }
    }
}

/// Errors raised by the market cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("market cache has not been built yet")]
    NotReady,

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to move staging cache into place: {0}")]
    Io(#[from] std::io::Error),
}

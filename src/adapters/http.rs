//! Venue HTTP Client - Rate-limited REST Transport
//!
//! Wraps reqwest with a request timeout, a concurrency limiter and a
//! client-side request pacer for a single venue. Venue adapters supply
//! the status classification; this layer maps transport failures and
//! decodes JSON bodies.
//!
//! No retries here: a failed candidate is skipped by the placement
//! engine, never retried.

use std::fmt::Write as _;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::VenueError;

/// Maps a non-success HTTP response (status + body) to a venue error.
pub type Classifier = fn(StatusCode, &str) -> VenueError;

/// Configuration for a venue HTTP client.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
  /// Base URL for the venue REST API.
  pub base_url: String,
  /// Request timeout.
  pub timeout: Duration,
  /// Maximum concurrent requests.
  pub max_concurrent: usize,
  /// Client-side request pacing.
  pub requests_per_second: u32,
}

impl Default for HttpClientConfig {
  fn default() -> Self {
    Self {
      base_url: String::new(),
      timeout: Duration::from_secs(10),
      max_concurrent: 4,
      requests_per_second: 10,
    }
  }
}

/// Rate-limited HTTP client shared by one venue adapter.
pub struct VenueHttpClient {
  /// Underlying HTTP client.
  http: Client,
  /// Client configuration.
  config: HttpClientConfig,
  /// Concurrency limiter.
  semaphore: Arc<Semaphore>,
  /// Request pacer.
  limiter: DefaultDirectRateLimiter,
}

impl VenueHttpClient {
  /// Create a new venue client.
  pub fn new(config: HttpClientConfig) -> Result<Self> {
    let http = Client::builder()
      .timeout(config.timeout)
      .pool_max_idle_per_host(5)
      .build()
      .context("Failed to build HTTP client")?;

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent.max(1)));
    let per_second = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
    let limiter = RateLimiter::direct(Quota::per_second(per_second));

    Ok(Self {
      http,
      config,
      semaphore,
      limiter,
    })
  }

  /// Absolute URL for a venue path.
  pub fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Start a request against a venue path.
  pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
    self.http.request(method, self.url(path))
  }

  /// Send a request and decode a JSON success body.
  ///
  /// Non-success statuses go through `classify`; transport timeouts map
  /// to `VenueError::Timeout`; undecodable bodies to `Malformed`.
  pub async fn send_json<T: DeserializeOwned>(
    &self,
    request: RequestBuilder,
    classify: Classifier,
  ) -> Result<T, VenueError> {
    let _permit = self
      .semaphore
      .acquire()
      .await
      .map_err(|_| VenueError::Transport("client closed".to_string()))?;

    self.limiter.until_ready().await;

    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if !status.is_success() {
      let error = classify(status, &body);
      warn!(status = %status, kind = error.kind(), error = %error, "Venue request failed");
      return Err(error);
    }

    debug!(status = %status, bytes = body.len(), "Venue request succeeded");
    serde_json::from_str(&body).map_err(|e| VenueError::Malformed(e.to_string()))
  }
}

/// Classification shared by every venue: rate limiting, authentication
/// and server-side failures. `None` means the venue must decide.
pub fn classify_common(status: StatusCode, message: &str) -> Option<VenueError> {
  match status {
    StatusCode::TOO_MANY_REQUESTS => Some(VenueError::RateLimited),
    StatusCode::UNAUTHORIZED => Some(VenueError::Unauthorized(message.to_string())),
    StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Some(VenueError::Timeout),
    s if s.is_server_error() => Some(VenueError::Transport(format!("{s}: {message}"))),
    _ => None,
  }
}

/// Lowercase hex encoding for request signatures.
pub fn hex_encode(bytes: &[u8]) -> String {
  bytes.iter().fold(String::with_capacity(bytes.len() * 2), |mut out, b| {
    let _ = write!(out, "{b:02x}");
    out
  })
}

fn transport_error(err: reqwest::Error) -> VenueError {
  if err.is_timeout() {
    VenueError::Timeout
  } else {
    VenueError::Transport(err.to_string())
  }
}

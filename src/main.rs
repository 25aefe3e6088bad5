//! Mention Trader - Entry Point
//!
//! Reads one detection event per stdin line and tries to buy the
//! currency it mentions. Runs until EOF or SIGINT.
//!
//! Wiring sequence:
//! 1. Load config (path from the first argument, default config.toml)
//! 2. Init tracing (JSON structured logging)
//! 3. Spawn health/metrics server when enabled
//! 4. Build venue adapters from the registry
//! 5. Rebuild the market cache from every venue
//! 6. Snapshot the detector, create resolver + placement engine
//! 7. Process events sequentially until EOF or SIGINT

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

use mention_trader::adapters::cache::MarketCache;
use mention_trader::adapters::metrics::{HealthServer, HealthState, MetricsRegistry};
use mention_trader::adapters::registry::build_venues;
use mention_trader::config::loader::load_config;
use mention_trader::ports::detector::CurrencyDetector;
use mention_trader::usecases::{CacheCurrencyDetector, MarketResolver, PlacementEngine};

#[tokio::main]
async fn main() -> Result<()> {
    // ── 1. Load configuration ───────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());
    let config = load_config(&config_path).context("Failed to load configuration")?;

    // ── 2. Initialize structured JSON logging ───────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.bot.log_level)),
        )
        .json()
        .init();

    info!(
        name = %config.bot.name,
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path,
        "Starting mention trader"
    );

    let (shutdown_tx, _shutdown_rx) = broadcast::channel::<()>(1);

    // ── 3. Health and metrics server ────────────────────────
    let health = Arc::new(HealthState::new());
    let metrics = Arc::new(MetricsRegistry::new().context("Failed to register metrics")?);

    let server_handle = if config.metrics.enabled {
        let server = HealthServer::new(
            Arc::clone(&health),
            Arc::clone(&metrics),
            config.metrics.bind_address.clone(),
        );
        let server_shutdown = shutdown_tx.subscribe();
        Some(tokio::spawn(async move {
            if let Err(e) = server.run(server_shutdown).await {
                error!(error = %e, "Health server failed");
            }
        }))
    } else {
        None
    };

    // ── 4. Venues ───────────────────────────────────────────
    let venues = build_venues(&config).context("Failed to build venue adapters")?;
    if venues.is_empty() {
        warn!("No usable venue configured; every event will resolve to nothing");
    }

    // ── 5. Market cache ─────────────────────────────────────
    let cache = Arc::new(MarketCache::from_config(&config.cache));
    let stats = cache
        .rebuild(&venues)
        .await
        .context("Failed to build market cache")?;
    metrics.record_rebuild(&stats);
    health.mark_cache_ready();

    // ── 6. Detector, resolver, engine ───────────────────────
    let detector = CacheCurrencyDetector::from_cache(&cache, &config.order)
        .context("Failed to snapshot currencies")?;
    let resolver = MarketResolver::new(Arc::clone(&cache), &config.order);
    let engine = PlacementEngine::new(resolver, venues, &config).with_metrics(Arc::clone(&metrics));

    info!(currencies = detector.len(), "Ready, reading events from stdin");

    // ── 7. Event loop ───────────────────────────────────────
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("SIGINT received, shutting down");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(text)) => handle_event(&detector, &engine, &text).await,
                Ok(None) => {
                    info!("End of input, shutting down");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Failed to read event");
                    break;
                }
            },
        }
    }

    // ── Graceful shutdown ───────────────────────────────────
    let _ = shutdown_tx.send(());
    if let Some(handle) = server_handle {
        let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
    }

    info!(excluded = ?engine.excluded_venues(), "Shutdown complete");
    Ok(())
}

/// One detection event: free text → currency → placement trial.
async fn handle_event(detector: &CacheCurrencyDetector, engine: &PlacementEngine, text: &str) {
    let text = text.trim();
    if text.is_empty() {
        return;
    }

    let Some(currency) = detector.detect(text) else {
        info!(text, "No known currency mentioned");
        return;
    };

    let report = engine.run_trial(&currency.symbol).await;
    info!(
        base = %report.base,
        outcome = report.outcome.label(),
        attempts = report.attempts.len(),
        placed = report.succeeded(),
        "Event processed"
    );
}

//! Configuration Loader - File Loading and Validation
//!
//! Handles loading `config.toml`, applying credential overrides from
//! the environment, validating all parameters, and providing clear
//! error messages for misconfiguration.

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::info;

use super::AppConfig;

/// Load and validate configuration from a TOML file.
///
/// A `.env` file next to the working directory is loaded first, so
/// `<NAME>_API_KEY` / `<NAME>_API_SECRET` can live outside the TOML.
///
/// # Errors
/// Returns detailed error if:
/// - File doesn't exist or can't be read
/// - TOML parsing fails
/// - Validation rules are violated
pub fn load_config(path: &str) -> Result<AppConfig> {
  let path = Path::new(path);

  // A missing .env is not an error.
  let _ = dotenvy::dotenv();

  let content = std::fs::read_to_string(path)
    .with_context(|| format!("Failed to read config file: {}", path.display()))?;

  let mut config = parse_config(&content)?;
  apply_env_overrides(&mut config, |name| std::env::var(name).ok());
  validate_config(&config)?;

  info!(
    exchanges = config.exchanges.len(),
    quotes = ?config.order.quote_currencies.symbols(),
    multiplier = %config.order.multiplier,
    "Configuration loaded successfully"
  );

  Ok(config)
}

/// Parse configuration text without touching the environment.
pub fn parse_config(content: &str) -> Result<AppConfig> {
  toml::from_str(content).with_context(|| "Failed to parse config.toml")
}

/// Override venue credentials from `<NAME>_API_KEY` / `<NAME>_API_SECRET`.
///
/// Empty values are ignored so an exported-but-blank variable does not
/// wipe a key from the file.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
  F: Fn(&str) -> Option<String>,
{
  for (name, exchange) in &mut config.exchanges {
    let prefix = name.to_ascii_uppercase();

    if let Some(key) = lookup(&format!("{prefix}_API_KEY")).filter(|v| !v.is_empty()) {
      exchange.key = key;
    }
    if let Some(secret) = lookup(&format!("{prefix}_API_SECRET")).filter(|v| !v.is_empty()) {
      exchange.secret = secret;
    }
  }
}

/// Validate all configuration parameters.
///
/// Checks for:
/// - At least one funding currency, each with a positive notional
/// - A non-negative price multiplier
/// - Positive HTTP limits
/// - At least one usable exchange
pub fn validate_config(config: &AppConfig) -> Result<()> {
  anyhow::ensure!(!config.bot.name.is_empty(), "bot.name must not be empty");

  // Order validation
  anyhow::ensure!(
    !config.order.quote_currencies.is_empty(),
    "At least one entry in order.quote_currencies must be configured"
  );
  for (symbol, notional) in config.order.quote_currencies.iter() {
    anyhow::ensure!(!symbol.is_empty(), "Funding currency symbol must not be empty");
    anyhow::ensure!(
      notional > Decimal::ZERO,
      "Notional for {} must be positive, got {}",
      symbol,
      notional
    );
  }
  anyhow::ensure!(
    config.order.multiplier >= Decimal::ZERO,
    "order.multiplier must not be negative, got {}",
    config.order.multiplier
  );

  // API validation
  anyhow::ensure!(config.api.timeout_ms > 0, "api.timeout_ms must be positive");
  anyhow::ensure!(
    config.api.max_concurrent > 0,
    "api.max_concurrent must be positive"
  );
  anyhow::ensure!(
    config.api.requests_per_second > 0,
    "api.requests_per_second must be positive"
  );

  // Exchange validation
  anyhow::ensure!(
    config.exchanges.values().any(super::ExchangeConfig::is_active),
    "At least one exchange must be enabled with a non-zero priority"
  );
  anyhow::ensure!(!config.cache.path.is_empty(), "cache.path must not be empty");

  Ok(())
}

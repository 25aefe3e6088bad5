//! Market Cache Store - Atomic Rebuild, Concurrent Reads
//!
//! The cache is rebuilt from scratch into a staging database inside a
//! single transaction. Only after commit does the staging database
//! replace the live one (tmp → rename for file caches, then a pointer
//! swap under the lock), so readers see either the previous complete
//! cache or the new complete cache, never a partial one.
//!
//! Merge rules while populating:
//! - currency `name` / `precision` are filled where still unknown
//! - market `step` keeps the last non-null value seen
//! - a venue listing the same pair twice keeps the first listing

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use rusqlite::{Connection, Row, Transaction, params};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::schema::{IN_MEMORY, init_schema};
use crate::adapters::registry::Venue;
use crate::config::CacheConfig;
use crate::domain::market::{Currency, Exchange, Market, normalize_symbol};
use crate::error::CacheError;

/// One venue's catalog, as fed into a rebuild.
#[derive(Debug, Clone)]
pub struct VenueCatalog {
    pub exchange: Exchange,
    pub markets: Vec<Market>,
}

/// Row counts of a completed rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildStats {
    pub exchanges: usize,
    pub currencies: usize,
    pub markets: usize,
    pub listings: usize,
}

/// A listing of a market with the given base on one venue.
///
/// `base` / `quote` are `None` when the currency row is missing, and
/// `step` is the raw stored text; callers decide how to treat either.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRow {
    pub exchange: String,
    pub priority: u32,
    pub venue_symbol: String,
    pub base_symbol: String,
    pub quote_symbol: String,
    pub base: Option<Currency>,
    pub quote: Option<Currency>,
    pub step: Option<String>,
}

/// A committed cache database.
struct CacheSnapshot {
    conn: Mutex<Connection>,
    stats: RebuildStats,
}

/// SQLite-backed market cache.
pub struct MarketCache {
    /// `None` for an in-memory cache.
    path: Option<PathBuf>,
    /// `None` until the first successful rebuild.
    live: RwLock<Option<Arc<CacheSnapshot>>>,
}

impl MarketCache {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            live: RwLock::new(None),
        }
    }

    /// File-backed cache at `path`. Nothing is touched until a rebuild.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            live: RwLock::new(None),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        if config.path == IN_MEMORY {
            Self::in_memory()
        } else {
            Self::at_path(&config.path)
        }
    }

    /// Whether a rebuild has completed.
    pub fn is_ready(&self) -> bool {
        self.live.read().is_some()
    }

    /// Stats of the live cache.
    pub fn stats(&self) -> Option<RebuildStats> {
        self.live.read().as_ref().map(|snapshot| snapshot.stats)
    }

    /// Fetch every venue's catalog in priority order and rebuild.
    ///
    /// # Errors
    /// Database or filesystem failures; the previous cache stays live.
    #[instrument(skip(self, venues), fields(venues = venues.len()))]
    pub async fn rebuild(&self, venues: &[Venue]) -> Result<RebuildStats, CacheError> {
        let mut ordered: Vec<&Venue> = venues.iter().collect();
        ordered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));

        let mut catalogs = Vec::with_capacity(ordered.len());
        for venue in ordered {
            let markets = venue.adapter.fetch_markets().await;
            info!(exchange = %venue.name, markets = markets.len(), "Venue catalog fetched");
            catalogs.push(VenueCatalog {
                exchange: Exchange::new(venue.name.as_str(), venue.priority),
                markets,
            });
        }

        self.rebuild_from(&catalogs)
    }

    /// Rebuild from already-fetched catalogs, in the given order.
    ///
    /// # Errors
    /// Database or filesystem failures; the previous cache stays live.
    pub fn rebuild_from(&self, catalogs: &[VenueCatalog]) -> Result<RebuildStats, CacheError> {
        let (conn, stats) = match &self.path {
            None => {
                let mut conn = Connection::open_in_memory()?;
                init_schema(&conn)?;
                let stats = populate(&mut conn, catalogs)?;
                (conn, stats)
            }
            Some(path) => {
                let staging = staging_path(path);
                let result = build_file(path, &staging, catalogs);
                if result.is_err() {
                    let _ = std::fs::remove_file(&staging);
                }
                result?
            }
        };

        *self.live.write() = Some(Arc::new(CacheSnapshot {
            conn: Mutex::new(conn),
            stats,
        }));

        info!(
            exchanges = stats.exchanges,
            currencies = stats.currencies,
            markets = stats.markets,
            listings = stats.listings,
            "Market cache rebuilt"
        );
        Ok(stats)
    }

    /// Every listing whose base is `base` and whose quote is one of
    /// `quotes`, ordered by exchange priority, exchange name, then
    /// insertion order. Symbols are compared case-insensitively.
    ///
    /// # Errors
    /// `CacheError::NotReady` before the first rebuild.
    pub fn listings_for_base(
        &self,
        base: &str,
        quotes: &[String],
    ) -> Result<Vec<ListingRow>, CacheError> {
        let snapshot = self.snapshot()?;
        let conn = snapshot.conn.lock();

        let base = normalize_symbol(base);
        let quotes: Vec<String> = quotes.iter().map(|q| normalize_symbol(q)).collect();

        let mut stmt = conn.prepare_cached(
            "SELECT e.name, e.priority, em.venue_symbol, m.base, m.quote, m.step,
                    b.symbol, b.name, b.precision, q.symbol, q.name, q.precision
             FROM exchange_markets em
             JOIN exchanges e ON e.id = em.exchange_id
             JOIN markets m ON m.id = em.market_id
             LEFT JOIN currencies b ON b.symbol = m.base
             LEFT JOIN currencies q ON q.symbol = m.quote
             WHERE m.base = ?1
             ORDER BY e.priority, e.name, em.id",
        )?;

        let rows = stmt
            .query_map(params![base], listing_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let matched: Vec<ListingRow> = rows
            .into_iter()
            .filter(|row| quotes.contains(&row.quote_symbol))
            .collect();

        debug!(base = %base, listings = matched.len(), "Listings loaded");
        Ok(matched)
    }

    /// All cached currencies, ordered by symbol.
    ///
    /// # Errors
    /// `CacheError::NotReady` before the first rebuild.
    pub fn currencies(&self) -> Result<Vec<Currency>, CacheError> {
        let snapshot = self.snapshot()?;
        let conn = snapshot.conn.lock();

        let mut stmt =
            conn.prepare_cached("SELECT symbol, name, precision FROM currencies ORDER BY symbol")?;
        let currencies = stmt
            .query_map([], |row| {
                Ok(Currency {
                    symbol: row.get(0)?,
                    name: row.get(1)?,
                    precision: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(currencies)
    }

    fn snapshot(&self) -> Result<Arc<CacheSnapshot>, CacheError> {
        self.live.read().clone().ok_or(CacheError::NotReady)
    }
}

/// `<path>.staging`, next to the live file.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".staging");
    PathBuf::from(name)
}

/// Populate a staging file, move it over `path`, and reopen it.
fn build_file(
    path: &Path,
    staging: &Path,
    catalogs: &[VenueCatalog],
) -> Result<(Connection, RebuildStats), CacheError> {
    match std::fs::remove_file(staging) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    let mut conn = Connection::open(staging)?;
    init_schema(&conn)?;
    let stats = populate(&mut conn, catalogs)?;
    conn.close().map_err(|(_, e)| e)?;

    std::fs::rename(staging, path)?;

    let conn = Connection::open(path)?;
    conn.pragma_update(None, "foreign_keys", true)?;
    Ok((conn, stats))
}

/// Load every catalog inside one transaction.
fn populate(conn: &mut Connection, catalogs: &[VenueCatalog]) -> rusqlite::Result<RebuildStats> {
    let tx = conn.transaction()?;

    {
        let mut upsert_exchange = tx.prepare_cached(
            "INSERT INTO exchanges (name, priority) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET priority = excluded.priority
             RETURNING id",
        )?;
        let mut upsert_currency = tx.prepare_cached(
            "INSERT INTO currencies (symbol, name, precision) VALUES (?1, ?2, ?3)
             ON CONFLICT(symbol) DO UPDATE SET
                name = COALESCE(currencies.name, excluded.name),
                precision = COALESCE(currencies.precision, excluded.precision)",
        )?;
        let mut upsert_market = tx.prepare_cached(
            "INSERT INTO markets (base, quote, step) VALUES (?1, ?2, ?3)
             ON CONFLICT(base, quote) DO UPDATE SET step = COALESCE(excluded.step, markets.step)
             RETURNING id",
        )?;
        let mut insert_listing = tx.prepare_cached(
            "INSERT OR IGNORE INTO exchange_markets (exchange_id, market_id, venue_symbol)
             VALUES (?1, ?2, ?3)",
        )?;

        for catalog in catalogs {
            let exchange = &catalog.exchange;
            if !exchange.is_enabled() {
                warn!(exchange = %exchange.name, "Skipping exchange with priority 0");
                continue;
            }

            let exchange_id: i64 = upsert_exchange
                .query_row(params![exchange.name, exchange.priority], |row| row.get(0))?;

            let mut skipped = 0_usize;
            for market in &catalog.markets {
                let base = normalize_symbol(&market.base.symbol);
                let quote = normalize_symbol(&market.quote.symbol);
                if base.is_empty() || quote.is_empty() {
                    warn!(exchange = %exchange.name, symbol = %market.symbol, "Skipping market with empty currency symbol");
                    skipped += 1;
                    continue;
                }

                upsert_currency.execute(params![base, market.base.name, market.base.precision])?;
                upsert_currency.execute(params![quote, market.quote.name, market.quote.precision])?;

                let step = market
                    .step
                    .filter(|s| *s > Decimal::ZERO)
                    .map(|s| s.normalize().to_string());
                let market_id: i64 =
                    upsert_market.query_row(params![base, quote, step], |row| row.get(0))?;

                insert_listing.execute(params![exchange_id, market_id, market.symbol])?;
            }

            debug!(
                exchange = %exchange.name,
                markets = catalog.markets.len(),
                skipped,
                "Venue catalog staged"
            );
        }
    }

    let stats = RebuildStats {
        exchanges: count(&tx, "exchanges")?,
        currencies: count(&tx, "currencies")?,
        markets: count(&tx, "markets")?,
        listings: count(&tx, "exchange_markets")?,
    };

    tx.commit()?;
    Ok(stats)
}

fn count(tx: &Transaction<'_>, table: &str) -> rusqlite::Result<usize> {
    let n: i64 = tx.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
    Ok(usize::try_from(n).unwrap_or_default())
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ListingRow> {
    let currency = |symbol: Option<String>, name: Option<String>, precision: Option<u32>| {
        symbol.map(|symbol| Currency {
            symbol,
            name,
            precision,
        })
    };

    Ok(ListingRow {
        exchange: row.get(0)?,
        priority: row.get(1)?,
        venue_symbol: row.get(2)?,
        base_symbol: row.get(3)?,
        quote_symbol: row.get(4)?,
        step: row.get(5)?,
        base: currency(row.get(6)?, row.get(7)?, row.get(8)?),
        quote: currency(row.get(9)?, row.get(10)?, row.get(11)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn market(symbol: &str, base: &str, quote: &str, step: Option<Decimal>) -> Market {
        Market::new(symbol, Currency::new(base), Currency::new(quote), step)
    }

    fn catalog(name: &str, priority: u32, markets: Vec<Market>) -> VenueCatalog {
        VenueCatalog {
            exchange: Exchange::new(name, priority),
            markets,
        }
    }

    fn quotes(symbols: &[&str]) -> Vec<String> {
        symbols.iter().map(ToString::to_string).collect()
    }

    fn stored_step(cache: &MarketCache, base: &str, quote: &str) -> Option<Decimal> {
        cache
            .listings_for_base(base, &quotes(&[quote]))
            .unwrap()
            .first()
            .and_then(|row| row.step.as_deref())
            .and_then(|step| step.parse().ok())
    }

    #[test]
    fn test_queries_fail_before_first_rebuild() {
        let cache = MarketCache::in_memory();
        assert!(!cache.is_ready());
        assert!(cache.stats().is_none());
        assert!(matches!(cache.currencies(), Err(CacheError::NotReady)));
        assert!(matches!(
            cache.listings_for_base("DOGE", &quotes(&["BTC"])),
            Err(CacheError::NotReady)
        ));
    }

    #[test]
    fn test_rebuild_merges_venues_into_canonical_markets() {
        let cache = MarketCache::in_memory();
        let stats = cache
            .rebuild_from(&[
                catalog("a", 1, vec![market("DOGEBTC", "DOGE", "BTC", Some(dec!(1)))]),
                catalog(
                    "b",
                    2,
                    vec![
                        market("DOGE-BTC", "doge", "btc", None),
                        market("DOGE-USDT", "DOGE", "USDT", None),
                    ],
                ),
            ])
            .unwrap();

        assert_eq!(
            stats,
            RebuildStats {
                exchanges: 2,
                currencies: 3,
                markets: 2,
                listings: 3,
            }
        );
        assert!(cache.is_ready());
        // b listed no step; a's step survives
        assert_eq!(stored_step(&cache, "DOGE", "BTC"), Some(dec!(1)));
    }

    #[test]
    fn test_last_non_null_step_wins() {
        let cache = MarketCache::in_memory();
        cache
            .rebuild_from(&[
                catalog("a", 1, vec![market("X1", "DOGE", "BTC", Some(dec!(1.000)))]),
                catalog("b", 2, vec![market("X2", "DOGE", "BTC", Some(dec!(0.5)))]),
                catalog("c", 3, vec![market("X3", "DOGE", "BTC", None)]),
            ])
            .unwrap();
        assert_eq!(stored_step(&cache, "DOGE", "BTC"), Some(dec!(0.5)));
    }

    #[test]
    fn test_currency_details_fill_only_when_unknown() {
        let cache = MarketCache::in_memory();
        let unnamed = market("DOGEBTC", "DOGE", "BTC", None);
        let mut named = market("DOGE-BTC", "DOGE", "BTC", None);
        named.base = Currency::new("DOGE").with_name("Dogecoin").with_precision(8);
        let mut renamed = market("DOGE/BTC", "DOGE", "BTC", None);
        renamed.base = Currency::new("DOGE").with_name("Doge").with_precision(2);

        cache
            .rebuild_from(&[
                catalog("a", 1, vec![unnamed]),
                catalog("b", 2, vec![named]),
                catalog("c", 3, vec![renamed]),
            ])
            .unwrap();

        let doge = cache
            .currencies()
            .unwrap()
            .into_iter()
            .find(|c| c.symbol == "DOGE")
            .unwrap();
        assert_eq!(doge.name.as_deref(), Some("Dogecoin"));
        assert_eq!(doge.precision, Some(8));
    }

    #[test]
    fn test_listings_ordered_by_priority_then_name() {
        let cache = MarketCache::in_memory();
        cache
            .rebuild_from(&[
                catalog("zeta", 1, vec![market("DOGEBTC", "DOGE", "BTC", None)]),
                catalog("alpha", 1, vec![market("DOGEETH", "DOGE", "ETH", None)]),
                catalog(
                    "first",
                    0,
                    vec![market("DOGEUSDT", "DOGE", "USDT", None)],
                ),
                catalog(
                    "late",
                    5,
                    vec![
                        market("DOGE-USDT", "DOGE", "USDT", None),
                        market("DOGE-EUR", "DOGE", "EUR", None),
                    ],
                ),
            ])
            .unwrap();

        let listings = cache
            .listings_for_base("doge", &quotes(&["usdt", "BTC", "ETH"]))
            .unwrap();
        let order: Vec<(&str, &str)> = listings
            .iter()
            .map(|l| (l.exchange.as_str(), l.venue_symbol.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("alpha", "DOGEETH"),
                ("zeta", "DOGEBTC"),
                ("late", "DOGE-USDT"),
            ]
        );
        assert_eq!(listings[0].priority, 1);
        assert_eq!(listings[0].base.as_ref().map(|c| c.symbol.as_str()), Some("DOGE"));
    }

    #[test]
    fn test_duplicate_listing_keeps_first() {
        let cache = MarketCache::in_memory();
        let stats = cache
            .rebuild_from(&[catalog(
                "a",
                1,
                vec![
                    market("DOGEBTC", "DOGE", "BTC", None),
                    market("DOGE_BTC", "DOGE", "BTC", None),
                ],
            )])
            .unwrap();
        assert_eq!(stats.listings, 1);

        let listings = cache.listings_for_base("DOGE", &quotes(&["BTC"])).unwrap();
        assert_eq!(listings[0].venue_symbol, "DOGEBTC");
    }

    #[test]
    fn test_empty_symbols_are_skipped() {
        let cache = MarketCache::in_memory();
        let stats = cache
            .rebuild_from(&[catalog(
                "a",
                1,
                vec![
                    market("BTC", "", "BTC", None),
                    market("DOGEBTC", "DOGE", "BTC", None),
                ],
            )])
            .unwrap();
        assert_eq!(stats.markets, 1);
        assert_eq!(stats.currencies, 2);
    }

    #[test]
    fn test_rebuild_replaces_previous_contents() {
        let cache = MarketCache::in_memory();
        cache
            .rebuild_from(&[catalog("a", 1, vec![market("DOGEBTC", "DOGE", "BTC", None)])])
            .unwrap();
        cache
            .rebuild_from(&[catalog("a", 1, vec![market("SHIBBTC", "SHIB", "BTC", None)])])
            .unwrap();

        assert!(cache.listings_for_base("DOGE", &quotes(&["BTC"])).unwrap().is_empty());
        assert_eq!(cache.listings_for_base("SHIB", &quotes(&["BTC"])).unwrap().len(), 1);
    }

    #[test]
    fn test_file_cache_moves_staging_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markets.db");
        let cache = MarketCache::at_path(&path);

        cache
            .rebuild_from(&[catalog("a", 1, vec![market("DOGEBTC", "DOGE", "BTC", None)])])
            .unwrap();
        assert!(path.exists());
        assert!(!staging_path(&path).exists());

        cache
            .rebuild_from(&[catalog("a", 1, vec![market("DOGEUSDT", "DOGE", "USDT", None)])])
            .unwrap();
        let listings = cache.listings_for_base("DOGE", &quotes(&["BTC", "USDT"])).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].quote_symbol, "USDT");
    }

    #[test]
    fn test_failed_rebuild_keeps_previous_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("markets.db");
        let cache = MarketCache::at_path(&path);

        let before = cache
            .rebuild_from(&[catalog("a", 1, vec![market("DOGEBTC", "DOGE", "BTC", None)])])
            .unwrap();

        // a directory in the staging slot cannot be replaced by a database
        std::fs::create_dir(staging_path(&path)).unwrap();
        let result =
            cache.rebuild_from(&[catalog("b", 1, vec![market("DOGE-USDT", "DOGE", "USDT", None)])]);
        assert!(result.is_err());

        assert!(cache.is_ready());
        assert_eq!(cache.stats(), Some(before));
        let listings = cache.listings_for_base("DOGE", &quotes(&["BTC", "USDT"])).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].exchange, "a");
        assert_eq!(listings[0].venue_symbol, "DOGEBTC");
    }

    #[test]
    fn test_rebuild_without_venues_is_ready_and_empty() {
        let cache = MarketCache::in_memory();
        let stats = tokio_test::block_on(cache.rebuild(&[])).unwrap();
        assert_eq!(stats, RebuildStats::default());
        assert!(cache.is_ready());
        assert!(cache.currencies().unwrap().is_empty());
    }

    #[test]
    fn test_staging_path() {
        assert_eq!(
            staging_path(Path::new("/tmp/markets.db")),
            PathBuf::from("/tmp/markets.db.staging")
        );
    }
}

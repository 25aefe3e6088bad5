//! Market cache schema.
//!
//! Only DDL lives here. One canonical row per currency and per
//! base/quote market; `exchange_markets` records which venue lists which
//! market under which venue-local symbol.

use rusqlite::Connection;

/// Path value selecting an in-process database.
pub const IN_MEMORY: &str = ":memory:";

/// Create all tables and indexes on a fresh connection.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;

    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS currencies (
            symbol TEXT PRIMARY KEY NOT NULL,
            name TEXT,
            precision INTEGER
        );

        CREATE TABLE IF NOT EXISTS markets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            base TEXT NOT NULL REFERENCES currencies(symbol),
            quote TEXT NOT NULL REFERENCES currencies(symbol),
            -- decimal text, never REAL
            step TEXT,
            UNIQUE(base, quote)
        );

        CREATE TABLE IF NOT EXISTS exchanges (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            priority INTEGER NOT NULL CHECK (priority > 0)
        );

        CREATE TABLE IF NOT EXISTS exchange_markets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            exchange_id INTEGER NOT NULL REFERENCES exchanges(id),
            market_id INTEGER NOT NULL REFERENCES markets(id),
            venue_symbol TEXT NOT NULL,
            UNIQUE(exchange_id, market_id)
        );

        CREATE INDEX IF NOT EXISTS idx_markets_base ON markets(base);",
    )
}

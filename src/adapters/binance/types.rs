//! Binance REST API Request/Response Types
//!
//! Serialization types for the Spot REST endpoints the adapter uses.
//! Numbers arrive as strings and are parsed into `Decimal` here, never
//! into floats.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::market::{Currency, Market};

/// `GET /api/v3/exchangeInfo` response (the parts we read).
#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeInfoResponse {
    pub symbols: Vec<SymbolInfo>,
}

/// One trading pair from `exchangeInfo`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInfo {
    /// Venue-local symbol, e.g. `DOGEBTC`.
    pub symbol: String,
    /// `TRADING`, `BREAK`, `HALT`, ...
    pub status: String,
    pub base_asset: String,
    #[serde(default)]
    pub base_asset_precision: Option<u32>,
    pub quote_asset: String,
    #[serde(default)]
    pub quote_asset_precision: Option<u32>,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// Symbol trading rule. Only `LOT_SIZE` matters for sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "LOT_SIZE", rename_all = "camelCase")]
    LotSize { step_size: String },
    #[serde(other)]
    Other,
}

impl SymbolInfo {
    /// Whether the pair currently accepts orders.
    pub fn is_trading(&self) -> bool {
        self.status == "TRADING"
    }

    /// Positive `LOT_SIZE` step, trailing zeros stripped.
    pub fn step_size(&self) -> Option<Decimal> {
        self.filters.iter().find_map(|filter| match filter {
            SymbolFilter::LotSize { step_size } => Decimal::from_str(step_size)
                .ok()
                .filter(|step| *step > Decimal::ZERO)
                .map(|step| step.normalize()),
            SymbolFilter::Other => None,
        })
    }

    /// Translate into the venue-independent market type.
    pub fn into_market(self) -> Market {
        let step = self.step_size();

        let mut base = Currency::new(&self.base_asset);
        base.precision = self.base_asset_precision;
        let mut quote = Currency::new(&self.quote_asset);
        quote.precision = self.quote_asset_precision;

        Market::new(self.symbol, base, quote, step)
    }
}

/// `GET /api/v3/ticker/price` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPrice {
    pub symbol: String,
    pub price: String,
}

/// `POST /api/v3/order` response with `newOrderRespType=ACK`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub symbol: String,
    pub order_id: u64,
    pub client_order_id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body: `{"code": -2010, "msg": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

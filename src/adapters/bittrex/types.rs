//! Bittrex v3 REST API Request/Response Types

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::market::{Currency, Market, normalize_symbol};

const ONLINE: &str = "ONLINE";

/// Entry of `GET /v3/currencies`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrencyInfo {
    pub symbol: String,
    /// Display name, e.g. "Dogecoin".
    pub name: String,
    pub status: String,
}

impl CurrencyInfo {
    pub fn is_online(&self) -> bool {
        self.status == ONLINE
    }
}

/// Entry of `GET /v3/markets`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketInfo {
    /// Venue-local symbol, `BASE-QUOTE`.
    pub symbol: String,
    pub base_currency_symbol: String,
    pub quote_currency_symbol: String,
    /// Price decimals, i.e. the quote currency precision.
    #[serde(default)]
    pub precision: Option<u32>,
    pub status: String,
}

impl MarketInfo {
    pub fn is_online(&self) -> bool {
        self.status == ONLINE
    }

    /// Translate into the venue-independent market type, attaching
    /// display names from `names` (keyed by normalized symbol).
    pub fn into_market(self, names: &HashMap<String, String>) -> Market {
        let named = |symbol: &str| {
            let currency = Currency::new(symbol);
            match names.get(&currency.symbol) {
                Some(name) => currency.with_name(name.clone()),
                None => currency,
            }
        };

        let base = named(&self.base_currency_symbol);
        let mut quote = named(&self.quote_currency_symbol);
        quote.precision = self.precision;

        Market::new(self.symbol, base, quote, None)
    }
}

/// Map normalized symbol to display name for every online currency.
pub fn currency_names(currencies: Vec<CurrencyInfo>) -> HashMap<String, String> {
    currencies
        .into_iter()
        .filter(CurrencyInfo::is_online)
        .map(|c| (normalize_symbol(&c.symbol), c.name))
        .collect()
}

/// `GET /v3/markets/{symbol}/ticker` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    pub ask_rate: String,
}

/// `POST /v3/orders` body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub market_symbol: String,
    pub direction: &'static str,
    #[serde(rename = "type")]
    pub order_type: &'static str,
    pub quantity: String,
    pub time_in_force: &'static str,
    pub client_order_id: String,
}

impl NewOrder {
    /// Immediate-or-cancel market buy.
    pub fn market_buy(market_symbol: &str, quantity: String, client_order_id: String) -> Self {
        Self {
            market_symbol: market_symbol.to_string(),
            direction: "BUY",
            order_type: "MARKET",
            quantity,
            time_in_force: "IMMEDIATE_OR_CANCEL",
            client_order_id,
        }
    }
}

/// `POST /v3/orders` response (the parts we read).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Error body: `{"code": "INSUFFICIENT_FUNDS", "detail": "..."}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub code: String,
    #[serde(default)]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_translation_attaches_names_and_precision() {
        let currencies: Vec<CurrencyInfo> = serde_json::from_str(
            r#"[
                {"symbol":"DOGE","name":"Dogecoin","coinType":"BITCOIN","status":"ONLINE","minConfirmations":36,"txFee":"4"},
                {"symbol":"BTC","name":"Bitcoin","coinType":"BITCOIN","status":"OFFLINE","minConfirmations":2,"txFee":"0.0003"}
            ]"#,
        )
        .unwrap();
        let names = currency_names(currencies);
        assert_eq!(names.get("DOGE").map(String::as_str), Some("Dogecoin"));
        assert!(!names.contains_key("BTC"));

        let info: MarketInfo = serde_json::from_str(
            r#"{"symbol":"DOGE-BTC","baseCurrencySymbol":"DOGE","quoteCurrencySymbol":"BTC","minTradeSize":"150","precision":8,"status":"ONLINE","createdAt":"2014-02-13T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(info.is_online());

        let market = info.into_market(&names);
        assert_eq!(market.symbol, "DOGE-BTC");
        assert_eq!(market.base.name.as_deref(), Some("Dogecoin"));
        assert_eq!(market.quote.name, None);
        assert_eq!(market.quote.precision, Some(8));
        assert_eq!(market.step, None);
    }

    #[test]
    fn test_new_order_serialization() {
        let order = NewOrder::market_buy("DOGE-BTC", "30.00".to_string(), "cid".to_string());
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["marketSymbol"], "DOGE-BTC");
        assert_eq!(json["direction"], "BUY");
        assert_eq!(json["type"], "MARKET");
        assert_eq!(json["quantity"], "30.00");
        assert_eq!(json["timeInForce"], "IMMEDIATE_OR_CANCEL");
        assert_eq!(json["clientOrderId"], "cid");
    }
}

//! Binance Spot Adapter - Reference `ExchangeAdapter`
//!
//! Catalog from `/api/v3/exchangeInfo`, live prices from
//! `/api/v3/ticker/price`, market buys through the signed
//! `POST /api/v3/order` endpoint.
//!
//! Status mapping:
//! - 429 → `RateLimited`, 418 (IP ban after ignoring 429s) → `Banned`
//! - 401, or error codes -2014/-2015/-1022 → `Unauthorized`
//! - 403 (WAF block) → `Banned`
//! - anything else non-2xx → `Rejected` with the venue message

pub mod auth;
pub mod types;

use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use self::auth::{API_KEY_HEADER, BinanceCredentials, timestamp_ms};
use self::types::{ApiErrorBody, ExchangeInfoResponse, OrderAck, SymbolInfo, TickerPrice};
use crate::adapters::http::{VenueHttpClient, classify_common};
use crate::adapters::registry::VenueSettings;
use crate::domain::market::Market;
use crate::error::VenueError;
use crate::ports::exchange::{ExchangeAdapter, OrderPlacement};

/// Public Binance Spot REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Binance error codes meaning the key or signature was refused.
const AUTH_ERROR_CODES: [i64; 3] = [-2014, -2015, -1022];

/// Binance Spot adapter.
pub struct BinanceAdapter {
    /// Rate-limited REST client.
    client: VenueHttpClient,
    /// `None` runs the adapter read-only.
    credentials: Option<BinanceCredentials>,
    /// Signed request validity window (ms).
    recv_window: u64,
}

impl BinanceAdapter {
    pub fn new(settings: &VenueSettings) -> Result<Self> {
        let client = VenueHttpClient::new(settings.http_config(DEFAULT_BASE_URL))?;
        let credentials = BinanceCredentials::new(settings.key.clone(), settings.secret.clone());

        Ok(Self {
            client,
            credentials,
            recv_window: settings.recv_window,
        })
    }

    /// Registry constructor.
    pub fn build(settings: &VenueSettings) -> Result<Arc<dyn ExchangeAdapter>> {
        Ok(Arc::new(Self::new(settings)?))
    }

    async fn exchange_info(&self) -> Result<ExchangeInfoResponse, VenueError> {
        let request = self.client.request(Method::GET, "/api/v3/exchangeInfo");
        self.client.send_json(request, classify).await
    }
}

#[async_trait]
impl ExchangeAdapter for BinanceAdapter {
    #[instrument(skip(self), fields(exchange = "binance"))]
    async fn fetch_markets(&self) -> Vec<Market> {
        match self.exchange_info().await {
            Ok(info) => {
                let total = info.symbols.len();
                let markets: Vec<Market> = info
                    .symbols
                    .into_iter()
                    .filter(SymbolInfo::is_trading)
                    .map(SymbolInfo::into_market)
                    .collect();
                info!(total, trading = markets.len(), "Fetched Binance catalog");
                markets
            }
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Failed to fetch Binance catalog");
                Vec::new()
            }
        }
    }

    #[instrument(skip(self, market), fields(exchange = "binance", symbol = %market.symbol))]
    async fn ticker_price(&self, market: &Market) -> Result<Decimal, VenueError> {
        let request = self
            .client
            .request(Method::GET, "/api/v3/ticker/price")
            .query(&[("symbol", market.symbol.as_str())]);

        let ticker: TickerPrice = self.client.send_json(request, classify).await?;
        parse_price(&ticker.price)
    }

    #[instrument(skip(self, market), fields(exchange = "binance", symbol = %market.symbol, %quantity))]
    async fn place_buy_order(
        &self,
        market: &Market,
        quantity: Decimal,
    ) -> Result<OrderPlacement, VenueError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(VenueError::MissingCredentials)?;

        let client_order_id = Uuid::new_v4().simple().to_string();
        let params = order_params(&market.symbol, quantity, &client_order_id);
        let query = credentials.signed_query(&params, self.recv_window, timestamp_ms());

        let request = self
            .client
            .request(Method::POST, &format!("/api/v3/order?{query}"))
            .header(API_KEY_HEADER, credentials.api_key());

        let ack: OrderAck = self.client.send_json(request, classify).await?;

        info!(
            order_id = ack.order_id,
            client_order_id = %ack.client_order_id,
            "Binance order acknowledged"
        );

        Ok(OrderPlacement::accepted(ack.order_id.to_string(), ack.status))
    }
}

/// Unsigned query parameters of a MARKET BUY.
fn order_params(symbol: &str, quantity: Decimal, client_order_id: &str) -> String {
    format!(
        "symbol={symbol}&side=BUY&type=MARKET&quantity={quantity}\
         &newClientOrderId={client_order_id}&newOrderRespType=ACK"
    )
}

fn parse_price(raw: &str) -> Result<Decimal, VenueError> {
    Decimal::from_str(raw)
        .ok()
        .filter(|price| *price > Decimal::ZERO)
        .ok_or_else(|| VenueError::Malformed(format!("invalid ticker price {raw:?}")))
}

fn classify(status: StatusCode, body: &str) -> VenueError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .map_or_else(|| body.to_string(), |e| format!("{} {}", e.code, e.msg));

    if status == StatusCode::IM_A_TEAPOT || status == StatusCode::FORBIDDEN {
        return VenueError::Banned(message);
    }
    if parsed.is_some_and(|e| AUTH_ERROR_CODES.contains(&e.code)) {
        return VenueError::Unauthorized(message);
    }
    classify_common(status, &message).unwrap_or(VenueError::Rejected(message))
}

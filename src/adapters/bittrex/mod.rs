//! Bittrex v3 Adapter - Reference `ExchangeAdapter`
//!
//! Catalog from `/v3/markets` joined with display names from
//! `/v3/currencies`, prices from the market ticker's ask, and
//! immediate-or-cancel market buys through `POST /v3/orders`.
//! Bittrex publishes no lot step; quantities fall back to precision.

pub mod auth;
pub mod types;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Method, StatusCode};
use rust_decimal::Decimal;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use self::auth::{
    API_KEY_HEADER, BittrexCredentials, CONTENT_HASH_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER,
};
use self::types::{
    ApiErrorBody, CurrencyInfo, MarketInfo, NewOrder, OrderResponse, Ticker, currency_names,
};
use crate::adapters::http::{VenueHttpClient, classify_common};
use crate::adapters::registry::VenueSettings;
use crate::domain::market::Market;
use crate::error::VenueError;
use crate::ports::exchange::{ExchangeAdapter, OrderPlacement};

pub const DEFAULT_BASE_URL: &str = "https://api.bittrex.com";

/// Error codes meaning the key or signature was refused.
const AUTH_ERROR_CODES: [&str; 3] = ["APIKEY_INVALID", "INVALID_SIGNATURE", "INVALID_TIMESTAMP"];

/// Bittrex adapter.
pub struct BittrexAdapter {
    client: VenueHttpClient,
    credentials: Option<BittrexCredentials>,
}

impl BittrexAdapter {
    pub fn new(settings: &VenueSettings) -> Result<Self> {
        Ok(Self {
            client: VenueHttpClient::new(settings.http_config(DEFAULT_BASE_URL))?,
            credentials: BittrexCredentials::new(settings.key.clone(), settings.secret.clone()),
        })
    }

    /// Registry constructor.
    pub fn build(settings: &VenueSettings) -> Result<Arc<dyn ExchangeAdapter>> {
        Ok(Arc::new(Self::new(settings)?))
    }

    /// Display names of online currencies. A failure only costs names.
    async fn names(&self) -> HashMap<String, String> {
        let request = self.client.request(Method::GET, "/v3/currencies");
        match self.client.send_json::<Vec<CurrencyInfo>>(request, classify).await {
            Ok(currencies) => currency_names(currencies),
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Failed to fetch Bittrex currency names");
                HashMap::new()
            }
        }
    }

    async fn markets(&self) -> Result<Vec<MarketInfo>, VenueError> {
        let request = self.client.request(Method::GET, "/v3/markets");
        self.client.send_json(request, classify).await
    }
}

#[async_trait]
impl ExchangeAdapter for BittrexAdapter {
    #[instrument(skip(self), fields(exchange = "bittrex"))]
    async fn fetch_markets(&self) -> Vec<Market> {
        let markets = match self.markets().await {
            Ok(markets) => markets,
            Err(e) => {
                warn!(error = %e, kind = e.kind(), "Failed to fetch Bittrex catalog");
                return Vec::new();
            }
        };

        let names = self.names().await;
        let total = markets.len();
        let markets: Vec<Market> = markets
            .into_iter()
            .filter(MarketInfo::is_online)
            .map(|m| m.into_market(&names))
            .collect();

        info!(total, online = markets.len(), named = names.len(), "Fetched Bittrex catalog");
        markets
    }

    #[instrument(skip(self, market), fields(exchange = "bittrex", symbol = %market.symbol))]
    async fn ticker_price(&self, market: &Market) -> Result<Decimal, VenueError> {
        let path = format!("/v3/markets/{}/ticker", market.symbol);
        let request = self.client.request(Method::GET, &path);

        let ticker: Ticker = self.client.send_json(request, classify).await?;
        Decimal::from_str(&ticker.ask_rate)
            .ok()
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| VenueError::Malformed(format!("invalid ask rate {:?}", ticker.ask_rate)))
    }

    #[instrument(skip(self, market), fields(exchange = "bittrex", symbol = %market.symbol, %quantity))]
    async fn place_buy_order(
        &self,
        market: &Market,
        quantity: Decimal,
    ) -> Result<OrderPlacement, VenueError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(VenueError::MissingCredentials)?;

        let order = NewOrder::market_buy(
            &market.symbol,
            quantity.to_string(),
            Uuid::new_v4().to_string(),
        );
        let body =
            serde_json::to_string(&order).map_err(|e| VenueError::Malformed(e.to_string()))?;

        let path = "/v3/orders";
        let signed = credentials.sign_request(
            Utc::now().timestamp_millis(),
            &self.client.url(path),
            Method::POST.as_str(),
            &body,
        );

        let request = self
            .client
            .request(Method::POST, path)
            .header(API_KEY_HEADER, credentials.api_key())
            .header(TIMESTAMP_HEADER, signed.timestamp)
            .header(CONTENT_HASH_HEADER, signed.content_hash)
            .header(SIGNATURE_HEADER, signed.signature)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body);

        let response: OrderResponse = self.client.send_json(request, classify).await?;
        info!(order_id = %response.id, status = ?response.status, "Bittrex order accepted");

        Ok(OrderPlacement::accepted(response.id, response.status))
    }
}

fn classify(status: StatusCode, body: &str) -> VenueError {
    let parsed = serde_json::from_str::<ApiErrorBody>(body).ok();
    let message = parsed.as_ref().map_or_else(
        || body.to_string(),
        |e| match &e.detail {
            Some(detail) => format!("{}: {detail}", e.code),
            None => e.code.clone(),
        },
    );

    if status == StatusCode::FORBIDDEN {
        return VenueError::Banned(message);
    }
    if parsed.is_some_and(|e| AUTH_ERROR_CODES.contains(&e.code.as_str())) {
        return VenueError::Unauthorized(message);
    }
    classify_common(status, &message).unwrap_or(VenueError::Rejected(message))
}

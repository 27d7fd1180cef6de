//! # broker::client
//!
//! Thin typed wrapper around the brokerage REST API. Each engine instance
//! owns its own [`BrokerClient`] (and therefore its own connection pool);
//! only the [`TokenStore`] is shared.
//!
//! Every call is a single round trip bounded by the transport timeout. There
//! is no retry here: callers decide how to degrade.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use reqwest::RequestBuilder;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::broker::token::TokenStore;
use crate::broker::types::{
    BalancesResponse, LevelOneQuote, OrderRequest, OrderResponse, PositionsResponse,
    QuotesResponse, SymbolDetails, SymbolDetailsResponse, SymbolMatch, SymbolSearchResponse,
    TimeResponse,
};
use crate::engine::calendar::to_market_time;
use crate::error::BrokerError;
use crate::models::Position;

pub struct BrokerClient {
    http:           reqwest::Client,
    tokens:         Arc<TokenStore>,
    account_number: String,
    use_real_money: bool,
}

impl BrokerClient {
    pub fn new(
        tokens: Arc<TokenStore>,
        account_number: impl Into<String>,
        use_real_money: bool,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            tokens,
            account_number: account_number.into(),
            use_real_money,
        })
    }

    pub fn uses_real_money(&self) -> bool {
        self.use_real_money
    }

    // ─── Plumbing ─────────────────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, BrokerError> {
        let session = self.tokens.session().await?;
        let request = self
            .http
            .get(session.url(path))
            .header(reqwest::header::AUTHORIZATION, session.authorization())
            .query(query);
        self.send("GET", path, request).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T, BrokerError> {
        let session = self.tokens.session().await?;
        let request = self
            .http
            .post(session.url(path))
            .header(reqwest::header::AUTHORIZATION, session.authorization())
            .json(body);
        self.send("POST", path, request).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        verb: &str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, BrokerError> {
        debug!(verb, path, "Brokerage request");

        let response = request.send().await.map_err(|e| {
            error!(verb, path, error = %e, "Brokerage unreachable");
            BrokerError::from(e)
        })?;

        let status = response.status();
        let body = response.text().await?;
        debug!(verb, path, %status, body = %body, "Brokerage response");

        if !status.is_success() {
            error!(verb, path, %status, body = %body, "Brokerage returned HTTP error");
            return Err(BrokerError::Http { status: status.as_u16(), body });
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(verb, path, error = %e, body = %body, "Failed to decode brokerage response");
            BrokerError::MalformedResponse(format!("{path}: {e}"))
        })
    }

    // ─── Endpoints ────────────────────────────────────────────────────────────

    /// Brokerage clock, converted to exchange-local time.
    pub async fn server_time(&self) -> Result<DateTime<Tz>, BrokerError> {
        let response: TimeResponse = self.get("v1/time", &[]).await?;
        Ok(to_market_time(response.time.with_timezone(&Utc)))
    }

    /// Cash available in `currency`.
    pub async fn cash_balance(&self, currency: &str) -> Result<f64, BrokerError> {
        let path = format!("v1/accounts/{}/balances", self.account_number);
        let response: BalancesResponse = self.get(&path, &[]).await?;

        response
            .per_currency_balances
            .into_iter()
            .find(|b| b.currency == currency)
            .map(|b| b.cash)
            .ok_or_else(|| BrokerError::MalformedResponse(format!("no {currency} balance")))
    }

    /// The USD-listed common stock whose symbol is exactly `ticker`.
    pub async fn find_stock(&self, ticker: &str) -> Result<Option<SymbolMatch>, BrokerError> {
        let response: SymbolSearchResponse = self.get("v1/symbols/search", &[("prefix", ticker)]).await?;

        Ok(response
            .symbols
            .into_iter()
            .find(|s| s.currency == "USD" && s.symbol == ticker && s.security_type == "Stock"))
    }

    pub async fn quote(&self, symbol_id: u64) -> Result<LevelOneQuote, BrokerError> {
        let path = format!("v1/markets/quotes/{symbol_id}");
        let response: QuotesResponse = self.get(&path, &[]).await?;
        response
            .quotes
            .into_iter()
            .next()
            .ok_or_else(|| BrokerError::MalformedResponse(format!("{path}: empty quotes")))
    }

    pub async fn symbol_details(&self, symbol_id: u64) -> Result<SymbolDetails, BrokerError> {
        let path = format!("v1/symbols/{symbol_id}");
        let response: SymbolDetailsResponse = self.get(&path, &[]).await?;
        response
            .symbols
            .into_iter()
            .next()
            .ok_or_else(|| BrokerError::MalformedResponse(format!("{path}: empty symbols")))
    }

    pub async fn positions(&self) -> Result<Vec<Position>, BrokerError> {
        let path = format!("v1/accounts/{}/positions", self.account_number);
        let response: PositionsResponse = self.get(&path, &[]).await?;
        Ok(response.positions)
    }

    /// Live endpoint only with real money enabled; otherwise the impact
    /// endpoint, which evaluates the order without placing it.
    pub fn order_path(&self) -> String {
        let path = format!("v1/accounts/{}/orders", self.account_number);
        if self.use_real_money {
            path
        } else {
            format!("{path}/impact")
        }
    }

    pub async fn submit_order(&self, order: &OrderRequest) -> Result<OrderResponse, BrokerError> {
        self.post(&self.order_path(), order).await
    }
}

//! Shared fixtures for tests that talk to a mocked brokerage.

use std::{path::PathBuf, sync::Arc, time::Duration};

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::broker::{BrokerClient, TokenStore};
use crate::config::Config;
use crate::engine::calendar::MarketCalendar;
use crate::engine::executor::TradingEngine;
use crate::state::{build_state, SharedState};

pub const ACCOUNT: &str = "51234567";

/// Friday 2026-10-16, regular session.
pub const FRIDAY_NOON: &str = "2026-10-16T12:00:00.000000-04:00";
/// Friday 2026-10-16, inside the closeout window.
pub const FRIDAY_CLOSEOUT: &str = "2026-10-16T15:50:00.000000-04:00";
pub const SATURDAY_NOON: &str = "2026-10-17T12:00:00.000000-04:00";

/// Token endpoint pointing every API call back at `server`.
pub async fn tokens(server: &MockServer) -> Arc<TokenStore> {
    Mock::given(method("GET"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token":  "test-access",
            "api_server":    format!("{}/", server.uri()),
            "expires_in":    1800,
            "refresh_token": "test-refresh-next",
            "token_type":    "Bearer",
        })))
        .mount(server)
        .await;

    let store = TokenStore::new(format!("{}/oauth2/token", server.uri()), "test-refresh", Duration::from_secs(5))
        .unwrap();
    store.refresh().await.unwrap();
    Arc::new(store)
}

pub async fn engine(server: &MockServer, use_real_money: bool) -> TradingEngine {
    let broker = BrokerClient::new(tokens(server).await, ACCOUNT, use_real_money, Duration::from_secs(5)).unwrap();
    TradingEngine::new(broker, MarketCalendar::default(), Vec::new(), 1000.0)
}

pub fn config(server: &MockServer, market_data_dir: PathBuf, api_key: Option<&str>) -> Config {
    Config {
        account_number:       ACCOUNT.to_string(),
        use_real_money:       false,
        refresh_token:        "test-refresh".to_string(),
        auth_url:             format!("{}/oauth2/token", server.uri()),
        market_data_dir,
        cash_hold:            1000.0,
        ticker_blacklist:     Vec::new(),
        extra_holidays:       Vec::new(),
        closeout_interval:    Duration::from_secs(300),
        http_timeout:         Duration::from_secs(5),
        token_refresh_margin: Duration::from_secs(60),
        bind_addr:            "127.0.0.1:0".parse().unwrap(),
        api_key:              api_key.map(str::to_string),
    }
}

pub async fn state(server: &MockServer, market_data_dir: PathBuf, api_key: Option<&str>) -> SharedState {
    build_state(config(server, market_data_dir, api_key), tokens(server).await)
}

pub async fn mount_time(server: &MockServer, time: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/time"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "time": time })))
        .mount(server)
        .await;
}

pub async fn mount_balance(server: &MockServer, usd_cash: f64) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/accounts/{ACCOUNT}/balances")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "perCurrencyBalances": [
                { "currency": "CAD", "cash": 5.0 },
                { "currency": "USD", "cash": usd_cash },
            ]
        })))
        .mount(server)
        .await;
}

pub async fn mount_positions(server: &MockServer, positions: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/v1/accounts/{ACCOUNT}/positions")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "positions": positions })))
        .mount(server)
        .await;
}

/// A listed USD stock with search, quote and details endpoints.
pub struct StockFixture {
    pub ticker:         &'static str,
    pub symbol_id:      u64,
    pub price:          f64,
    pub halted:         bool,
    pub market_cap:     f64,
    pub average_volume: f64,
}

impl StockFixture {
    /// Large, liquid and trading.
    pub fn new(ticker: &'static str, symbol_id: u64, price: f64) -> Self {
        Self { ticker, symbol_id, price, halted: false, market_cap: 5.0e10, average_volume: 1.0e7 }
    }

    pub async fn mount(&self, server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/v1/symbols/search"))
            .and(query_param("prefix", self.ticker))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "symbols": [
                { "symbol": format!("{}.TO", self.ticker), "symbolId": self.symbol_id + 1000,
                  "currency": "CAD", "securityType": "Stock" },
                { "symbol": self.ticker, "symbolId": self.symbol_id,
                  "currency": "USD", "securityType": "Stock" },
            ]})))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/v1/markets/quotes/{}", self.symbol_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "quotes": [
                { "symbol": self.ticker, "lastTradePrice": self.price, "isHalted": self.halted }
            ]})))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path(format!("/v1/symbols/{}", self.symbol_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "symbols": [
                { "symbolId": self.symbol_id, "marketCap": self.market_cap,
                  "averageVol3Months": self.average_volume }
            ]})))
            .mount(server)
            .await;
    }
}

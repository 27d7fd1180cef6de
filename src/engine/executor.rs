//! # engine::executor
//!
//! **Order Execution Engine** — sizes orders from the live price, refuses
//! unsafe stocks, places market orders and verifies the acknowledgment.
//!
//! ## Batch Flow
//! ```text
//! mentions ─▶ session ─▶ decide() per mention ─▶ drop holds ─▶ balance
//!                │                 │                              │
//!           unavailable?     none actionable?              budget == 0?
//!                └──────── abort ──┴──────────────────────────────┘
//!
//! budget ─▶ bull / bear each strategy ─▶ success = AND of all orders
//! ```
//! An order failure is recorded and the remaining strategies still run.

use std::sync::atomic::Ordering;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::broker::types::{OrderRequest, OrderSide};
use crate::broker::BrokerClient;
use crate::engine::budget::budget_per;
use crate::engine::calendar::{MarketCalendar, MarketSession};
use crate::engine::decision::decide;
use crate::error::{BrokerError, OrderError, Rejection};
use crate::events::TradeEvent;
use crate::models::{Action, CompanyMention, Strategy};
use crate::state::AppState;

/// Companies below this market cap are not traded.
pub const MIN_MARKET_CAP: f64 = 1_000_000_000.0;
/// Minimum 3-month average daily volume, in shares.
pub const MIN_AVERAGE_VOLUME: f64 = 250_000.0;
/// Prices at or below this are penny stocks.
pub const MIN_PRICE: f64 = 1.0;

// ─── Results ──────────────────────────────────────────────────────────────────

/// An order the brokerage acknowledged with an order id.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedOrder {
    pub ticker:    String,
    pub symbol_id: u64,
    pub action:    OrderSide,
    pub quantity:  u64,
    pub order_id:  u64,
    pub simulated: bool,
    /// Buying-power impact, when the brokerage reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buying_power_effect: Option<f64>,
}

/// What happened to one actionable strategy.
#[derive(Debug, Clone, Serialize)]
pub struct OrderOutcome {
    pub ticker: String,
    pub action: Action,
    pub placed: Option<PlacedOrder>,
    pub error:  Option<String>,
}

impl OrderOutcome {
    fn from_result(ticker: &str, action: Action, result: Result<PlacedOrder, OrderError>) -> Self {
        match result {
            Ok(order) => Self { ticker: ticker.to_string(), action, placed: Some(order), error: None },
            Err(e) => Self { ticker: ticker.to_string(), action, placed: None, error: Some(e.to_string()) },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchAbort {
    NoMarketSession,
    NoActionableStrategies,
    NoBudget,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub batch_id:   Uuid,
    pub session:    Option<MarketSession>,
    pub strategies: Vec<Strategy>,
    pub balance:    Option<f64>,
    pub budget:     f64,
    pub orders:     Vec<OrderOutcome>,
    pub aborted:    Option<BatchAbort>,
    pub success:    bool,
}

impl BatchReport {
    fn new() -> Self {
        Self {
            batch_id:   Uuid::new_v4(),
            session:    None,
            strategies: Vec::new(),
            balance:    None,
            budget:     0.0,
            orders:     Vec::new(),
            aborted:    None,
            success:    false,
        }
    }

    fn abort(mut self, reason: BatchAbort) -> Self {
        warn!(batch_id = %self.batch_id, ?reason, "Batch abandoned");
        self.aborted = Some(reason);
        self.success = false;
        self
    }

    pub fn placed_count(&self) -> usize {
        self.orders.iter().filter(|o| o.placed.is_some()).count()
    }
}

/// Symbol and price that passed every safeguard.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckedPrice {
    pub symbol_id: u64,
    pub price:     f64,
}

/// Whole-share quantity for a budget, with the symbol it was priced on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizedOrder {
    pub symbol_id: u64,
    pub quantity:  u64,
}

// ─── Engine ───────────────────────────────────────────────────────────────────

pub struct TradingEngine {
    broker:    BrokerClient,
    calendar:  MarketCalendar,
    blacklist: Vec<String>,
    cash_hold: f64,
}

impl TradingEngine {
    pub fn new(broker: BrokerClient, calendar: MarketCalendar, blacklist: Vec<String>, cash_hold: f64) -> Self {
        Self { broker, calendar, blacklist, cash_hold }
    }

    /// Fresh engine with its own HTTP client, sharing only the token store.
    pub fn from_state(state: &AppState) -> Result<Self, BrokerError> {
        let config = &state.config;
        let broker = BrokerClient::new(
            state.tokens.clone(),
            config.account_number.clone(),
            config.use_real_money,
            config.http_timeout,
        )?;
        Ok(Self::new(broker, state.calendar.clone(), config.ticker_blacklist.clone(), config.cash_hold))
    }

    pub fn calendar(&self) -> &MarketCalendar {
        &self.calendar
    }

    pub fn broker(&self) -> &BrokerClient {
        &self.broker
    }

    // ─── Market / Account ─────────────────────────────────────────────────────

    pub async fn market_session(&self) -> Result<MarketSession, BrokerError> {
        let now = self.broker.server_time().await?;
        Ok(self.calendar.session_for(now))
    }

    /// USD cash. Any failure is logged and reads as `0.0`, which in turn
    /// means "no budget".
    pub async fn balance(&self) -> f64 {
        match self.broker.cash_balance("USD").await {
            Ok(cash) => cash,
            Err(e) => {
                error!(error = %e, "Missing balance, assuming $0");
                0.0
            }
        }
    }

    // ─── Pricing & Sizing ─────────────────────────────────────────────────────

    /// Last trade price, only if the stock passes every safeguard.
    pub async fn last_price(&self, ticker: &str) -> Result<CheckedPrice, OrderError> {
        let stock = self
            .broker
            .find_stock(ticker)
            .await?
            .ok_or_else(|| Rejection::SymbolNotFound(ticker.to_string()))?;

        let quote = self.broker.quote(stock.symbol_id).await?;
        if quote.is_halted {
            return Err(reject(Rejection::Halted(ticker.to_string())));
        }

        let details = self.broker.symbol_details(stock.symbol_id).await?;
        if details.market_cap < MIN_MARKET_CAP {
            return Err(reject(Rejection::MarketCapTooLow {
                ticker:     ticker.to_string(),
                market_cap: details.market_cap,
            }));
        }
        if details.average_volume_3_months < MIN_AVERAGE_VOLUME {
            return Err(reject(Rejection::VolumeTooLow {
                ticker:         ticker.to_string(),
                average_volume: details.average_volume_3_months,
            }));
        }

        let price = quote.last_trade_price;
        if price <= MIN_PRICE {
            return Err(reject(Rejection::PennyStock { ticker: ticker.to_string(), price }));
        }

        debug!(ticker, symbol = %quote.symbol, price, symbol_id = stock.symbol_id, "Quote accepted");
        Ok(CheckedPrice { symbol_id: stock.symbol_id, price })
    }

    /// Whole shares of `ticker` that `budget` buys at the current price.
    pub async fn size_order(&self, ticker: &str, budget: f64) -> Result<SizedOrder, OrderError> {
        let checked = self.last_price(ticker).await?;
        let quantity = (budget / checked.price).floor();

        debug!(ticker, quantity, price = checked.price, budget, "Determined quantity");

        if quantity < 1.0 {
            return Err(reject(Rejection::ZeroQuantity {
                ticker: ticker.to_string(),
                budget,
                price:  checked.price,
            }));
        }
        Ok(SizedOrder { symbol_id: checked.symbol_id, quantity: quantity as u64 })
    }

    // ─── Orders ───────────────────────────────────────────────────────────────

    /// Market order for `quantity` shares: positive buys, negative sells short.
    pub async fn place_order(&self, ticker: &str, quantity: i64) -> Result<PlacedOrder, OrderError> {
        if quantity == 0 {
            error!(ticker, "Cannot place order for 0 shares");
            return Err(OrderError::ZeroQuantity(ticker.to_string()));
        }

        let stock = self
            .broker
            .find_stock(ticker)
            .await?
            .ok_or_else(|| Rejection::SymbolNotFound(ticker.to_string()))?;

        self.place_order_for_symbol(stock.symbol_id, ticker, quantity).await
    }

    /// Same as [`TradingEngine::place_order`] when the symbol id is already known.
    pub async fn place_order_for_symbol(
        &self,
        symbol_id: u64,
        ticker: &str,
        quantity: i64,
    ) -> Result<PlacedOrder, OrderError> {
        let action = match quantity {
            q if q > 0 => OrderSide::Buy,
            q if q < 0 => OrderSide::Sell,
            _ => {
                error!(ticker, "Cannot place order for 0 shares");
                return Err(OrderError::ZeroQuantity(ticker.to_string()));
            }
        };

        let order = OrderRequest::market(symbol_id, action, quantity.unsigned_abs());
        let simulated = !self.broker.uses_real_money();

        info!(
            ticker,
            symbol_id,
            ?action,
            quantity = order.quantity,
            simulated,
            "🚀 Sending market order"
        );

        let response = self.broker.submit_order(&order).await?;

        let Some(order_id) = response.acknowledged_id() else {
            error!(ticker, ?response, "Malformed order response");
            return Err(OrderError::Unacknowledged {
                ticker: ticker.to_string(),
                body:   format!("{response:?}"),
            });
        };

        info!(ticker, order_id, "✅ Order acknowledged");

        Ok(PlacedOrder {
            ticker: ticker.to_string(),
            symbol_id,
            action,
            quantity: order.quantity,
            order_id,
            simulated,
            buying_power_effect: response.buying_power_effect,
        })
    }

    /// Buy now at market, as many shares as `budget` allows.
    pub async fn bull(&self, ticker: &str, budget: f64) -> Result<PlacedOrder, OrderError> {
        let sized = self.size_order(ticker, budget).await?;
        self.place_order_for_symbol(sized.symbol_id, ticker, sized.quantity as i64).await
    }

    /// Sell short now at market, as many shares as `budget` allows.
    pub async fn bear(&self, ticker: &str, budget: f64) -> Result<PlacedOrder, OrderError> {
        let sized = self.size_order(ticker, budget).await?;
        self.place_order_for_symbol(sized.symbol_id, ticker, -(sized.quantity as i64)).await
    }

    // ─── Batch ────────────────────────────────────────────────────────────────

    pub async fn make_trades(&self, mentions: &[CompanyMention]) -> BatchReport {
        let mut report = BatchReport::new();

        // ── 1. Market session ────────────────────────────────────────────────
        let session = match self.market_session().await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "Not trading without market status");
                return report.abort(BatchAbort::NoMarketSession);
            }
        };
        report.session = Some(session);

        // ── 2. Strategies, holds dropped ─────────────────────────────────────
        report.strategies = mentions.iter().map(|m| decide(m, session, &self.blacklist)).collect();

        let actionable: Vec<Strategy> = report
            .strategies
            .iter()
            .filter(|s| {
                if !s.is_actionable() {
                    warn!(ticker = %s.ticker, reason = %s.reason, "Dropping strategy");
                }
                s.is_actionable()
            })
            .cloned()
            .collect();

        if actionable.is_empty() {
            return report.abort(BatchAbort::NoActionableStrategies);
        }

        // ── 3. Budget ────────────────────────────────────────────────────────
        let balance = self.balance().await;
        report.balance = Some(balance);

        let budget = budget_per(balance, actionable.len(), self.cash_hold);
        if budget <= 0.0 {
            warn!(balance, strategies = actionable.len(), "No budget for trading");
            return report.abort(BatchAbort::NoBudget);
        }
        report.budget = budget;
        debug!(strategies = actionable.len(), budget, "Using budget");

        // ── 4. Execute every strategy ────────────────────────────────────────
        let mut success = true;
        for strategy in &actionable {
            let ticker = strategy.ticker.as_str();
            let result = match strategy.action {
                Action::Bull => {
                    debug!(ticker, budget, "Bull");
                    self.bull(ticker, budget).await
                }
                Action::Bear => {
                    debug!(ticker, budget, "Bear");
                    self.bear(ticker, budget).await
                }
                Action::Hold => continue,
            };

            if let Err(e) = &result {
                warn!(ticker, error = %e, "Strategy not executed");
            }
            success &= result.is_ok();
            report.orders.push(OrderOutcome::from_result(ticker, strategy.action, result));
        }

        report.success = success;
        report
    }
}

fn reject(rejection: Rejection) -> OrderError {
    error!(reason = %rejection, "Order rejected by safeguard");
    OrderError::Rejected(rejection)
}

// ─── Entry Point ──────────────────────────────────────────────────────────────

/// Handle one classified social-media event end to end with a dedicated
/// engine, then publish the outcome.
pub async fn decide_and_trade(
    state: &AppState,
    mentions: &[CompanyMention],
) -> Result<BatchReport, BrokerError> {
    let engine = TradingEngine::from_state(state)?;
    let report = engine.make_trades(mentions).await;

    state.batch_count.fetch_add(1, Ordering::Relaxed);
    state.order_count.fetch_add(report.placed_count() as u64, Ordering::Relaxed);

    info!(
        batch_id = %report.batch_id,
        success  = report.success,
        orders   = report.orders.len(),
        aborted  = ?report.aborted,
        "Trade batch finished"
    );

    state.broadcast(&TradeEvent::BatchCompleted { report: Box::new(report.clone()) });
    Ok(report)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

//! # engine::closeout
//!
//! **End-of-Day Closeout** — keeps the book flat overnight. Every
//! `CLOSEOUT_INTERVAL_SECS` the scheduler asks the brokerage clock whether we
//! are in the closing window (15:45–16:00 New York) and, if so, sends one
//! offsetting market order per open position.

use std::sync::atomic::Ordering;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::engine::executor::{PlacedOrder, TradingEngine};
use crate::error::{AppError, BrokerError};
use crate::events::TradeEvent;
use crate::state::{AppState, SharedState};

#[derive(Debug, Clone, Serialize)]
pub struct ClosedPosition {
    pub symbol:   String,
    /// Signed quantity sent: negative sells a long, positive covers a short.
    pub quantity: i64,
    pub placed:   Option<PlacedOrder>,
    pub error:    Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CloseoutReport {
    /// Brokerage clock in exchange time, RFC 3339.
    pub market_time: String,
    pub in_window:   bool,
    pub orders:      Vec<ClosedPosition>,
    pub success:     bool,
}

/// One closeout check. Outside the window this only reads the clock.
pub async fn closeout_tick(engine: &TradingEngine) -> Result<CloseoutReport, BrokerError> {
    let now = engine.broker().server_time().await?;
    let mut report = CloseoutReport {
        market_time: now.to_rfc3339(),
        in_window:   engine.calendar().in_closeout_window(now),
        orders:      Vec::new(),
        success:     true,
    };

    if !report.in_window {
        debug!(market_time = %report.market_time, "Outside closeout window");
        return Ok(report);
    }

    let positions = engine.broker().positions().await?;
    info!(count = positions.len(), "🔔 Closing out positions");

    for position in positions {
        let quantity = position.offsetting_quantity();
        if quantity == 0 {
            debug!(symbol = %position.symbol, "Position already flat");
            continue;
        }

        let result = engine
            .place_order_for_symbol(position.symbol_id, &position.symbol, quantity)
            .await;

        let closed = match result {
            Ok(order) => ClosedPosition { symbol: position.symbol, quantity, placed: Some(order), error: None },
            Err(e) => {
                error!(symbol = %position.symbol, quantity, error = %e, "Failed to close position");
                report.success = false;
                ClosedPosition { symbol: position.symbol, quantity, placed: None, error: Some(e.to_string()) }
            }
        };
        report.orders.push(closed);
    }

    Ok(report)
}

/// Run one tick with a dedicated engine; publish it when it did anything.
pub async fn run_closeout_cycle(state: &AppState) -> Result<CloseoutReport, AppError> {
    let engine = TradingEngine::from_state(state)?;
    let report = closeout_tick(&engine).await?;

    if report.in_window {
        let placed = report.orders.iter().filter(|o| o.placed.is_some()).count();
        state.order_count.fetch_add(placed as u64, Ordering::Relaxed);
        state.broadcast(&TradeEvent::CloseoutCompleted { report: Box::new(report.clone()) });
    }
    Ok(report)
}

/// Background loop. Each tick runs on its own task so a panic cannot stop
/// the schedule. Never returns.
pub async fn run_closeout_scheduler(state: SharedState) {
    let interval = state.config.closeout_interval;
    info!(?interval, "⏰ Closeout scheduler started");

    loop {
        let tick_state = state.clone();
        let tick = tokio::spawn(async move { run_closeout_cycle(&tick_state).await });

        match tick.await {
            Ok(Ok(report)) if report.in_window => {
                info!(orders = report.orders.len(), success = report.success, "Closeout finished");
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => warn!(error = %e, "Closeout check failed"),
            Err(e) => error!(error = %e, "Closeout task panicked"),
        }

        tokio::time::sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::state::build_state;
    use crate::test_support::{self, FRIDAY_CLOSEOUT, FRIDAY_NOON};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_outside_window_is_noop() {
        let server = MockServer::start().await;
        let engine = test_support::engine(&server, false).await;
        test_support::mount_time(&server, FRIDAY_NOON).await;
        Mock::given(method("GET"))
            .and(path(format!("/v1/accounts/{}/positions", test_support::ACCOUNT)))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let report = closeout_tick(&engine).await.unwrap();
        assert!(!report.in_window);
        assert!(report.orders.is_empty());
        assert!(report.success);
    }

    #[tokio::test]
    async fn test_offsets_every_open_position() {
        let server = MockServer::start().await;
        let engine = test_support::engine(&server, false).await;
        test_support::mount_time(&server, FRIDAY_CLOSEOUT).await;
        test_support::mount_positions(&server, json!([
            { "symbol": "GM", "symbolId": 7, "openQuantity": 12 },
            { "symbol": "F",  "symbolId": 8, "openQuantity": -30 },
            { "symbol": "TM", "symbolId": 9, "openQuantity": 0 },
        ]))
        .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "symbolId": 7, "quantity": 12, "action": "Sell" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "orderId": 101, "buyingPowerEffect": 1200.0 })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "symbolId": 8, "quantity": 30, "action": "Buy" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "orderId": 102, "buyingPowerEffect": -300.0 })))
            .expect(1)
            .mount(&server)
            .await;

        let report = closeout_tick(&engine).await.unwrap();

        assert!(report.in_window);
        assert!(report.success);
        let sent: Vec<(&str, i64)> = report.orders.iter().map(|o| (o.symbol.as_str(), o.quantity)).collect();
        assert_eq!(sent, vec![("GM", -12), ("F", 30)]);
    }

    #[tokio::test]
    async fn test_failed_close_marks_report() {
        let server = MockServer::start().await;
        let engine = test_support::engine(&server, false).await;
        test_support::mount_time(&server, FRIDAY_CLOSEOUT).await;
        test_support::mount_positions(&server, json!([{ "symbol": "GM", "symbolId": 7, "openQuantity": 5 }])).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("down"))
            .mount(&server)
            .await;

        let report = closeout_tick(&engine).await.unwrap();
        assert!(!report.success);
        assert!(report.orders[0].error.is_some());
    }

    #[tokio::test]
    async fn test_scheduler_rearms_after_failed_tick() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_support::config(&server, dir.path().to_path_buf(), None);
        config.closeout_interval = Duration::from_millis(20);
        let state = build_state(config, test_support::tokens(&server).await);
        Mock::given(method("GET"))
            .and(path("/v1/time"))
            .respond_with(ResponseTemplate::new(500).set_body_string("clock down"))
            .expect(2..)
            .mount(&server)
            .await;

        let scheduler = tokio::spawn(run_closeout_scheduler(state));
        tokio::time::sleep(Duration::from_millis(300)).await;
        scheduler.abort();

        server.verify().await;
    }

    #[tokio::test]
    async fn test_cycle_broadcasts_in_window() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let state = test_support::state(&server, dir.path().to_path_buf(), None).await;
        test_support::mount_time(&server, FRIDAY_CLOSEOUT).await;
        test_support::mount_positions(&server, json!([])).await;
        let mut events = state.broadcast_tx.subscribe();

        let report = run_closeout_cycle(&state).await.unwrap();

        assert!(report.in_window);
        let event: serde_json::Value = serde_json::from_str(&events.recv().await.unwrap()).unwrap();
        assert_eq!(event["event"], "CLOSEOUT_COMPLETED");
    }
}

//! # state
//!
//! Process-wide state shared by every route handler and background task.
//!
//! Only two things here are mutable: the [`TokenStore`] (guards its own
//! refresh critical section) and the counters. Engines are *not* shared:
//! each trigger event builds one from this state with a fresh HTTP client.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broker::TokenStore;
use crate::config::Config;
use crate::engine::calendar::MarketCalendar;
use crate::engine::history::{QuoteCache, QuoteHistory};
use crate::events::TradeEvent;

// ─── AppState ─────────────────────────────────────────────────────────────────

pub struct AppState {
    pub config: Arc<Config>,

    /// The one brokerage session for this process.
    pub tokens: Arc<TokenStore>,

    pub calendar: MarketCalendar,

    pub history: QuoteHistory,

    /// Pre-serialized [`TradeEvent`] JSON for the monitor socket / alerting.
    pub broadcast_tx: broadcast::Sender<String>,

    // ── Metrics ───────────────────────────────────────────────────────────────
    pub batch_count: AtomicU64,
    pub order_count: AtomicU64,
}

impl AppState {
    pub fn new(config: Config, tokens: Arc<TokenStore>) -> Self {
        let (broadcast_tx, _) = broadcast::channel(256);
        let calendar = MarketCalendar::new(&config.extra_holidays);
        let history = QuoteHistory::new(QuoteCache::new(&config.market_data_dir), calendar.clone());

        Self {
            config: Arc::new(config),
            tokens,
            calendar,
            history,
            broadcast_tx,
            batch_count: AtomicU64::new(0),
            order_count: AtomicU64::new(0),
        }
    }

    /// Publish to all subscribers. Having none (headless mode) is fine.
    pub fn broadcast(&self, event: &TradeEvent) {
        let _ = self.broadcast_tx.send(event.to_json());
    }
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

pub fn build_state(config: Config, tokens: Arc<TokenStore>) -> SharedState {
    Arc::new(AppState::new(config, tokens))
}

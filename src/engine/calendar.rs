//! # engine::calendar
//!
//! **Market Calendar** — which days the NYSE/NASDAQ trade, and which intraday
//! session an instant belongs to. All times are exchange-local
//! (`America/New_York`); both exchanges share the same hours, including the
//! brokerage's extended pre/after-market windows.
//!
//! ```text
//!  07:30        09:30                 16:00        17:30
//!    │    Pre     │        Open         │   After    │   Closed ...
//!    ├────────────┼─────────────────────┼────────────┤
//!                                15:45──┤ closeout window
//! ```

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::{America::New_York, Tz};
use serde::Serialize;
use tracing::debug;

/// The exchanges' home timezone.
pub const MARKET_TIMEZONE: Tz = New_York;

/// Days the markets are closed apart from weekends.
///
/// TODO: load a maintained exchange calendar instead of this list; years not
/// listed here only get weekend closures.
const TRADING_HOLIDAYS: &[(i32, u32, u32)] = &[
    (2017, 1, 2),
    // 2025
    (2025, 1, 1), (2025, 1, 9), (2025, 1, 20), (2025, 2, 17), (2025, 4, 18),
    (2025, 5, 26), (2025, 6, 19), (2025, 7, 4), (2025, 9, 1), (2025, 11, 27),
    (2025, 12, 25),
    // 2026
    (2026, 1, 1), (2026, 1, 19), (2026, 2, 16), (2026, 4, 3), (2026, 5, 25),
    (2026, 6, 19), (2026, 7, 3), (2026, 9, 7), (2026, 11, 26), (2026, 12, 25),
];

// ─── MarketSession ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketSession {
    Pre,
    Open,
    After,
    Closed,
}

impl MarketSession {
    /// Pre-market and regular hours are the only sessions we trade in.
    #[inline]
    pub fn is_tradeable(self) -> bool {
        matches!(self, MarketSession::Pre | MarketSession::Open)
    }
}

// ─── MarketCalendar ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MarketCalendar {
    holidays: Vec<NaiveDate>,
}

impl Default for MarketCalendar {
    fn default() -> Self {
        Self::new(&[])
    }
}

impl MarketCalendar {
    /// Built-in holiday list plus `extra` days.
    pub fn new(extra: &[NaiveDate]) -> Self {
        let mut holidays: Vec<NaiveDate> = TRADING_HOLIDAYS
            .iter()
            .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
            .chain(extra.iter().copied())
            .collect();
        holidays.sort_unstable();
        holidays.dedup();
        Self { holidays }
    }

    pub fn is_trading_day(&self, day: NaiveDate) -> bool {
        if self.holidays.binary_search(&day).is_ok() {
            debug!(%day, "Identified holiday");
            return false;
        }

        if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            debug!(%day, "Identified weekend");
            return false;
        }

        true
    }

    /// Walk backwards one calendar day at a time until a trading day.
    pub fn previous_trading_day(&self, day: NaiveDate) -> NaiveDate {
        let mut previous = day - Duration::days(1);
        while !self.is_trading_day(previous) {
            previous -= Duration::days(1);
        }
        debug!(%day, %previous, "Previous trading day");
        previous
    }

    /// Walk forwards one calendar day at a time until a trading day.
    pub fn next_trading_day(&self, day: NaiveDate) -> NaiveDate {
        let mut next = day + Duration::days(1);
        while !self.is_trading_day(next) {
            next += Duration::days(1);
        }
        debug!(%day, %next, "Next trading day");
        next
    }

    /// Bucket an instant into its session. Every bucket is `[start, end)`.
    pub fn session_for(&self, timestamp: DateTime<Tz>) -> MarketSession {
        let local = timestamp.with_timezone(&MARKET_TIMEZONE);
        if !self.is_trading_day(local.date_naive()) {
            return MarketSession::Closed;
        }

        let now = local.time();
        let session = if now >= hm(7, 30) && now < hm(9, 30) {
            MarketSession::Pre
        } else if now >= hm(9, 30) && now < hm(16, 0) {
            MarketSession::Open
        } else if now >= hm(16, 0) && now < hm(17, 30) {
            MarketSession::After
        } else {
            MarketSession::Closed
        };

        debug!(%local, ?session, "Current market session");
        session
    }

    /// `true` from 15:45 up to and including 16:00 on a trading day.
    pub fn in_closeout_window(&self, timestamp: DateTime<Tz>) -> bool {
        let local = timestamp.with_timezone(&MARKET_TIMEZONE);
        if !self.is_trading_day(local.date_naive()) {
            return false;
        }
        let now = local.time();
        now >= hm(15, 45) && now <= hm(16, 0)
    }
}

// ─── Time Helpers ─────────────────────────────────────────────────────────────

#[inline]
fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// UTC instant as exchange-local (New York) time.
pub fn to_market_time(utc: DateTime<Utc>) -> DateTime<Tz> {
    utc.with_timezone(&MARKET_TIMEZONE)
}

/// Build an exchange-local timestamp. `None` for impossible or DST-ambiguous
/// wall-clock times.
pub fn market_time(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Option<DateTime<Tz>> {
    MARKET_TIMEZONE
        .with_ymd_and_hms(year, month, day, hour, minute, second)
        .single()
}

/// Same calendar date, wall clock moved to `hour:minute:second`.
pub fn at_time_of_day(day: NaiveDate, hour: u32, minute: u32, second: u32) -> Option<DateTime<Tz>> {
    market_time(day.year(), day.month(), day.day(), hour, minute, second)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

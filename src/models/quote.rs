//! # models::quote
//!
//! Historical quotes read from the local cache, and the pair of prices the
//! reconstructor derives from them.

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

/// One trade print, in exchange-local time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quote {
    pub time:  DateTime<Tz>,
    pub price: f64,
}

/// Price "at" a moment, and the close of that trading day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoricalPrices {
    pub at:  f64,
    pub eod: f64,
}

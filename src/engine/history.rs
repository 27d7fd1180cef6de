//! # engine::history
//!
//! **Historical Quote Reconstructor** — finds the price "at" an instant and
//! that trading day's close, from per-day quote files on local disk. Used to
//! measure how a stock moved around an event.
//!
//! ## Cache Layout
//! `<dir>/<TICKER>_<YYYYMMDD>.txt`, one file per ticker per trading day:
//! ```text
//! header line (skipped)
//! <unused>,<YYYYMMDDHHmm>,<price>,...
//! ```
//! Times are exchange-local. A missing file or any malformed line makes the
//! whole file unusable.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use tracing::{debug, error, warn};

use crate::engine::calendar::{at_time_of_day, MarketCalendar, MARKET_TIMEZONE};
use crate::error::QuoteError;
use crate::models::{HistoricalPrices, Quote};

/// How many trading days the lookup walks back before giving up.
pub const MAX_LOOKBACK_DAYS: usize = 14;

// ─── Quote Cache ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct QuoteCache {
    dir: PathBuf,
}

impl QuoteCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, ticker: &str, day: NaiveDate) -> PathBuf {
        self.dir.join(format!("{ticker}_{}.txt", day.format("%Y%m%d")))
    }

    /// All quotes recorded for `ticker` on `day`, in file order.
    pub async fn day_quotes(&self, ticker: &str, day: NaiveDate) -> Result<Vec<Quote>, QuoteError> {
        let path = self.path_for(ticker, day);

        let contents = tokio::fs::read_to_string(&path).await.map_err(|e| {
            error!(ticker, %day, path = %path.display(), error = %e, "Day quotes not on file");
            QuoteError::DataUnavailable(format!("{}: {e}", path.display()))
        })?;

        parse_quotes(&contents, &path)
    }
}

fn parse_quotes(contents: &str, path: &Path) -> Result<Vec<Quote>, QuoteError> {
    let malformed = |what: &str, value: &str| {
        error!(path = %path.display(), value, "Failed to decode {what}");
        QuoteError::DataUnavailable(format!("{}: bad {what} '{value}'", path.display()))
    };

    let mut quotes = Vec::new();

    for line in contents.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let mut columns = line.split(',').skip(1);
        let time_str = columns.next().map(str::trim).unwrap_or_default();
        let price_str = columns.next().map(str::trim).unwrap_or_default();

        let time = NaiveDateTime::parse_from_str(time_str, "%Y%m%d%H%M")
            .ok()
            .and_then(|naive| MARKET_TIMEZONE.from_local_datetime(&naive).earliest())
            .ok_or_else(|| malformed("market time", time_str))?;

        let price: f64 = price_str
            .parse()
            .map_err(|_| malformed("price", price_str))?;

        quotes.push(Quote { time, price });
    }

    Ok(quotes)
}

// ─── Reconstructor ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct QuoteHistory {
    cache:    QuoteCache,
    calendar: MarketCalendar,
}

impl QuoteHistory {
    pub fn new(cache: QuoteCache, calendar: MarketCalendar) -> Self {
        Self { cache, calendar }
    }

    /// Last price at or before `timestamp`, and the matching end-of-day price.
    ///
    /// Days without usable data are skipped by stepping to the previous
    /// trading day's close, at most [`MAX_LOOKBACK_DAYS`] times.
    pub async fn reconstruct(
        &self,
        ticker: &str,
        timestamp: DateTime<Tz>,
    ) -> Result<HistoricalPrices, QuoteError> {
        let start = timestamp.with_timezone(&MARKET_TIMEZONE);
        let mut timestamp = start;

        for depth in 0..MAX_LOOKBACK_DAYS {
            let day = timestamp.date_naive();
            match self.cache.day_quotes(ticker, day).await {
                Ok(quotes) if !quotes.is_empty() => {
                    return self.prices_for_day(ticker, timestamp, &quotes).await;
                }
                _ => {
                    warn!(ticker, %day, depth, "No quotes for day, trying previous trading day");
                    let previous = self.calendar.previous_trading_day(day);
                    timestamp = at_time_of_day(previous, 15, 59, 59).ok_or_else(|| {
                        QuoteError::DataUnavailable(format!("no market close time on {previous}"))
                    })?;
                }
            }
        }

        warn!(ticker, from = %start, "Limiting lookback");
        Err(QuoteError::RecursionLimit {
            ticker: ticker.to_string(),
            days:   MAX_LOOKBACK_DAYS,
            from:   start.date_naive(),
        })
    }

    async fn prices_for_day(
        &self,
        ticker: &str,
        timestamp: DateTime<Tz>,
        quotes: &[Quote],
    ) -> Result<HistoricalPrices, QuoteError> {
        let (first, last) = match (quotes.first(), quotes.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => return Err(QuoteError::DataUnavailable(format!("no quotes for {ticker}"))),
        };
        let day = timestamp.date_naive();

        let (at, eod) = if timestamp < first.time {
            debug!(ticker, "Using previous day's last quote");
            let previous = self.calendar.previous_trading_day(day);
            let previous_last = self.last_quote_of(ticker, previous).await?;
            (previous_last, last)
        } else if timestamp <= last.time {
            debug!(ticker, "Using closest quote");
            let closest = quotes
                .iter()
                .take_while(|q| q.time <= timestamp)
                .last()
                .copied()
                .unwrap_or(first);
            (closest, last)
        } else {
            debug!(ticker, "Using last quote");
            let next = self.calendar.next_trading_day(day);
            let next_last = self.last_quote_of(ticker, next).await?;
            (last, next_last)
        };

        debug!(ticker, at = at.price, eod = eod.price, "Using quotes");
        Ok(HistoricalPrices { at: at.price, eod: eod.price })
    }

    async fn last_quote_of(&self, ticker: &str, day: NaiveDate) -> Result<Quote, QuoteError> {
        let quotes = self.cache.day_quotes(ticker, day).await?;
        quotes.last().copied().ok_or_else(|| {
            error!(ticker, %day, "No quotes for day");
            QuoteError::DataUnavailable(format!("no quotes for {ticker} on {day}"))
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

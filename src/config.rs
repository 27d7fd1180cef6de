//! # config — service settings from environment variables
//!
//! Everything the trading service needs at runtime. `.env` is loaded by
//! `main` before [`Config::from_env`] runs, so either source works.

use std::{net::SocketAddr, path::PathBuf, time::Duration};

use anyhow::Context;
use chrono::NaiveDate;

use crate::engine::budget::DEFAULT_CASH_HOLD;

/// Default OAuth endpoint for exchanging a refresh token.
pub const DEFAULT_AUTH_URL: &str = "https://login.questrade.com/oauth2/token";

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Brokerage account that orders, balances and positions belong to.
    pub account_number:     String,
    /// `true` only when `USE_REAL_MONEY=YES`; routes orders to the live endpoint.
    pub use_real_money:     bool,
    /// Refresh token used for the very first token exchange.
    pub refresh_token:      String,
    pub auth_url:           String,
    /// Directory holding `<TICKER>_<YYYYMMDD>.txt` quote files.
    pub market_data_dir:    PathBuf,
    /// Cash in dollars that is never allocated to a trade.
    pub cash_hold:          f64,
    /// Tickers that are never traded (e.g. to avoid insider trading).
    pub ticker_blacklist:   Vec<String>,
    /// Holidays on top of the built-in calendar.
    pub extra_holidays:     Vec<NaiveDate>,
    pub closeout_interval:  Duration,
    /// Transport timeout for every brokerage call.
    pub http_timeout:       Duration,
    /// How long before expiry the access token gets refreshed.
    pub token_refresh_margin: Duration,
    pub bind_addr:          SocketAddr,
    /// `None` = inbound API open (dev mode).
    pub api_key:            Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let account_number = std::env::var("QUESTRADE_ACCOUNT_NUMBER")
            .context("QUESTRADE_ACCOUNT_NUMBER environment variable is required")?;

        let refresh_token = std::env::var("QUESTRADE_REFRESH_TOKEN")
            .context("QUESTRADE_REFRESH_TOKEN environment variable is required")?;

        let cash_hold: f64 = match std::env::var("CASH_HOLD") {
            Ok(raw) => raw.parse().context("CASH_HOLD must be a number")?,
            Err(_) => DEFAULT_CASH_HOLD,
        };

        let extra_holidays = parse_holidays(&std::env::var("MARKET_HOLIDAYS").unwrap_or_default())?;

        let bind_addr: SocketAddr = std::env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .context("BIND_ADDR must be a socket address")?;

        Ok(Self {
            account_number,
            use_real_money:       std::env::var("USE_REAL_MONEY").map(|v| v == "YES").unwrap_or(false),
            refresh_token,
            auth_url:             std::env::var("QUESTRADE_AUTH_URL").unwrap_or_else(|_| DEFAULT_AUTH_URL.to_string()),
            market_data_dir:      std::env::var("MARKET_DATA_DIR").unwrap_or_else(|_| "market_data".to_string()).into(),
            cash_hold,
            ticker_blacklist:     parse_list(&std::env::var("TICKER_BLACKLIST").unwrap_or_default()),
            extra_holidays,
            closeout_interval:    Duration::from_secs(env_u64("CLOSEOUT_INTERVAL_SECS", 300)),  // default: 5 minutes
            http_timeout:         Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS", 10)),
            token_refresh_margin: Duration::from_secs(env_u64("TOKEN_REFRESH_MARGIN_SECS", 60)),
            bind_addr,
            api_key:              std::env::var("API_KEY").ok().filter(|k| !k.is_empty()),
        })
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// Comma-separated list, blanks dropped, tickers upper-cased.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_holidays(raw: &str) -> anyhow::Result<Vec<NaiveDate>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .with_context(|| format!("MARKET_HOLIDAYS entry '{s}' is not YYYY-MM-DD"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_uppercases() {
        assert_eq!(parse_list(" tsla, ,gm ,"), vec!["TSLA".to_string(), "GM".to_string()]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_holidays() {
        let days = parse_holidays("2026-11-26, 2026-12-25").unwrap();
        assert_eq!(days, vec![
            NaiveDate::from_ymd_opt(2026, 11, 26).unwrap(),
            NaiveDate::from_ymd_opt(2026, 12, 25).unwrap(),
        ]);
    }

    #[test]
    fn test_parse_holidays_rejects_garbage() {
        assert!(parse_holidays("26/11/2026").is_err());
    }
}

//! # error
//!
//! Error types for every layer of the service.
//!
//! * [`BrokerError`]: anything that went wrong talking to the brokerage.
//! * [`QuoteError`]: the local quote cache could not answer a lookup.
//! * [`Rejection`]: a safety filter refused to trade. Not a failure of the
//!   system, just a normal "no order" outcome with a reason.
//! * [`OrderError`]: why a single order was not placed.
//! * [`AppError`]: what route handlers return; converted into a JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use serde_json::json;
use thiserror::Error;

// ─── Brokerage ────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum BrokerError {
    /// No access token has been obtained yet (or the first exchange failed).
    #[error("no brokerage session: token exchange has not succeeded yet")]
    NoSession,

    /// Network failure, timeout, or an unreadable body.
    #[error("transport error: {0}")]
    Transport(String),

    /// The brokerage answered with a non-2xx status.
    #[error("brokerage HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The body was not the JSON shape we expect (missing / mistyped fields).
    #[error("malformed brokerage response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for BrokerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Transport(format!("timed out: {err}"))
        } else if err.is_connect() {
            Self::Transport(format!("connection failed: {err}"))
        } else {
            Self::Transport(err.to_string())
        }
    }
}

// ─── Quote Cache ──────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum QuoteError {
    /// Missing file, unreadable file, malformed line, or no quotes at all.
    #[error("quote data unavailable: {0}")]
    DataUnavailable(String),

    /// Walked back this many days without finding any quotes.
    #[error("no quotes for {ticker} within {days} trading days before {from}")]
    RecursionLimit {
        ticker: String,
        days:   usize,
        from:   NaiveDate,
    },
}

// ─── Trading Policy ───────────────────────────────────────────────────────────

/// A safeguard refused the trade. Logged, never raised to the HTTP layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("no tradeable USD stock listing for {0}")]
    SymbolNotFound(String),

    #[error("trading halt active for {0}")]
    Halted(String),

    #[error("market cap too low (under 1B) for {ticker}: {market_cap}")]
    MarketCapTooLow { ticker: String, market_cap: f64 },

    #[error("volume too low (under 250k) for {ticker}: {average_volume}")]
    VolumeTooLow { ticker: String, average_volume: f64 },

    #[error("penny stock {ticker} at ${price}")]
    PennyStock { ticker: String, price: f64 },

    #[error("budget ${budget} buys no shares of {ticker} at ${price}")]
    ZeroQuantity { ticker: String, budget: f64, price: f64 },
}

// ─── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum OrderError {
    /// Caller asked for a zero-share order. Nothing was sent.
    #[error("cannot place order for 0 shares of {0}")]
    ZeroQuantity(String),

    #[error("order rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    /// The brokerage answered but did not acknowledge the order.
    #[error("order for {ticker} not acknowledged: {body}")]
    Unacknowledged { ticker: String, body: String },
}

// ─── HTTP Layer ───────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AppError {
    /// The request payload was syntactically correct but semantically invalid.
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The brokerage could not be reached or answered nonsense.
    #[error("Brokerage unavailable: {0}")]
    Unavailable(String),
}

impl From<BrokerError> for AppError {
    fn from(err: BrokerError) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<QuoteError> for AppError {
    fn from(err: QuoteError) -> Self {
        Self::NotFound(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unavailable(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        let body = Json(json!({
            "ok":    false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_messages_name_the_ticker() {
        let err = Rejection::MarketCapTooLow { ticker: "ACME".into(), market_cap: 5.0e8 };
        assert!(err.to_string().contains("ACME"));
        assert!(err.to_string().contains("under 1B"));

        let err = OrderError::from(Rejection::Halted("GM".into()));
        assert!(err.to_string().contains("halt"));
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::BadRequest("x".into()).into_response().status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::from(BrokerError::NoSession).into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        let quote_err = QuoteError::DataUnavailable("gone".into());
        assert_eq!(AppError::from(quote_err).into_response().status(), StatusCode::NOT_FOUND);
    }
}

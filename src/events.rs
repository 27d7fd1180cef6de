//! # events
//!
//! Defines [`TradeEvent`] — every outcome the service publishes on its
//! broadcast channel. The `/ws/monitor` socket forwards them verbatim, and an
//! alert publisher can subscribe the same way.
//!
//! Events are serialized to a JSON `String` before sending so the channel
//! stays `Clone`-friendly.

use serde::Serialize;

use crate::engine::closeout::CloseoutReport;
use crate::engine::executor::BatchReport;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeEvent {
    /// A mention batch finished, successfully or not.
    BatchCompleted {
        report: Box<BatchReport>,
    },

    /// The closeout task flattened (or tried to flatten) the book.
    CloseoutCompleted {
        report: Box<CloseoutReport>,
    },

    /// The token refresher could not renew the brokerage session.
    TokenRefreshFailed {
        error: String,
    },
}

impl TradeEvent {
    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"SERIALIZATION_ERROR"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_is_tagged() {
        let json = TradeEvent::TokenRefreshFailed { error: "timeout".into() }.to_json();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["event"], "TOKEN_REFRESH_FAILED");
        assert_eq!(value["error"], "timeout");
    }
}

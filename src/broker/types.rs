//! # broker::types
//!
//! Wire shapes of the brokerage REST API. Required fields are non-`Option`
//! so a missing or mistyped field fails decoding as a whole, which the client
//! reports as one `MalformedResponse`.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::models::Position;

// ─── OAuth ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token:  String,
    /// Base URL every other call goes to, e.g. `https://api01.iq.questrade.com/`.
    pub api_server:    String,
    /// Lifetime of `access_token` in seconds.
    pub expires_in:    i64,
    /// Replacement refresh token. The one we sent is now dead.
    pub refresh_token: String,
    pub token_type:    String,
}

// ─── Clock / Account ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TimeResponse {
    pub time: DateTime<FixedOffset>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancesResponse {
    pub per_currency_balances: Vec<CurrencyBalance>,
}

#[derive(Debug, Deserialize)]
pub struct CurrencyBalance {
    pub currency: String,
    pub cash:     f64,
}

#[derive(Debug, Deserialize)]
pub struct PositionsResponse {
    pub positions: Vec<Position>,
}

// ─── Symbols / Quotes ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SymbolSearchResponse {
    pub symbols: Vec<SymbolMatch>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolMatch {
    pub symbol:        String,
    pub symbol_id:     u64,
    pub currency:      String,
    pub security_type: String,
}

#[derive(Debug, Deserialize)]
pub struct SymbolDetailsResponse {
    pub symbols: Vec<SymbolDetails>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDetails {
    pub market_cap: f64,
    #[serde(rename = "averageVol3Months")]
    pub average_volume_3_months: f64,
}

#[derive(Debug, Deserialize)]
pub struct QuotesResponse {
    pub quotes: Vec<LevelOneQuote>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelOneQuote {
    pub symbol:           String,
    pub last_trade_price: f64,
    pub is_halted:        bool,
}

// ─── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Market / Day / AUTO-routed order. Always this shape.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub symbol_id:         u64,
    pub quantity:          u64,
    pub iceberg_quantity:  u64,
    pub order_type:        &'static str,
    pub action:            OrderSide,
    pub time_in_force:     &'static str,
    pub primary_route:     &'static str,
    pub secondary_route:   &'static str,
}

impl OrderRequest {
    pub fn market(symbol_id: u64, action: OrderSide, quantity: u64) -> Self {
        Self {
            symbol_id,
            quantity,
            iceberg_quantity: 1,
            order_type:       "Market",
            action,
            time_in_force:    "Day",
            primary_route:    "AUTO",
            secondary_route:  "AUTO",
        }
    }
}

/// An order counts as acknowledged only when an id comes back. The impact
/// (dry-run) endpoint may add a buying-power estimate.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    #[serde(default)]
    pub order_id:            Option<u64>,
    #[serde(default)]
    pub orders:              Vec<OrderAck>,
    #[serde(default)]
    pub buying_power_effect: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
    pub id: u64,
}

impl OrderResponse {
    pub fn acknowledged_id(&self) -> Option<u64> {
        self.order_id.or_else(|| self.orders.first().map(|o| o.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_request_wire_shape() {
        let body = serde_json::to_value(OrderRequest::market(42, OrderSide::Sell, 7)).unwrap();
        assert_eq!(body, json!({
            "symbolId":        42,
            "quantity":        7,
            "icebergQuantity": 1,
            "orderType":       "Market",
            "action":          "Sell",
            "timeInForce":     "Day",
            "primaryRoute":    "AUTO",
            "secondaryRoute":  "AUTO",
        }));
    }

    #[test]
    fn test_order_ack_from_either_field() {
        let top: OrderResponse = serde_json::from_value(json!({ "orderId": 9 })).unwrap();
        assert_eq!(top.acknowledged_id(), Some(9));

        let nested: OrderResponse = serde_json::from_value(json!({ "orders": [{ "id": 11 }] })).unwrap();
        assert_eq!(nested.acknowledged_id(), Some(11));

        let impact: OrderResponse = serde_json::from_value(json!({ "buyingPowerEffect": -600.0 })).unwrap();
        assert_eq!(impact.acknowledged_id(), None);
    }

    #[test]
    fn test_symbol_details_ignore_extra_fields() {
        let details: SymbolDetailsResponse = serde_json::from_value(json!({ "symbols": [
            { "symbolId": 1, "marketCap": 2.0e9, "averageVol3Months": 3.0e5, "currency": "USD" }
        ]}))
        .unwrap();
        assert_eq!(details.symbols[0].market_cap, 2.0e9);
    }

    #[test]
    fn test_missing_required_field_fails_decode() {
        let result: Result<SymbolDetailsResponse, _> =
            serde_json::from_value(json!({ "symbols": [{ "symbolId": 1, "marketCap": 2.0e9 }] }));
        assert!(result.is_err());
    }
}

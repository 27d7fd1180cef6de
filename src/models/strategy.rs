//! # models::strategy
//!
//! Defines [`Strategy`] — the decision for one mention in one trigger event.
//! Built by `engine::decision::decide`, consumed by the executor, then dropped.

use serde::{Deserialize, Serialize};

use crate::models::CompanyMention;

// ─── Action ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Do nothing with this company.
    Hold,
    /// Buy long at market.
    Bull,
    /// Sell short at market.
    Bear,
}

// ─── Strategy ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub sentiment: f64,
    pub ticker: String,
    pub exchange: String,
    pub action: Action,
    /// Short code explaining the action, e.g. `"neutral sentiment"`.
    pub reason: String,
}

impl Strategy {
    /// Copy the identifying fields of a mention and attach a decision.
    pub fn from_mention(mention: &CompanyMention, action: Action, reason: &str) -> Self {
        Self {
            name:      mention.name.clone(),
            root:      mention.root.clone(),
            sentiment: mention.sentiment,
            ticker:    mention.ticker.clone(),
            exchange:  mention.exchange.clone(),
            action,
            reason:    reason.to_string(),
        }
    }

    #[inline]
    pub fn is_actionable(&self) -> bool {
        self.action != Action::Hold
    }
}

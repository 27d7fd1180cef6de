//! # models::mention
//!
//! [`CompanyMention`] — one company found in a social-media post, tagged with
//! a sentiment score by the upstream entity extractor. Read-only once received.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyMention {
    /// Company name as it appeared in the knowledge graph, e.g. `"General Motors"`.
    pub name: String,

    /// Ticker symbol, e.g. `"GM"`.
    pub ticker: String,

    /// Listing exchange, e.g. `"NYSE"`.
    pub exchange: String,

    /// Signed sentiment. `> 0` bullish, `< 0` bearish, `0` neutral.
    pub sentiment: f64,

    /// Parent company name when the mention was a subsidiary or brand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

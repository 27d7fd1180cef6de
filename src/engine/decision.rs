//! # engine::decision
//!
//! **Strategy Decision Engine** — pure mapping from a mention and the current
//! market session to hold / bull / bear. No I/O, never fails.

use tracing::debug;

use crate::engine::calendar::MarketSession;
use crate::models::{Action, CompanyMention, Strategy};

/// Decide what to do about one mention. Checks run in this order:
///
/// 1. blacklisted ticker → hold
/// 2. market not in pre or regular session → hold
/// 3. zero sentiment → hold
/// 4. sign of sentiment → bull / bear
pub fn decide(mention: &CompanyMention, session: MarketSession, blacklist: &[String]) -> Strategy {
    let (action, reason) = if blacklist.contains(&mention.ticker) {
        (Action::Hold, "blacklist")
    } else if !session.is_tradeable() {
        // TODO: decide on an after-hours strategy instead of holding.
        (Action::Hold, "market closed")
    } else if mention.sentiment == 0.0 {
        (Action::Hold, "neutral sentiment")
    } else if mention.sentiment > 0.0 {
        (Action::Bull, "positive sentiment")
    } else {
        (Action::Bear, "negative sentiment")
    };

    debug!(ticker = %mention.ticker, ?action, reason, "Strategy decided");
    Strategy::from_mention(mention, action, reason)
}

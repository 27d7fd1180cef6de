//! # routes::mentions
//!
//! | Method | Path            | Description                                   |
//! |--------|-----------------|-----------------------------------------------|
//! | POST   | `/api/mentions` | Trade one batch of classified company mentions |

use axum::{extract::State, Json};
use tracing::info;

use crate::{
    engine::executor::{decide_and_trade, BatchReport},
    error::AppError,
    models::CompanyMention,
    state::SharedState,
};

/// **Trade trigger.** One social-media event, already classified into
/// company mentions with sentiment.
///
/// ### Request body (JSON)
/// ```json
/// [
///   { "name": "General Motors", "ticker": "GM", "exchange": "NYSE", "sentiment": 0.6 }
/// ]
/// ```
///
/// ### Response
/// * `200 OK` with the [`BatchReport`], whether or not every order went through
/// * `400` for an empty batch, `502` when no engine could be built
pub async fn post_mentions(
    State(state): State<SharedState>,
    Json(mentions): Json<Vec<CompanyMention>>,
) -> Result<Json<BatchReport>, AppError> {
    if mentions.is_empty() {
        return Err(AppError::BadRequest("mention batch is empty".to_string()));
    }

    info!(count = mentions.len(), "📨 Mention batch received");
    let report = decide_and_trade(&state, &mentions).await?;
    Ok(Json(report))
}

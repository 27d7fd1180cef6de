//! # routes::quotes
//!
//! `GET /api/quotes/:ticker/history?at=<rfc3339>` — price at a past moment
//! and that day's close, reconstructed from the local quote cache.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    engine::calendar::to_market_time,
    error::AppError,
    models::HistoricalPrices,
    state::SharedState,
};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub at: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub ok:        bool,
    pub ticker:    String,
    pub timestamp: String,
    #[serde(flatten)]
    pub prices:    HistoricalPrices,
}

pub async fn get_history(
    State(state): State<SharedState>,
    Path(ticker): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError> {
    let at = DateTime::parse_from_rfc3339(&query.at)
        .map(|parsed| to_market_time(parsed.with_timezone(&Utc)))
        .map_err(|e| AppError::BadRequest(format!("'at' must be RFC 3339: {e}")))?;

    let ticker = ticker.to_uppercase();
    let prices = state.history.reconstruct(&ticker, at).await?;

    Ok(Json(HistoryResponse { ok: true, ticker, timestamp: at.to_rfc3339(), prices }))
}

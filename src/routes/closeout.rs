//! # routes::closeout
//!
//! `POST /api/closeout` — run one closeout check now instead of waiting for
//! the scheduler. Still a no-op outside the closing window.

use axum::{extract::State, Json};

use crate::{
    engine::closeout::{run_closeout_cycle, CloseoutReport},
    error::AppError,
    state::SharedState,
};

pub async fn post_closeout(State(state): State<SharedState>) -> Result<Json<CloseoutReport>, AppError> {
    Ok(Json(run_closeout_cycle(&state).await?))
}

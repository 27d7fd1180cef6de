//! # Mention Trader — sentiment-driven trading service
//!
//! ## Architecture Overview
//!
//! ```text
//!  ┌──────────────┐   POST /api/mentions   ┌──────────────────────┐
//!  │  Classifier  │ ──────────────────────▶│  TradingEngine       │──▶ brokerage orders
//!  │  (mentions)  │                        │  (one per batch)     │
//!  └──────────────┘                        └──────────┬───────────┘
//!                                                     │ shares
//!  ┌──────────────┐                        ┌──────────▼───────────┐
//!  │  Token       │ ── ensure_fresh ──────▶│  TokenStore          │
//!  │  refresher   │                        │  (one per process)   │
//!  └──────────────┘                        └──────────▲───────────┘
//!                                                     │
//!  ┌──────────────┐   every 5 min, 15:45–16:00 ET     │
//!  │  Closeout    │ ──── flatten positions ───────────┘
//!  │  scheduler   │
//!  └──────────────┘
//!                   /ws/monitor ◀── BATCH_COMPLETED / CLOSEOUT_COMPLETED
//! ```
//!
//! Configuration is read from the environment (see [`config::Config`]).
//! Orders go to the simulated impact endpoint unless `USE_REAL_MONEY=YES`.

use anyhow::Context;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod auth;
mod broker;
mod config;
mod engine;
mod error;
mod events;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod test_support;

use broker::{run_token_refresher, TokenStore};
use config::Config;
use engine::closeout::run_closeout_scheduler;
use state::build_state;

// ─── Entry Point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Load .env (optional, production can use real env vars) ───────────
    dotenvy::dotenv().ok();

    // ── 2. Structured logging ────────────────────────────────────────────────
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("mention_trader=debug".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    info!(r#"

  ╔═══════════════════════════════════════════════╗
  ║        MENTION TRADER — Trading Service       ║
  ║     Mentions · Orders · Closeout · Tokens     ║
  ╚═══════════════════════════════════════════════╝"#);

    // ── 3. Configuration ─────────────────────────────────────────────────────
    let config = Config::from_env().context("failed to load configuration")?;
    if config.use_real_money {
        warn!("💰 USE_REAL_MONEY=YES, orders go to the live endpoint");
    } else {
        info!("Simulation mode: orders go to the impact endpoint");
    }

    // ── 4. Brokerage session ─────────────────────────────────────────────────
    let tokens = TokenStore::new(config.auth_url.clone(), config.refresh_token.clone(), config.http_timeout)
        .context("failed to build brokerage HTTP client")?;
    if let Err(e) = tokens.refresh().await {
        error!(error = %e, "Initial token exchange failed, refresher will retry");
    }
    let tokens = std::sync::Arc::new(tokens);

    // ── 5. Shared state & background tasks ───────────────────────────────────
    let bind_addr = config.bind_addr;
    let refresh_margin = config.token_refresh_margin;
    let state = build_state(config, tokens.clone());

    tokio::spawn(run_token_refresher(tokens, refresh_margin, state.broadcast_tx.clone()));
    tokio::spawn(run_closeout_scheduler(state.clone()));

    // ── 6. Router, bind & serve ──────────────────────────────────────────────
    let app = routes::router(state);

    info!(addr = ?bind_addr, "🚀 Mention Trader starting");
    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}

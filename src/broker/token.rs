//! # broker::token
//!
//! **Session/Token Manager** — one process-wide [`TokenStore`] holding the
//! brokerage access token and the rotating refresh token.
//!
//! The brokerage invalidates a refresh token the moment it is used, so two
//! concurrent exchanges with the same token would leave one caller holding a
//! dead token. Every exchange therefore runs while holding `refresh_token`'s
//! mutex:
//!
//! ```text
//!  lock(refresh_token) ──▶ GET auth_url?refresh_token=… ──▶ ok?  ──▶ swap session
//!                                                          │         overwrite refresh_token
//!                                                          └ err ──▶ leave both untouched
//! ```

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::broker::types::TokenResponse;
use crate::error::BrokerError;
use crate::events::TradeEvent;

/// Wait after a failed exchange before the refresher tries again.
const RETRY_DELAY: Duration = Duration::from_secs(30);

// ─── Session ──────────────────────────────────────────────────────────────────

/// Snapshot of the current access credentials.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub api_server:   String,
    pub token_type:   String,
    pub expires_at:   DateTime<Utc>,
}

impl Session {
    /// `Authorization` header value, e.g. `Bearer abc123`.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Absolute URL for an API path such as `v1/time`.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.api_server.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    pub fn expires_within(&self, margin: Duration) -> bool {
        let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
        Utc::now() + margin >= self.expires_at
    }
}

// ─── TokenStore ───────────────────────────────────────────────────────────────

pub struct TokenStore {
    client:        reqwest::Client,
    auth_url:      String,
    /// The only live refresh token. Held locked for the whole exchange.
    refresh_token: Mutex<String>,
    session:       RwLock<Option<Session>>,
}

impl TokenStore {
    /// Store without a session yet. Call [`TokenStore::refresh`] before use.
    pub fn new(
        auth_url: impl Into<String>,
        refresh_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        Ok(Self {
            client:        reqwest::Client::builder().timeout(timeout).build()?,
            auth_url:      auth_url.into(),
            refresh_token: Mutex::new(refresh_token.into()),
            session:       RwLock::new(None),
        })
    }

    /// Current credentials, or `NoSession` before the first good exchange.
    pub async fn session(&self) -> Result<Session, BrokerError> {
        self.session.read().await.clone().ok_or(BrokerError::NoSession)
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.session.read().await.as_ref().map(|s| s.expires_at)
    }

    /// Exchange the current refresh token for a new session, unconditionally.
    pub async fn refresh(&self) -> Result<Session, BrokerError> {
        let mut refresh_token = self.refresh_token.lock().await;
        self.exchange(&mut refresh_token).await
    }

    /// Refresh only when there is no session or it expires within `margin`.
    /// Re-checked under the lock, so callers racing here cause one exchange.
    pub async fn ensure_fresh(&self, margin: Duration) -> Result<Session, BrokerError> {
        let mut refresh_token = self.refresh_token.lock().await;

        let current = self.session.read().await.clone();
        if let Some(session) = current {
            if !session.expires_within(margin) {
                return Ok(session);
            }
        }

        self.exchange(&mut refresh_token).await
    }

    /// Caller must hold the `refresh_token` lock.
    async fn exchange(&self, refresh_token: &mut String) -> Result<Session, BrokerError> {
        debug!(url = %self.auth_url, "Requesting brokerage tokens");

        let response = self
            .client
            .get(&self.auth_url)
            .query(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Token endpoint unreachable");
                BrokerError::from(e)
            })?;

        let status = response.status();
        let body = response.text().await?;
        debug!(%status, "Token response received");

        if !status.is_success() {
            error!(%status, body = %body, "Failed to retrieve API tokens");
            return Err(BrokerError::Http { status: status.as_u16(), body });
        }

        let tokens: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, body = %body, "Failed to retrieve API tokens: malformed response");
            BrokerError::MalformedResponse(e.to_string())
        })?;

        let session = Session {
            access_token: tokens.access_token,
            api_server:   tokens.api_server,
            token_type:   tokens.token_type,
            expires_at:   Utc::now() + chrono::Duration::seconds(tokens.expires_in),
        };

        *self.session.write().await = Some(session.clone());
        *refresh_token = tokens.refresh_token;

        info!(api_server = %session.api_server, expires_at = %session.expires_at, "🔑 Brokerage session refreshed");
        Ok(session)
    }

    #[cfg(test)]
    pub(crate) async fn current_refresh_token(&self) -> String {
        self.refresh_token.lock().await.clone()
    }
}

// ─── Refresher Loop ───────────────────────────────────────────────────────────

/// Keep the session alive: sleep until `margin` before expiry, refresh, repeat.
/// Failed exchanges are retried after [`RETRY_DELAY`] and published on
/// `events`. Never returns.
pub async fn run_token_refresher(
    tokens: Arc<TokenStore>,
    margin: Duration,
    events: broadcast::Sender<String>,
) {
    loop {
        let wait = match tokens.ensure_fresh(margin).await {
            Ok(session) => {
                let until_refresh = session.expires_at
                    - chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero())
                    - Utc::now();
                until_refresh.to_std().unwrap_or(Duration::ZERO).max(Duration::from_secs(5))
            }
            Err(e) => {
                warn!(error = %e, retry_in = ?RETRY_DELAY, "Token refresh failed");
                let _ = events.send(TradeEvent::TokenRefreshFailed { error: e.to_string() }.to_json());
                RETRY_DELAY
            }
        };

        debug!(wait = ?wait, "Token refresher sleeping");
        tokio::time::sleep(wait).await;
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

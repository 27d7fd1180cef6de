//! HTTP surface of the service.
//!
//! ```text
//!  classifier ──POST /api/mentions──▶ decide_and_trade ──▶ brokerage
//!  operator   ──POST /api/closeout──▶ run_closeout_cycle
//!  analyst    ──GET  /api/quotes/:ticker/history──▶ QuoteHistory
//!  dashboard  ◀──────────── /ws/monitor ──────────── broadcast channel
//! ```

pub mod closeout;
pub mod mentions;
pub mod monitor;
pub mod quotes;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{auth::require_api_key, state::SharedState};

pub fn router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // ── Trading ───────────────────────────────────────────────────────────
        .route("/api/mentions",                 post(mentions::post_mentions))
        .route("/api/closeout",                 post(closeout::post_closeout))
        // ── Market Data ───────────────────────────────────────────────────────
        .route("/api/quotes/:ticker/history",   get(quotes::get_history))
        // ── Monitor ───────────────────────────────────────────────────────────
        .route("/api/health",                   get(monitor::health_check))
        .route("/ws/monitor",                   get(monitor::ws_monitor))
        // ── Middleware ────────────────────────────────────────────────────────
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{self, FRIDAY_NOON};
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use std::{fs, sync::atomic::Ordering};
    use tower::ServiceExt;
    use wiremock::MockServer;

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_is_open_with_api_key() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_support::state(&server, dir.path().to_path_buf(), Some("secret")).await);

        let response = app
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ok"], true);
        assert_eq!(body["has_session"], true);
    }

    #[tokio::test]
    async fn test_missing_api_key_is_unauthorized() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_support::state(&server, dir.path().to_path_buf(), Some("secret")).await);

        let response = app.oneshot(post_json("/api/mentions", "[]")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_empty_batch_is_bad_request() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_support::state(&server, dir.path().to_path_buf(), Some("secret")).await);

        let mut request = post_json("/api/mentions", "[]");
        request.headers_mut().insert("X-API-Key", "secret".parse().unwrap());
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["ok"], false);
    }

    #[tokio::test]
    async fn test_malformed_mention_is_rejected() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_support::state(&server, dir.path().to_path_buf(), None).await);

        let response = app
            .oneshot(post_json("/api/mentions", r#"[{"ticker":"GM"}]"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_neutral_batch_returns_report() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let state = test_support::state(&server, dir.path().to_path_buf(), None).await;
        test_support::mount_time(&server, FRIDAY_NOON).await;
        let app = router(state.clone());

        let response = app
            .oneshot(post_json(
                "/api/mentions",
                r#"[{"name":"General Motors","ticker":"GM","exchange":"NYSE","sentiment":0}]"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["aborted"], "NO_ACTIONABLE_STRATEGIES");
        assert_eq!(body["strategies"][0]["action"], "hold");
        assert_eq!(state.batch_count.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_quote_history_from_cache() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("GM_20261016.txt"),
            "symbol,time,price,volume\nGM,202610160931,10,1\nGM,202610161000,11,1\nGM,202610161559,12,1\n",
        )
        .unwrap();
        let app = router(test_support::state(&server, dir.path().to_path_buf(), None).await);

        let response = app
            .oneshot(
                Request::get("/api/quotes/gm/history?at=2026-10-16T10:30:00-04:00")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["ticker"], "GM");
        assert_eq!(body["at"], 11.0);
        assert_eq!(body["eod"], 12.0);
    }

    #[tokio::test]
    async fn test_quote_history_rejects_bad_timestamp() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let app = router(test_support::state(&server, dir.path().to_path_buf(), None).await);

        let response = app
            .oneshot(Request::get("/api/quotes/GM/history?at=yesterday").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

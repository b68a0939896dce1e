use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Statistics ──────────────────────────────────────────
        .route("/api/statistics", get(handlers::statistics::list))
        .route(
            "/api/statistics/snapshot",
            get(handlers::statistics::snapshots),
        )
        .route("/api/statistics/schema", get(handlers::statistics::schema))
        .route("/api/statistics/stream", get(handlers::statistics::stream))
        .route("/api/statistics/:name", get(handlers::statistics::snapshot))
        .route(
            "/api/statistics/:name/actions/:action",
            post(handlers::statistics::perform_action),
        )
        // ── Registry scrape ─────────────────────────────────────
        .route("/api/metrics", get(handlers::statistics::gauges))
        // ── Load control ────────────────────────────────────────
        .route("/api/load/start", post(handlers::load::start))
        .route("/api/load/stop", post(handlers::load::stop))
        .route("/api/load/status", get(handlers::load::status))
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn_with_state(
            state.clone(),
            timing::timing_middleware,
        ))
        .layer(CorsLayer::permissive())
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
}

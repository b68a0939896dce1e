use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::{AppState, HTTP_POINT};

/// Records every API request's wall time into the `http` keeper and adds
///
///   X-Response-Time-Us: total handler wall time in microseconds
///   Server-Timing: same value in the standard Server-Timing format
pub async fn timing_middleware(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let start = Instant::now();
    let mut response = next.run(req).await;
    let elapsed = start.elapsed();
    let us = elapsed.as_micros();

    // ── Inject response headers ─────────────────────────────────
    if let Ok(val) = us.to_string().parse() {
        response.headers_mut().insert("X-Response-Time-Us", val);
    }

    let server_timing =
        format!("total;dur={:.3}", elapsed.as_secs_f64() * 1000.0);
    if let Ok(val) = server_timing.parse() {
        response.headers_mut().insert("Server-Timing", val);
    }

    // SSE connections live for minutes; they would swamp the distribution
    if path.starts_with("/api/") && !path.contains("/stream") {
        if let Some(keeper) = state.keeper(HTTP_POINT) {
            keeper.add_duration(elapsed);
        }
        debug!(status = response.status().as_u16(), %method, %path, us = us as u64, "request");
    }

    response
}

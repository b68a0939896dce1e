pub mod load;
pub mod statistics;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use statistics_keeper::StatisticsError;

// ─── Unified error type ──────────────────────────────────────────

#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    AlreadyRunning,
}

impl From<StatisticsError> for AppError {
    fn from(e: StatisticsError) -> Self {
        Self::BadRequest(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::AlreadyRunning => {
                (StatusCode::CONFLICT, "Load generator already running".into())
            }
        };

        let body = serde_json::json!({
            "error":  message,
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

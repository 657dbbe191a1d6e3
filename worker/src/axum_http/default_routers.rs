use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::debug;

pub async fn not_found() -> impl IntoResponse {
    debug!("worker router: unknown path requested");
    (StatusCode::NOT_FOUND, "NOT_FOUND").into_response()
}

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "component": "status_poll_worker" })),
    )
        .into_response()
}

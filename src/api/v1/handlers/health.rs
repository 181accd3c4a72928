/*
 * Responsibility
 * - GET /health, GET /actuator/health (疎通用)
 * - 認証不要 (RouteClassifier の既定ルールで Public)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

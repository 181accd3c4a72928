/*
 * Responsibility
 * - URL 構造を定義
 * - 認証の要否はここでは決めない (RouteClassifier が一元管理、未定義ルートは Protected)
 */
use axum::{Router, routing::get};

use crate::state::AppState;

use crate::api::v1::handlers::{
    fallback::not_found,
    health::health,
    me::me,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/actuator/health", get(health))
        .route("/api/me", get(me))
        .fallback(not_found)
}

/*
 * Responsibility
 * - GET /api/me: 認証済み主体を返す (gate → extractor の配線確認用)
 */
use axum::Json;

use crate::api::v1::dto::me::MeResponse;
use crate::api::v1::extractors::CurrentPrincipal;

pub async fn me(CurrentPrincipal(principal): CurrentPrincipal) -> Json<MeResponse> {
    Json(MeResponse {
        id: principal.id,
        email: principal.email,
    })
}

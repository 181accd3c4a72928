use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::security::context::SecurityContext;
use crate::security::principal::Principal;

/// Handler で、認証済み Principal を受け取るための extractor
/// middleware が SecurityContext を request.extensions() に insert 済みである前提
/// 見つからない / 未認証の場合は 401 を返す（Public ルートや middleware 未設定）
pub struct CurrentPrincipal(pub Principal);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SecurityContext>()
            .and_then(SecurityContext::principal)
            .cloned()
            .map(CurrentPrincipal)
            .ok_or(AppError::Unauthorized)
    }
}

use crate::error::AppError;

/// Unknown routes are still behind the gate: without a credential they get 401, not 404.
pub async fn not_found() -> AppError {
    AppError::not_found("route")
}

/*
 * Responsibility
 * - middleware の公開インターフェース
 * - 適用順 (外側から): http → cors → auth::access → routes
 */
pub mod auth;
pub mod cors;
pub mod http;

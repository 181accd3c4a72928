//! Bearer 検証 → SecurityContext を extensions に入れる
//!
//! - ルート分類・トークン検証・主体解決は `security::gate` 側の責務
//! - ここでは axum との配線だけを行う:
//!   extensions から SecurityContext を取り出す → gate 実行 → decide → next / 401

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{ConnectInfo, Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::middleware::cors;
use crate::middleware::http::REQUEST_ID_HEADER;
use crate::security::context::SecurityContext;
use crate::security::decision::{AccessDecision, decide};
use crate::security::gate::{AuthenticationGate, RequestMeta};

/// Apply the authentication gate to every route (and the fallback) of `router`.
///
/// Must be layered inside the CORS layer:
/// ```ignore
/// let app = middleware::auth::access::apply(app, gate.clone());
/// let app = middleware::cors::apply(app, &cors);
/// ```
pub fn apply(router: Router, gate: Arc<AuthenticationGate>) -> Router {
    router.layer(middleware::from_fn_with_state(gate, access_middleware))
}

async fn access_middleware(
    State(gate): State<Arc<AuthenticationGate>>,
    mut req: Request,
    next: Next,
) -> Response {
    // Preflight never depends on authentication, even if the classifier rules
    // forgot to exempt it.
    if cors::is_preflight(req.method(), req.headers()) {
        return next.run(req).await;
    }

    let mut ctx = req
        .extensions_mut()
        .remove::<SecurityContext>()
        .unwrap_or_default();

    let meta = RequestMeta {
        remote_addr: req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr),
        request_id: req
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
    };

    let result = gate
        .run(req.method(), req.uri().path(), req.headers(), meta, &mut ctx)
        .await;

    match decide(result.classification, &ctx) {
        AccessDecision::Allow => {
            // middleware → extractor への受け渡し
            req.extensions_mut().insert(ctx);
            next.run(req).await
        }
        AccessDecision::Unauthenticated => {
            tracing::debug!(
                method = %req.method(),
                path = req.uri().path(),
                outcome = ?result.outcome,
                "access denied"
            );
            AppError::Unauthorized.into_response()
        }
    }
}

/*
 * Responsibility
 * - Config読み込み → 依存生成 (TokenAuthority / PrincipalStore / CorsPolicy / Gate)
 * - Router 組み立てと Middleware の適用 (http → CORS → 認証ゲート の順)
 * - axum::serve() で起動
 */
use std::net::SocketAddr;
use std::sync::Arc;
use std::panic;

use anyhow::Result;
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::{Config, ConfigError, HttpConfig};
use crate::middleware;
use crate::middleware::cors::CorsPolicy;
use crate::security::classifier::RouteClassifier;
use crate::security::gate::AuthenticationGate;
use crate::security::store::PrincipalStore;
use crate::services::auth::build_token_authority;
use crate::services::principal::PgPrincipalStore;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,api_auth_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Reports panics through tracing, then chains to the default hook.
///
/// Never aborts: a panic inside a request task (including the gate's
/// resolve task) must end that request only.
fn init_panic_hook() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook();

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config.http);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Builds the process-level components. Fails on any invalid configuration,
/// including a CORS policy that combines `*` with credentials.
///
/// Must be called inside a tokio runtime (the connection pool is created lazily).
pub fn build_state(config: &Config) -> Result<AppState, ConfigError> {
    let cors = CorsPolicy::new(&config.cors)?;
    let authority = build_token_authority(&config.auth)?;

    let db = PgPoolOptions::new()
        .acquire_timeout(config.auth.lookup_timeout)
        .connect_lazy(&config.database_url)
        .map_err(|e| {
            tracing::error!(error = %e, "invalid database url");
            ConfigError::Invalid("DATABASE_URL")
        })?;
    let store: Arc<dyn PrincipalStore> = Arc::new(PgPrincipalStore::new(db));

    let gate = AuthenticationGate::new(
        RouteClassifier::new(config.route_rules.clone()),
        authority,
        store,
    )
    .with_lookup_timeout(config.auth.lookup_timeout);

    Ok(AppState::new(gate, cors))
}

pub fn build_router(state: AppState, http: &HttpConfig) -> Router {
    let routes = api::v1::routes().with_state(state.clone());
    secure(routes, &state, http)
}

/// Wraps `router` with the full middleware stack.
///
/// Layer order (outermost first): http → CORS → authentication gate → routes.
pub fn secure(router: Router, state: &AppState, http: &HttpConfig) -> Router {
    let router = middleware::auth::access::apply(router, Arc::clone(&state.gate));
    let router = middleware::cors::apply(router, &state.cors);
    middleware::http::apply(router, http)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

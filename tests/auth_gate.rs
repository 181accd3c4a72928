//! Router-level tests for the CORS → authentication gate → handler pipeline.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use api_auth_gate::api::v1::extractors::CurrentPrincipal;
use api_auth_gate::app;
use api_auth_gate::config::{CorsConfig, HttpConfig, JwtKey};
use api_auth_gate::middleware::auth::access;
use api_auth_gate::middleware::cors::CorsPolicy;
use api_auth_gate::security::{
    AuthenticationGate, Credential, Identity, Principal, RouteClassifier, TokenAuthority,
    TokenError,
};
use api_auth_gate::services::auth::JwtTokenAuthority;
use api_auth_gate::services::principal::InMemoryPrincipalStore;
use api_auth_gate::state::AppState;
use axum::{
    Router,
    body::{Body, Bytes, to_bytes},
    http::{Method, Request, StatusCode, header},
    response::Response,
    routing::get,
};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-test-secret";
const ALLOWED_ORIGIN: &str = "http://localhost:5173";

/// Wraps the real JWT authority and counts validations.
struct CountingAuthority {
    inner: JwtTokenAuthority,
    validations: AtomicUsize,
}

impl TokenAuthority for CountingAuthority {
    fn validate(&self, credential: &Credential) -> Result<Identity, TokenError> {
        self.validations.fetch_add(1, Ordering::SeqCst);
        self.inner.validate(credential)
    }

    fn extract_identity(&self, credential: &Credential) -> Option<Identity> {
        self.inner.extract_identity(credential)
    }
}

struct Harness {
    state: AppState,
    authority: Arc<CountingAuthority>,
    handler_hits: Arc<AtomicUsize>,
    alice: Principal,
}

impl Harness {
    fn new() -> Self {
        Self::with_cors(CorsConfig {
            allowed_origins: vec![ALLOWED_ORIGIN.to_string()],
            allow_credentials: true,
            ..CorsConfig::default()
        })
    }

    fn with_cors(cors: CorsConfig) -> Self {
        let alice = Principal::new(Uuid::new_v4(), "alice@example.com");
        let authority = Arc::new(CountingAuthority {
            inner: JwtTokenAuthority::new(&JwtKey::Secret(SECRET.to_string()), None, None, 60)
                .unwrap(),
            validations: AtomicUsize::new(0),
        });
        let gate = AuthenticationGate::new(
            RouteClassifier::default(),
            authority.clone(),
            Arc::new(InMemoryPrincipalStore::new([alice.clone()])),
        )
        .with_lookup_timeout(Duration::from_secs(1));
        let state = AppState::new(gate, CorsPolicy::new(&cors).unwrap());

        Self {
            state,
            authority,
            handler_hits: Arc::new(AtomicUsize::new(0)),
            alice,
        }
    }

    fn routes(&self) -> Router {
        let hits = self.handler_hits.clone();
        let public_hits = self.handler_hits.clone();

        Router::new()
            .route(
                "/api/tasks",
                get(move |CurrentPrincipal(principal): CurrentPrincipal| {
                    let hits = hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        principal.email
                    }
                }),
            )
            .route(
                "/api/auth/login",
                get(move || {
                    let hits = public_hits.clone();
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "login"
                    }
                }),
            )
    }

    fn router(&self) -> Router {
        app::secure(self.routes(), &self.state, &HttpConfig::default())
    }

    fn validations(&self) -> usize {
        self.authority.validations.load(Ordering::SeqCst)
    }

    fn hits(&self) -> usize {
        self.handler_hits.load(Ordering::SeqCst)
    }
}

fn mint(sub: &str, exp_offset: i64) -> String {
    let claims = json!({
        "sub": sub,
        "exp": chrono::Utc::now().timestamp() + exp_offset,
    });
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn get_request(path: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(path);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    builder.body(Body::empty()).unwrap()
}

fn preflight(path: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri(path)
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, req: Request<Body>) -> Response {
    router.clone().oneshot(req).await.unwrap()
}

async fn body(response: Response) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

#[tokio::test]
async fn public_login_route_needs_no_credential() {
    let h = Harness::new();
    let response = send(&h.router(), get_request("/api/auth/login", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, "login");
    assert_eq!(h.hits(), 1);
}

#[tokio::test]
async fn public_route_ignores_any_authorization_header() {
    let h = Harness::new();
    let router = h.router();
    let valid = format!("Bearer {}", mint("alice@example.com", 3600));

    for value in ["Bearer garbage", "Basic Zm9vOmJhcg==", "Bearer", valid.as_str()] {
        let response = send(&router, get_request("/api/auth/login", Some(value))).await;
        assert_eq!(response.status(), StatusCode::OK, "header {value:?}");
    }
    assert_eq!(h.validations(), 0);
}

#[tokio::test]
async fn protected_route_without_header_is_401() {
    let h = Harness::new();
    let response = send(&h.router(), get_request("/api/tasks", None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
    assert_eq!(h.hits(), 0);
}

#[tokio::test]
async fn protected_route_with_valid_token_reaches_handler_with_principal() {
    let h = Harness::new();
    let token = mint("alice@example.com", 3600);
    let response = send(
        &h.router(),
        get_request("/api/tasks", Some(&format!("Bearer {token}"))),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response).await, h.alice.email.as_str());
    assert_eq!(h.hits(), 1);
}

#[tokio::test]
async fn every_rejection_looks_the_same() {
    let h = Harness::new();
    let router = h.router();
    let expired = format!("Bearer {}", mint("alice@example.com", -3600));
    let unknown = format!("Bearer {}", mint("ghost@example.com", 3600));

    let baseline = send(&router, get_request("/api/tasks", None)).await;
    assert_eq!(baseline.status(), StatusCode::UNAUTHORIZED);
    let baseline_body = body(baseline).await;

    for value in [
        "Bearer garbage",
        "Bearer ",
        "Token abc",
        expired.as_str(),
        unknown.as_str(),
    ] {
        let response = send(&router, get_request("/api/tasks", Some(value))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "header {value:?}");
        assert_eq!(body(response).await, baseline_body, "header {value:?}");
    }
    assert_eq!(h.hits(), 0);
}

#[tokio::test]
async fn preflight_is_answered_before_authentication() {
    let h = Harness::new();
    let response = send(&h.router(), preflight("/api/tasks", ALLOWED_ORIGIN)).await;

    assert!(response.status().is_success());
    let headers = response.headers();
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        ALLOWED_ORIGIN
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
        "true"
    );
    let methods = headers
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(methods.contains("GET"));
    assert!(body(response).await.is_empty());
    assert_eq!(h.validations(), 0);
    assert_eq!(h.hits(), 0);
}

#[tokio::test]
async fn preflight_from_unknown_origin_gets_no_cors_headers() {
    let h = Harness::new();
    let response = send(&h.router(), preflight("/api/tasks", "https://evil.example.com")).await;

    assert_ne!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
    assert_eq!(h.validations(), 0);
}

#[tokio::test]
async fn preflight_bypasses_gate_even_without_an_options_rule() {
    let h = Harness::new();
    // Gate alone, no CORS layer in front, classifier with no rules at all.
    let gate = Arc::new(AuthenticationGate::new(
        RouteClassifier::new(Vec::new()),
        h.authority.clone(),
        Arc::new(InMemoryPrincipalStore::default()),
    ));
    let router = access::apply(
        Router::new().route("/api/tasks", axum::routing::options(|| async { "ok" })),
        gate,
    );

    let response = send(&router, preflight("/api/tasks", ALLOWED_ORIGIN)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.validations(), 0);
}

#[tokio::test]
async fn actual_responses_are_decorated_for_allowed_origins() {
    let h = Harness::new();
    let req = Request::builder()
        .uri("/api/tasks")
        .header(header::ORIGIN, ALLOWED_ORIGIN)
        .body(Body::empty())
        .unwrap();
    let response = send(&h.router(), req).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        ALLOWED_ORIGIN
    );
}

#[tokio::test]
async fn layered_decision_matches_policy_decision() {
    let h = Harness::new();
    let origin = header::HeaderValue::from_static(ALLOWED_ORIGIN);
    let decision = h.state.cors.decide(Some(&origin)).unwrap();

    let response = send(&h.router(), preflight("/api/tasks", ALLOWED_ORIGIN)).await;
    let headers = response.headers();

    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&decision.allow_origin)
    );
    assert_eq!(
        headers
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .is_some(),
        decision.allow_credentials
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(),
        decision.max_age.as_secs().to_string().as_str()
    );
}

#[tokio::test]
async fn gate_applied_twice_authenticates_once() {
    let h = Harness::new();
    let twice = access::apply(h.routes(), h.state.gate.clone());
    let router = app::secure(twice, &h.state, &HttpConfig::default());
    let token = mint("alice@example.com", 3600);

    let response = send(
        &router,
        get_request("/api/tasks", Some(&format!("Bearer {token}"))),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(h.validations(), 1);
    assert_eq!(h.hits(), 1);
}

#[tokio::test]
async fn unknown_routes_are_protected_by_default() {
    let h = Harness::new();
    let router = app::build_router(h.state.clone(), &HttpConfig::default());

    let anonymous = send(&router, get_request("/api/not-declared", None)).await;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let token = mint("alice@example.com", 3600);
    let authenticated = send(
        &router,
        get_request("/api/not-declared", Some(&format!("Bearer {token}"))),
    )
    .await;
    assert_eq!(authenticated.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn me_endpoint_returns_principal() {
    let h = Harness::new();
    let router = app::build_router(h.state.clone(), &HttpConfig::default());
    let token = mint("alice@example.com", 3600);

    let response = send(
        &router,
        get_request("/api/me", Some(&format!("Bearer {token}"))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_slice(&body(response).await).unwrap();
    assert_eq!(json["email"], "alice@example.com");
    assert_eq!(json["id"], h.alice.id.to_string());
}

#[tokio::test]
async fn health_endpoints_are_public() {
    let h = Harness::new();
    let router = app::build_router(h.state.clone(), &HttpConfig::default());

    for path in ["/health", "/actuator/health"] {
        let response = send(&router, get_request(path, Some("Bearer garbage"))).await;
        assert_eq!(response.status(), StatusCode::OK, "{path}");
    }
}

#[tokio::test]
async fn responses_carry_a_request_id() {
    let h = Harness::new();
    let response = send(&h.router(), get_request("/api/tasks", None)).await;
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn wildcard_origin_with_credentials_fails_at_startup() {
    let config = api_auth_gate::config::Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some("postgres://localhost/app".to_string()),
        "AUTH_JWT_SECRET" => Some(SECRET.to_string()),
        "CORS_ALLOWED_ORIGINS" => Some("*".to_string()),
        "CORS_ALLOW_CREDENTIALS" => Some("true".to_string()),
        _ => None,
    })
    .unwrap();

    let err = app::build_state(&config).unwrap_err();
    assert!(matches!(
        err,
        api_auth_gate::config::ConfigError::Cors(_)
    ));
}

/*
 * Responsibility
 * - 環境変数や設定の読み込み (DATABASE_URL, CORS 許可、Auth 設定、ルール定義など)
 * - 設定値のバリデーション (不足なら起動失敗)
 * - 起動時に一度だけ読み込み、以後は不変
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::middleware::cors::CorsPolicyError;
use crate::security::classifier::{RouteClassifier, RouteRule, RouteRuleError, parse_rules};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    fn parse(raw: Option<String>) -> Self {
        match raw
            .unwrap_or_else(|| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
    #[error("invalid configuration: ROUTE_RULES: {0}")]
    RouteRules(#[from] RouteRuleError),
    #[error("misconfigured CORS policy: {0}")]
    Cors(#[from] CorsPolicyError),
}

/// Token verification key.
#[derive(Clone, PartialEq, Eq)]
pub enum JwtKey {
    /// HS256 shared secret.
    Secret(String),
    /// Ed25519 public key (PEM).
    Ed25519PublicPem(String),
}

impl fmt::Debug for JwtKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JwtKey::Secret(_) => f.write_str("Secret(<redacted>)"),
            JwtKey::Ed25519PublicPem(_) => f.write_str("Ed25519PublicPem(..)"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_key: JwtKey,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub leeway_seconds: u64,
    pub lookup_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    /// Exact origins or `scheme://*.host` patterns; `*` means any.
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    /// `*` means any (request headers are mirrored).
    pub allowed_headers: Vec<String>,
    pub allow_credentials: bool,
    pub max_age: Duration,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: ["GET", "POST", "PUT", "DELETE", "OPTIONS"]
                .map(String::from)
                .to_vec(),
            allowed_headers: ["Authorization", "Content-Type", "X-Requested-With"]
                .map(String::from)
                .to_vec(),
            allow_credentials: false,
            max_age: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpConfig {
    pub request_timeout: Duration,
    pub body_limit_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            body_limit_bytes: 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub database_url: String,
    pub auth: AuthConfig,
    pub cors: CorsConfig,
    pub http: HttpConfig,
    pub route_rules: Vec<RouteRule>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup (the process environment in production).
    pub fn from_lookup<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let port: u16 = non_empty("PORT")
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::parse(get("APP_ENV"));

        let database_url = non_empty("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let jwt_key = match (non_empty("AUTH_JWT_SECRET"), non_empty("ACCESS_JWT_PUBLIC_KEY_PEM")) {
            (Some(secret), None) => JwtKey::Secret(secret),
            (None, Some(pem)) => JwtKey::Ed25519PublicPem(pem.replace("\\n", "\n")),
            (Some(_), Some(_)) => return Err(ConfigError::Invalid("AUTH_JWT_SECRET")),
            (None, None) => return Err(ConfigError::Missing("AUTH_JWT_SECRET")),
        };

        let leeway_seconds = parse_or(&non_empty, "ACCESS_TOKEN_LEEWAY_SECONDS", 60)?;
        let lookup_timeout_ms = parse_or(&non_empty, "PRINCIPAL_LOOKUP_TIMEOUT_MS", 2000)?;
        if lookup_timeout_ms == 0 {
            return Err(ConfigError::Invalid("PRINCIPAL_LOOKUP_TIMEOUT_MS"));
        }

        let auth = AuthConfig {
            jwt_key,
            issuer: non_empty("AUTH_ISSUER"),
            audience: non_empty("AUTH_AUDIENCE"),
            leeway_seconds,
            lookup_timeout: Duration::from_millis(lookup_timeout_ms),
        };

        let defaults = CorsConfig::default();
        let mut allowed_origins = non_empty("CORS_ALLOWED_ORIGINS")
            .map(|v| split_list(&v))
            .unwrap_or_default();
        if allowed_origins.is_empty() && !app_env.is_production() {
            // Development: permissive. Production with no allowlist emits no CORS headers.
            allowed_origins.push("*".to_string());
        }

        let cors = CorsConfig {
            allowed_origins,
            allowed_methods: non_empty("CORS_ALLOWED_METHODS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.allowed_methods),
            allowed_headers: non_empty("CORS_ALLOWED_HEADERS")
                .map(|v| split_list(&v))
                .unwrap_or(defaults.allowed_headers),
            allow_credentials: match non_empty("CORS_ALLOW_CREDENTIALS") {
                None => defaults.allow_credentials,
                Some(v) => parse_bool(&v).ok_or(ConfigError::Invalid("CORS_ALLOW_CREDENTIALS"))?,
            },
            max_age: Duration::from_secs(parse_or(&non_empty, "CORS_MAX_AGE_SECONDS", 600)?),
        };

        let http_defaults = HttpConfig::default();
        let http = HttpConfig {
            request_timeout: Duration::from_secs(parse_or(
                &non_empty,
                "REQUEST_TIMEOUT_SECONDS",
                http_defaults.request_timeout.as_secs(),
            )?),
            body_limit_bytes: parse_or(
                &non_empty,
                "REQUEST_BODY_LIMIT_BYTES",
                http_defaults.body_limit_bytes,
            )?,
        };

        let route_rules = match non_empty("ROUTE_RULES") {
            Some(raw) => parse_rules(&raw)?,
            None => RouteClassifier::default_rules(),
        };

        Ok(Self {
            addr,
            app_env,
            database_url,
            auth,
            cors,
            http,
            route_rules,
        })
    }
}

fn parse_or<T, F>(get: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

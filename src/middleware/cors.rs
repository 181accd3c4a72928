//! CORS policy for browser clients.
//!
//! Note:
//! - CORS is enforced by browsers. Native apps and server-to-server calls are not
//!   restricted by CORS.
//! - The layer built here must sit outside the authentication middleware so that
//!   preflight requests are answered before any credential check.
//!
//! Policy:
//! - One `CorsPolicy` is built at start from `CorsConfig` and is the only source
//!   for both preflight answers and response decoration.
//! - Origins not on the allowlist get no CORS headers (the browser blocks the response).
//! - `*` combined with credentials is rejected at start, never at request time.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, header, request::Parts};
use thiserror::Error;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use url::Url;

use crate::config::CorsConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CorsPolicyError {
    #[error("wildcard origin `*` cannot be combined with credentials")]
    WildcardWithCredentials,
    #[error("invalid origin `{0}`")]
    InvalidOrigin(String),
    #[error("invalid method `{0}`")]
    InvalidMethod(String),
    #[error("invalid header `{0}`")]
    InvalidHeader(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum OriginRule {
    Any,
    /// Serialized origin, e.g. `https://app.example.com`.
    Exact(String),
    /// `scheme://*.example.com[:port]`: any subdomain of `example.com`.
    Subdomain {
        scheme: String,
        suffix: String,
        port: Option<u16>,
    },
}

impl OriginRule {
    fn parse(raw: &str) -> Result<Self, CorsPolicyError> {
        let invalid = || CorsPolicyError::InvalidOrigin(raw.to_string());
        if raw == "*" {
            return Ok(Self::Any);
        }

        if let Some((scheme, rest)) = raw.split_once("://*.") {
            let url = parse_origin(&format!("{scheme}://{rest}")).ok_or_else(invalid)?;
            let host = url.host_str().ok_or_else(invalid)?;
            return Ok(Self::Subdomain {
                scheme: url.scheme().to_string(),
                suffix: format!(".{host}"),
                port: url.port_or_known_default(),
            });
        }

        let url = parse_origin(raw).ok_or_else(invalid)?;
        Ok(Self::Exact(url.origin().ascii_serialization()))
    }

    fn matches(&self, origin: &Url) -> bool {
        match self {
            OriginRule::Any => true,
            OriginRule::Exact(expected) => origin.origin().ascii_serialization() == *expected,
            OriginRule::Subdomain {
                scheme,
                suffix,
                port,
            } => {
                origin.scheme() == scheme
                    && origin.port_or_known_default() == *port
                    && origin
                        .host_str()
                        .is_some_and(|host| host.len() > suffix.len() && host.ends_with(suffix.as_str()))
            }
        }
    }
}

/// An origin is `scheme://host[:port]` with nothing after it.
fn parse_origin(raw: &str) -> Option<Url> {
    let url = Url::parse(raw).ok()?;
    let bare = url.host_str().is_some()
        && url.path() == "/"
        && !raw.ends_with('/')
        && url.query().is_none()
        && url.fragment().is_none()
        && url.username().is_empty()
        && url.password().is_none();
    bare.then_some(url)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedHeaders {
    /// Any request header (the preflight's requested headers are echoed).
    Any,
    List(Vec<HeaderName>),
}

/// Response headers negotiated for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsDecision {
    pub allow_origin: HeaderValue,
    pub allow_methods: Vec<Method>,
    pub allow_headers: AllowedHeaders,
    pub allow_credentials: bool,
    pub max_age: Duration,
}

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: Vec<OriginRule>,
    methods: Vec<Method>,
    headers: AllowedHeaders,
    allow_credentials: bool,
    max_age: Duration,
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig) -> Result<Self, CorsPolicyError> {
        let origins = config
            .allowed_origins
            .iter()
            .map(|o| OriginRule::parse(o.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        if config.allow_credentials && origins.contains(&OriginRule::Any) {
            return Err(CorsPolicyError::WildcardWithCredentials);
        }

        let methods = config
            .allowed_methods
            .iter()
            .map(|m| {
                Method::from_str(&m.trim().to_ascii_uppercase())
                    .map_err(|_| CorsPolicyError::InvalidMethod(m.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let headers = if config.allowed_headers.iter().any(|h| h.trim() == "*") {
            AllowedHeaders::Any
        } else {
            let names = config
                .allowed_headers
                .iter()
                .map(|h| {
                    HeaderName::from_str(h.trim())
                        .map_err(|_| CorsPolicyError::InvalidHeader(h.clone()))
                })
                .collect::<Result<Vec<_>, _>>()?;
            AllowedHeaders::List(names)
        };

        Ok(Self {
            origins,
            methods,
            headers,
            allow_credentials: config.allow_credentials,
            max_age: config.max_age,
        })
    }

    pub fn allows_origin(&self, origin: &HeaderValue) -> bool {
        let Some(url) = origin.to_str().ok().and_then(parse_origin) else {
            return false;
        };
        self.origins.iter().any(|rule| rule.matches(&url))
    }

    /// `None` means "emit no CORS headers".
    pub fn decide(&self, origin: Option<&HeaderValue>) -> Option<CorsDecision> {
        let origin = origin.filter(|o| self.allows_origin(o))?;
        Some(CorsDecision {
            allow_origin: origin.clone(),
            allow_methods: self.methods.clone(),
            allow_headers: self.headers.clone(),
            allow_credentials: self.allow_credentials,
            max_age: self.max_age,
        })
    }

    /// tower-http layer driven by this policy.
    pub fn layer(self: &Arc<Self>) -> CorsLayer {
        let policy = Arc::clone(self);
        let allow_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _parts: &Parts| {
            policy.allows_origin(origin)
        });

        let allow_headers = match &self.headers {
            AllowedHeaders::Any => AllowHeaders::mirror_request(),
            AllowedHeaders::List(names) => AllowHeaders::list(names.clone()),
        };

        CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(self.methods.clone())
            .allow_headers(allow_headers)
            .allow_credentials(self.allow_credentials)
            .max_age(self.max_age)
    }
}

/// `OPTIONS` carrying `Access-Control-Request-Method`.
pub fn is_preflight(method: &Method, headers: &HeaderMap) -> bool {
    method == Method::OPTIONS && headers.contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

/// Apply the CORS policy to the given Router.
pub fn apply(router: Router, policy: &Arc<CorsPolicy>) -> Router {
    router.layer(policy.layer())
}

//! Authentication gate: classify → extract → validate → resolve.
//!
//! The gate never fails the request itself. It only moves the request's
//! `SecurityContext` to its final state and reports what happened; the caller
//! turns that into a response through `decision::decide`.
//!
//! Flow per request:
//! - Public route: nothing is read, even a garbage `Authorization` header.
//! - Context already authenticated: forwarded untouched (the gate composes with itself).
//! - No bearer credential: context stays empty (401 comes from the decision).
//! - Bearer credential: validated and resolved in a separate task bounded by a
//!   timeout; any error, panic or timeout becomes `InvalidOrExpiredToken`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{HeaderMap, Method, header};
use chrono::Utc;

use crate::error::AuthFailure;
use crate::security::authority::TokenAuthority;
use crate::security::classifier::{Classification, RouteClassifier};
use crate::security::context::{AuthDetails, SecurityContext};
use crate::security::principal::{Credential, Principal};
use crate::security::store::PrincipalStore;

pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Request metadata recorded for audit on success.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub remote_addr: Option<SocketAddr>,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Public route; authentication was not attempted.
    Skipped,
    /// The context was already authenticated by an earlier pass.
    AlreadyAuthenticated,
    /// Protected route without a usable bearer credential; context left empty.
    NoCredential(AuthFailure),
    Authenticated,
    Rejected(AuthFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateResult {
    pub classification: Classification,
    pub outcome: GateOutcome,
}

enum Bearer {
    Absent(AuthFailure),
    Present(Credential),
}

#[derive(Clone)]
pub struct AuthenticationGate {
    classifier: Arc<RouteClassifier>,
    authority: Arc<dyn TokenAuthority>,
    store: Arc<dyn PrincipalStore>,
    lookup_timeout: Duration,
}

impl std::fmt::Debug for AuthenticationGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationGate")
            .field("classifier", &self.classifier)
            .field("store", &self.store.backend_name())
            .field("lookup_timeout", &self.lookup_timeout)
            .finish()
    }
}

impl AuthenticationGate {
    pub fn new(
        classifier: RouteClassifier,
        authority: Arc<dyn TokenAuthority>,
        store: Arc<dyn PrincipalStore>,
    ) -> Self {
        Self {
            classifier: Arc::new(classifier),
            authority,
            store,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
        }
    }

    pub fn with_lookup_timeout(mut self, lookup_timeout: Duration) -> Self {
        self.lookup_timeout = lookup_timeout;
        self
    }

    pub fn classify(&self, method: &Method, path: &str) -> Classification {
        self.classifier.classify(method, path)
    }

    pub async fn run(
        &self,
        method: &Method,
        path: &str,
        headers: &HeaderMap,
        meta: RequestMeta,
        ctx: &mut SecurityContext,
    ) -> GateResult {
        let classification = self.classify(method, path);
        let outcome = match classification {
            Classification::Public => GateOutcome::Skipped,
            Classification::Protected => self.authenticate(headers, meta, ctx).await,
        };

        GateResult {
            classification,
            outcome,
        }
    }

    async fn authenticate(
        &self,
        headers: &HeaderMap,
        meta: RequestMeta,
        ctx: &mut SecurityContext,
    ) -> GateOutcome {
        if ctx.is_authenticated() {
            return GateOutcome::AlreadyAuthenticated;
        }
        if let Some(failure) = ctx.failure() {
            return GateOutcome::Rejected(failure);
        }

        let credential = match bearer_credential(headers) {
            Bearer::Present(credential) => credential,
            Bearer::Absent(failure) => {
                tracing::debug!(reason = failure.code(), "no bearer credential");
                return GateOutcome::NoCredential(failure);
            }
        };

        match self.resolve(credential).await {
            Ok(principal) => {
                let details = AuthDetails {
                    remote_addr: meta.remote_addr,
                    request_id: meta.request_id,
                    authenticated_at: Utc::now(),
                };
                tracing::debug!(
                    principal_id = %principal.id,
                    remote_addr = ?details.remote_addr,
                    request_id = ?details.request_id,
                    "request authenticated"
                );
                match ctx.authenticate(principal, details) {
                    Ok(()) => GateOutcome::Authenticated,
                    Err(err) => {
                        tracing::error!(error = %err, "security context already set");
                        GateOutcome::Rejected(AuthFailure::InvalidOrExpiredToken)
                    }
                }
            }
            Err(failure) => {
                tracing::warn!(
                    reason = failure.code(),
                    remote_addr = ?meta.remote_addr,
                    request_id = ?meta.request_id,
                    "authentication rejected"
                );
                if let Err(err) = ctx.reject(failure) {
                    tracing::error!(error = %err, "security context already set");
                }
                GateOutcome::Rejected(failure)
            }
        }
    }

    /// Runs validation and lookup in their own task so that a panicking or
    /// hanging collaborator ends in a defined state.
    async fn resolve(&self, credential: Credential) -> Result<Principal, AuthFailure> {
        let authority = Arc::clone(&self.authority);
        let store = Arc::clone(&self.store);

        let mut task = tokio::spawn(async move {
            resolve_principal(authority.as_ref(), store.as_ref(), &credential).await
        });

        match tokio::time::timeout(self.lookup_timeout, &mut task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => {
                tracing::error!(error = %join_err, "authentication task failed");
                Err(AuthFailure::InvalidOrExpiredToken)
            }
            Err(_) => {
                task.abort();
                tracing::error!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "authentication timed out"
                );
                Err(AuthFailure::InvalidOrExpiredToken)
            }
        }
    }
}

async fn resolve_principal(
    authority: &dyn TokenAuthority,
    store: &dyn PrincipalStore,
    credential: &Credential,
) -> Result<Principal, AuthFailure> {
    if credential.is_empty() {
        return Err(AuthFailure::MalformedCredential);
    }

    let extracted = authority
        .extract_identity(credential)
        .filter(|identity| !identity.is_empty())
        .ok_or(AuthFailure::InvalidOrExpiredToken)?;

    let identity = authority.validate(credential).map_err(|err| {
        tracing::debug!(error = %err, "token validation failed");
        AuthFailure::InvalidOrExpiredToken
    })?;

    if identity.is_empty() || identity != extracted {
        tracing::warn!("validated identity does not match token claims");
        return Err(AuthFailure::InvalidOrExpiredToken);
    }

    let principal = store
        .find_by_identity(&identity)
        .await
        .map_err(|err| {
            tracing::error!(
                error = %err,
                backend = store.backend_name(),
                "principal lookup failed"
            );
            AuthFailure::InvalidOrExpiredToken
        })?
        .ok_or(AuthFailure::UnknownPrincipal)?;

    if !identity.matches_email(&principal.email) {
        return Err(AuthFailure::UnknownPrincipal);
    }

    Ok(principal)
}

/// `Authorization: Bearer <token>`; the scheme word is case-insensitive.
fn bearer_credential(headers: &HeaderMap) -> Bearer {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Bearer::Absent(AuthFailure::MissingCredential);
    };
    let Ok(value) = value.to_str() else {
        return Bearer::Absent(AuthFailure::MalformedCredential);
    };

    let value = value.trim();
    let (scheme, token) = value
        .split_once(char::is_whitespace)
        .unwrap_or((value, ""));

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Bearer::Absent(AuthFailure::MissingCredential);
    }

    Bearer::Present(Credential::new(token.trim()))
}

/*
 * Responsibility
 * - Request-scoped values that flow through the gate:
 *   Credential (raw bearer string) → Identity (validated claim) → Principal (user record)
 * - None of these are persisted or shared across requests
 */
use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Raw bearer token taken from the `Authorization` header.
///
/// Opaque until a `TokenAuthority` validates it. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

/// Validated identity claim (the token subject, an e-mail address in this deployment).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub fn new(claim: impl Into<String>) -> Self {
        Self(claim.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Blank claims are treated as "no identity".
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Case-insensitive comparison used to cross-check a principal's e-mail.
    pub fn matches_email(&self, email: &str) -> bool {
        self.0.trim().eq_ignore_ascii_case(email.trim())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Application user resolved from an `Identity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
}

impl Principal {
    pub fn new(id: Uuid, email: impl Into<String>) -> Self {
        Self {
            id,
            email: email.into(),
        }
    }
}

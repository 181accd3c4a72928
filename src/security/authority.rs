use thiserror::Error;

use crate::security::principal::{Credential, Identity};

/// Token validation failures.
///
/// The gate collapses all of them into one `InvalidOrExpiredToken`; the variants
/// only show up in logs.
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("malformed token: {0}")]
    Malformed(String),
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("invalid claim: {0}")]
    InvalidClaim(&'static str),
    #[error("empty identity claim")]
    EmptyIdentity,
}

/// Validates bearer tokens and extracts their identity claim.
///
/// Implementations must be thread-safe; one instance is shared by all requests.
pub trait TokenAuthority: Send + Sync {
    /// Full validation (signature, expiry, configured claims).
    fn validate(&self, credential: &Credential) -> Result<Identity, TokenError>;

    /// Reads the identity claim without validating the token.
    ///
    /// `None` when the token carries no usable identity.
    fn extract_identity(&self, credential: &Credential) -> Option<Identity>;
}

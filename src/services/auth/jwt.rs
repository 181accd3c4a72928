//! JWT-backed `TokenAuthority`.
//!
//! Tokens are issued by the external login endpoint. The identity claim is
//! `sub` (the user's e-mail). Signature, `exp` (with leeway) and, when
//! configured, `iss`/`aud` are verified by `jsonwebtoken::Validation`.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, errors::ErrorKind};
use serde::Deserialize;

use crate::config::JwtKey;
use crate::security::authority::{TokenAuthority, TokenError};
use crate::security::principal::{Credential, Identity};

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidIssuer => TokenError::InvalidClaim("iss"),
            ErrorKind::InvalidAudience => TokenError::InvalidClaim("aud"),
            ErrorKind::ImmatureSignature => TokenError::InvalidClaim("nbf"),
            ErrorKind::MissingRequiredClaim(_) => TokenError::InvalidClaim("required"),
            _ => TokenError::Malformed(e.to_string()),
        }
    }
}

/// The only claim read after validation; `exp`/`iss`/`aud` are checked by `Validation`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenClaims {
    #[serde(default)]
    pub sub: String,
}

/// Key material is intentionally not printable via Debug.
#[derive(Clone)]
pub struct JwtTokenAuthority {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtTokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtTokenAuthority")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtTokenAuthority {
    pub fn new(
        key: &JwtKey,
        issuer: Option<&str>,
        audience: Option<&str>,
        leeway_seconds: u64,
    ) -> Result<Self, jsonwebtoken::errors::Error> {
        let (decoding_key, algorithm) = match key {
            JwtKey::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            JwtKey::Ed25519PublicPem(pem) => {
                (DecodingKey::from_ed_pem(pem.as_bytes())?, Algorithm::EdDSA)
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }
        match audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Verify and decode the token, then check required claims are not blank.
    pub fn verify_strict(&self, token: &str) -> Result<AccessTokenClaims, TokenError> {
        let data =
            jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)?;
        let claims = data.claims;

        if claims.sub.trim().is_empty() {
            return Err(TokenError::EmptyIdentity);
        }

        Ok(claims)
    }
}

impl TokenAuthority for JwtTokenAuthority {
    fn validate(&self, credential: &Credential) -> Result<Identity, TokenError> {
        let claims = self.verify_strict(credential.as_str())?;
        Ok(Identity::new(claims.sub))
    }

    fn extract_identity(&self, credential: &Credential) -> Option<Identity> {
        // Reads `sub` only; signature and expiry are left to `validate`.
        jsonwebtoken::dangerous::insecure_decode::<AccessTokenClaims>(credential.as_str())
            .ok()
            .map(|data| Identity::new(data.claims.sub))
            .filter(|identity| !identity.is_empty())
    }
}

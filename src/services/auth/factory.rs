/// Factory: build the `TokenAuthority` from application `Config`.
use std::sync::Arc;

use crate::config::{AuthConfig, ConfigError, JwtKey};
use crate::security::authority::TokenAuthority;
use crate::services::auth::JwtTokenAuthority;

pub fn build_token_authority(config: &AuthConfig) -> Result<Arc<dyn TokenAuthority>, ConfigError> {
    let authority = JwtTokenAuthority::new(
        &config.jwt_key,
        config.issuer.as_deref(),
        config.audience.as_deref(),
        config.leeway_seconds,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "failed to load access token verification key");
        match config.jwt_key {
            JwtKey::Secret(_) => ConfigError::Invalid("AUTH_JWT_SECRET"),
            JwtKey::Ed25519PublicPem(_) => ConfigError::Invalid("ACCESS_JWT_PUBLIC_KEY_PEM"),
        }
    })?;

    Ok(Arc::new(authority))
}

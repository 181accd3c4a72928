use async_trait::async_trait;
use thiserror::Error;

use crate::repos::error::RepoError;
use crate::security::principal::{Identity, Principal};

/// Principal lookup failures (backend trouble, not "not found").
///
/// The gate treats these as authentication failures (fail-closed).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("principal store backend error: {0}")]
    Backend(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Resolves an identity to an application principal.
///
/// - `Ok(Some(_))` => principal found
/// - `Ok(None)`    => no such principal (deleted/unknown account)
/// - `Err(_)`      => backend failure
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    // Returns the store name (for logging).
    fn backend_name(&self) -> &'static str;

    async fn find_by_identity(&self, identity: &Identity) -> Result<Option<Principal>, StoreError>;
}

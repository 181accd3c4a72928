use async_trait::async_trait;
use sqlx::PgPool;

use crate::repos::user_repo;
use crate::security::principal::{Identity, Principal};
use crate::security::store::{PrincipalStore, StoreError};

/// `users` table lookup by e-mail.
#[derive(Debug, Clone)]
pub struct PgPrincipalStore {
    db: PgPool,
}

impl PgPrincipalStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PrincipalStore for PgPrincipalStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn find_by_identity(&self, identity: &Identity) -> Result<Option<Principal>, StoreError> {
        let row = user_repo::find_by_email(&self.db, identity.as_str().trim()).await?;

        Ok(row.map(|u| Principal::new(u.id, u.email)))
    }
}

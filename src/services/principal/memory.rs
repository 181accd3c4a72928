use std::collections::HashMap;

use async_trait::async_trait;

use crate::security::principal::{Identity, Principal};
use crate::security::store::{PrincipalStore, StoreError};

/// Immutable principal table keyed by lower-cased e-mail.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPrincipalStore {
    by_email: HashMap<String, Principal>,
}

impl InMemoryPrincipalStore {
    pub fn new(principals: impl IntoIterator<Item = Principal>) -> Self {
        let by_email = principals
            .into_iter()
            .map(|p| (p.email.trim().to_ascii_lowercase(), p))
            .collect();
        Self { by_email }
    }
}

#[async_trait]
impl PrincipalStore for InMemoryPrincipalStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find_by_identity(&self, identity: &Identity) -> Result<Option<Principal>, StoreError> {
        let key = identity.as_str().trim().to_ascii_lowercase();
        Ok(self.by_email.get(&key).cloned())
    }
}

//! Per-request security context.
//!
//! Exactly one context exists per request. It starts `Empty` and can be moved to
//! `Authenticated` or `Rejected` once; any later attempt to set it fails with
//! `ContextError::AlreadySet` and leaves the first value in place.

use std::net::SocketAddr;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::error::AuthFailure;
use crate::security::principal::Principal;

/// Audit metadata attached to a successful authentication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthDetails {
    pub remote_addr: Option<SocketAddr>,
    pub request_id: Option<String>,
    pub authenticated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ContextState {
    Empty,
    Authenticated {
        principal: Principal,
        details: AuthDetails,
    },
    Rejected(AuthFailure),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("security context is already set")]
    AlreadySet,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityContext {
    state: ContextState,
}

impl Default for SecurityContext {
    fn default() -> Self {
        Self::empty()
    }
}

impl SecurityContext {
    pub fn empty() -> Self {
        Self {
            state: ContextState::Empty,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.state, ContextState::Empty)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, ContextState::Authenticated { .. })
    }

    pub fn principal(&self) -> Option<&Principal> {
        match &self.state {
            ContextState::Authenticated { principal, .. } => Some(principal),
            _ => None,
        }
    }

    pub fn details(&self) -> Option<&AuthDetails> {
        match &self.state {
            ContextState::Authenticated { details, .. } => Some(details),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<AuthFailure> {
        match self.state {
            ContextState::Rejected(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn authenticate(
        &mut self,
        principal: Principal,
        details: AuthDetails,
    ) -> Result<(), ContextError> {
        self.set(ContextState::Authenticated { principal, details })
    }

    pub fn reject(&mut self, failure: AuthFailure) -> Result<(), ContextError> {
        self.set(ContextState::Rejected(failure))
    }

    fn set(&mut self, next: ContextState) -> Result<(), ContextError> {
        if !self.is_empty() {
            return Err(ContextError::AlreadySet);
        }
        self.state = next;
        Ok(())
    }
}

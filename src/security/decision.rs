//! Terminal access policy.
//!
//! There is no role model, so a protected request without an authenticated
//! context is always `Unauthenticated` (401), never forbidden.

use crate::security::classifier::Classification;
use crate::security::context::SecurityContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Unauthenticated,
}

pub fn decide(classification: Classification, context: &SecurityContext) -> AccessDecision {
    match classification {
        Classification::Public => AccessDecision::Allow,
        Classification::Protected if context.is_authenticated() => AccessDecision::Allow,
        Classification::Protected => AccessDecision::Unauthenticated,
    }
}

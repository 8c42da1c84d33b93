//! Per-request evaluation context

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::grammar::GrantedSet;

/// Inputs for one authorization check
///
/// Created fresh for every request and dropped once the decision is made
/// (or kept alive by the [`Permissions`](crate::Permissions) capability).
/// Rule trees only read from it.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    granted: Arc<GrantedSet>,
    token: Value,
    claim: Value,
    request: Value,
    is_admin: bool,
}

impl EvaluationContext {
    /// Create a context with the admin flag unset
    pub fn new(granted: GrantedSet, token: Value, claim: Value, request: Value) -> Self {
        Self {
            granted: Arc::new(granted),
            token,
            claim,
            request,
            is_admin: false,
        }
    }

    /// Permissions parsed from the token's claim
    pub fn granted(&self) -> &GrantedSet {
        &self.granted
    }

    pub(crate) fn shared_granted(&self) -> Arc<GrantedSet> {
        Arc::clone(&self.granted)
    }

    /// The decoded token
    pub fn token(&self) -> &Value {
        &self.token
    }

    /// Raw claim value as found in the token (`null` when absent)
    pub fn claim(&self) -> &Value {
        &self.claim
    }

    /// Request summary supplied by the request adapter
    pub fn request(&self) -> &Value {
        &self.request
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub(crate) fn set_admin(&mut self, is_admin: bool) {
        self.is_admin = is_admin;
    }

    /// Owned copy of the fields predicates may see
    ///
    /// Every predicate call gets its own copy, so a predicate cannot change
    /// what later predicates observe.
    pub fn predicate_context(&self) -> PredicateContext {
        PredicateContext {
            token: self.token.clone(),
            claim: self.claim.clone(),
            request: self.request.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// Context handed to user predicates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredicateContext {
    /// The decoded token
    pub token: Value,

    /// Raw claim value (`null` when absent)
    pub claim: Value,

    /// Request summary (method, path) when the adapter provides one
    pub request: Value,

    /// Outcome of the admin check, `false` while the admin check itself runs
    pub is_admin: bool,
}

//! Authorization inputs and per-scope access predicates

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::scope::{Grant, ScopeFilter, ScopeSet};
use crate::types::ResourceView;

/// Authenticated principal as handed over by the session/token layer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationContext {
    /// Name of the user or service making the request
    pub principal_name: String,

    /// Raw scopes granted directly to the presented token
    #[serde(default)]
    pub granted_scopes: BTreeSet<String>,

    /// Roles assigned to the principal, in assignment order
    #[serde(default)]
    pub roles: Vec<String>,
}

impl AuthorizationContext {
    /// Context with no roles and no token scopes
    pub fn new(principal_name: impl Into<String>) -> Self {
        Self {
            principal_name: principal_name.into(),
            granted_scopes: BTreeSet::new(),
            roles: Vec::new(),
        }
    }

    /// Assigns a role
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Grants a raw scope directly to the token
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.granted_scopes.insert(scope.into());
        self
    }
}

/// Decides whether a held scope reaches a given resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessPredicate {
    /// Wildcard or unfiltered grant
    Allow,
    /// Scope not held
    Deny,
    /// Admits only what the filter names
    Filtered(Arc<ScopeFilter>),
}

impl AccessPredicate {
    /// Builds the predicate for `scope_name` under `scopes`
    pub fn build(scope_name: &str, scopes: &ScopeSet) -> Self {
        if scopes.is_all() {
            return Self::Allow;
        }

        match scopes.grant(scope_name) {
            None => Self::Deny,
            Some(Grant::Unrestricted) => Self::Allow,
            Some(Grant::Filtered(filter)) => Self::Filtered(Arc::clone(filter)),
        }
    }

    /// Whether the predicate admits the resource
    pub fn allows(&self, resource: ResourceView<'_>) -> bool {
        match self {
            Self::Allow => true,
            Self::Deny => false,
            Self::Filtered(filter) => filter.admits(resource),
        }
    }
}

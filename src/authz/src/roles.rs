//! Role definitions
//!
//! A role is a named bundle of raw scope strings. Principals are assigned
//! roles; the resolver expands them into a scope set on every request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::ScopeResolutionError;
use crate::scope::{self, catalog, ParsedScope};

/// Name of the built-in role granting everything
pub const ADMIN_ROLE: &str = "admin";

/// Named bundle of scopes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleDefinition {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Raw scope strings granted by the role
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl RoleDefinition {
    /// Creates a role granting the given raw scopes
    pub fn new<I, S>(name: impl Into<String>, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            description: None,
            scopes: scopes.into_iter().map(Into::into).collect(),
        }
    }

    /// Sets a human-readable description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Parses every scope of the role and checks it against the catalog
    pub fn parsed_scopes(&self) -> Result<Vec<ParsedScope>, ScopeResolutionError> {
        self.scopes
            .iter()
            .map(|raw| {
                let parsed = scope::parse(raw).map_err(|source| {
                    ScopeResolutionError::MalformedScope {
                        role: self.name.clone(),
                        source,
                    }
                })?;
                if let ParsedScope::Token(token) = &parsed {
                    if !catalog::is_defined(&token.name()) {
                        return Err(ScopeResolutionError::UndefinedScope {
                            role: self.name.clone(),
                            scope: raw.clone(),
                        });
                    }
                }
                Ok(parsed)
            })
            .collect()
    }
}

/// Registry of the roles known to the process
#[derive(Debug, Clone, Default)]
pub struct RoleRegistry {
    roles: BTreeMap<String, RoleDefinition>,
}

impl RoleRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in `admin` role
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.insert(
            RoleDefinition::new(ADMIN_ROLE, [scope::ALL_SCOPE])
                .with_description("Elevated privileges (can do anything)"),
        );
        registry
    }

    /// Adds a role, replacing any role of the same name
    pub fn insert(&mut self, role: RoleDefinition) {
        if let Some(previous) = self.roles.insert(role.name.clone(), role) {
            warn!("Role '{}' redefined", previous.name);
        }
    }

    /// Looks up a role by name
    pub fn get(&self, name: &str) -> Option<&RoleDefinition> {
        self.roles.get(name)
    }

    /// Number of registered roles
    pub fn len(&self) -> usize {
        self.roles.len()
    }

    /// Whether no role is registered
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Roles in name order
    pub fn iter(&self) -> impl Iterator<Item = &RoleDefinition> {
        self.roles.values()
    }

    /// Checks every role, reporting the first broken one
    pub fn validate(&self) -> Result<(), ScopeResolutionError> {
        for role in self.roles.values() {
            role.parsed_scopes()?;
        }
        Ok(())
    }
}

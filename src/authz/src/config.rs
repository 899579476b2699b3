//! Policy configuration loading and validation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::engine::AccessEngine;
use crate::projection::AccessMap;
use crate::roles::{RoleDefinition, RoleRegistry};

/// Complete policy document
///
/// ```toml
/// [[roles]]
/// name = "reader"
/// scopes = ["read:users:name", "read:groups!group=staff"]
///
/// [access_map.users]
/// "read:users:name" = ["kind", "name"]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    #[serde(default)]
    pub roles: Vec<RoleDefinition>,

    /// Replaces the built-in access map when present; validated while parsing
    #[serde(default)]
    pub access_map: Option<AccessMap>,
}

impl PolicyConfig {
    /// Load policy from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read policy file {}", path.display()))?;

        Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to load policy file {}", path.display()))
    }

    /// Parse policy from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: PolicyConfig =
            toml::from_str(contents).context("Failed to parse policy file")?;
        Ok(config)
    }

    /// Validate policy
    pub fn validate(&self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for role in &self.roles {
            if role.name.is_empty() {
                anyhow::bail!("Role names must not be empty");
            }
            if !seen.insert(role.name.as_str()) {
                anyhow::bail!("Role '{}' is defined more than once", role.name);
            }
            role.parsed_scopes()
                .with_context(|| format!("Invalid role '{}'", role.name))?;
        }

        Ok(())
    }

    /// Built-in roles overlaid with the roles of this file
    pub fn role_registry(&self) -> RoleRegistry {
        let mut registry = RoleRegistry::with_defaults();
        for role in &self.roles {
            registry.insert(role.clone());
        }
        registry
    }

    /// Access map of this file, or the built-in one
    pub fn access_map(&self) -> Arc<AccessMap> {
        match &self.access_map {
            Some(map) => Arc::new(map.clone()),
            None => AccessMap::builtin(),
        }
    }

    /// Validates and builds an engine
    pub fn into_engine(self) -> Result<AccessEngine> {
        self.validate()?;

        let roles = self.role_registry();
        let access_map = self.access_map.unwrap_or_default();
        info!(
            "Loaded policy with {} roles ({} custom)",
            roles.len(),
            self.roles.len()
        );
        Ok(AccessEngine::new(roles, access_map))
    }
}

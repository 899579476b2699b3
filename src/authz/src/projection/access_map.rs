//! Static mapping from scope names to the model fields they unlock
//!
//! The access map is the policy's wire format. It is built once, validated
//! at load time and shared read-only for the life of the process.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::models::model_fields;
use crate::error::{AuthzError, Result};
use crate::scope::{self, catalog, ParsedScope};
use crate::types::ResourceKind;

/// Scope name → unlocked field names, for one resource kind
pub type FieldTable = BTreeMap<String, BTreeSet<String>>;

static BUILTIN: Lazy<Arc<AccessMap>> = Lazy::new(|| Arc::new(AccessMap::builtin_table()));

/// Per-kind access tables
///
/// Deserialization validates the tables, so an `AccessMap` in hand is
/// always well-formed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAccessMap")]
pub struct AccessMap {
    users: FieldTable,
    groups: FieldTable,
    services: FieldTable,
    tokens: FieldTable,
}

/// Unchecked wire form of an access map
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAccessMap {
    #[serde(default)]
    users: FieldTable,
    #[serde(default)]
    groups: FieldTable,
    #[serde(default)]
    services: FieldTable,
    #[serde(default)]
    tokens: FieldTable,
}

impl TryFrom<RawAccessMap> for AccessMap {
    type Error = AuthzError;

    fn try_from(raw: RawAccessMap) -> Result<Self> {
        let map = Self {
            users: raw.users,
            groups: raw.groups,
            services: raw.services,
            tokens: raw.tokens,
        };
        map.validate()?;
        Ok(map)
    }
}

fn entry(scope: &str, fields: &[&str]) -> (String, BTreeSet<String>) {
    (
        scope.to_string(),
        fields.iter().map(|f| f.to_string()).collect(),
    )
}

impl AccessMap {
    /// Shared handle to the built-in table
    pub fn builtin() -> Arc<AccessMap> {
        Arc::clone(&BUILTIN)
    }

    fn builtin_table() -> Self {
        let users = [
            entry(
                "read:users",
                &[
                    "kind",
                    "name",
                    "admin",
                    "roles",
                    "groups",
                    "server",
                    "pending",
                    "created",
                    "last_activity",
                ],
            ),
            entry("read:users:name", &["kind", "name"]),
            entry("read:users:groups", &["kind", "name", "groups"]),
            entry("read:users:activity", &["kind", "name", "last_activity"]),
            entry("read:users:servers", &["kind", "name", "servers"]),
            entry("read:users:auth_state", &["kind", "name", "auth_state"]),
            entry("read:users:server_state", &["kind", "name", "server_state"]),
        ];
        let groups = [
            entry("read:groups", &["kind", "name", "users"]),
            entry("read:groups:name", &["kind", "name"]),
        ];
        let services = [
            entry("read:services", &["kind", "name", "roles", "admin"]),
            entry("read:services:name", &["kind", "name"]),
        ];
        let tokens = [entry(
            "read:tokens",
            &[
                "kind",
                "id",
                "user",
                "service",
                "roles",
                "created",
                "last_activity",
                "expires_at",
                "note",
                "oauth_client",
            ],
        )];

        Self {
            users: users.into_iter().collect(),
            groups: groups.into_iter().collect(),
            services: services.into_iter().collect(),
            tokens: tokens.into_iter().collect(),
        }
    }

    /// Parses a TOML document and validates it
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let raw: RawAccessMap = toml::from_str(source)
            .map_err(|e| AuthzError::Config(format!("Failed to parse access map: {}", e)))?;
        Self::try_from(raw)
    }

    /// Scope table of one resource kind
    pub fn table(&self, kind: ResourceKind) -> &FieldTable {
        match kind {
            ResourceKind::Users => &self.users,
            ResourceKind::Groups => &self.groups,
            ResourceKind::Services => &self.services,
            ResourceKind::Tokens => &self.tokens,
        }
    }

    /// Total number of scope entries across kinds
    pub fn scope_count(&self) -> usize {
        ResourceKind::ALL.iter().map(|k| self.table(*k).len()).sum()
    }

    /// Every field any scope of the kind can unlock
    pub fn field_union(&self, kind: ResourceKind) -> BTreeSet<String> {
        self.table(kind).values().flatten().cloned().collect()
    }

    /// Fields unlocked by the held scope names, ignoring filters
    pub fn unlocked_fields(&self, kind: ResourceKind, scopes: &scope::ScopeSet) -> BTreeSet<String> {
        self.table(kind)
            .iter()
            .filter(|(name, _)| scopes.contains(name))
            .flat_map(|(_, fields)| fields.iter().cloned())
            .collect()
    }

    /// Checks scope names and field names of every table
    ///
    /// Scope names must parse, carry no filter, belong to the table's kind
    /// and be known to the catalog. Fields must exist in the kind's model.
    pub fn validate(&self) -> Result<()> {
        for kind in ResourceKind::ALL {
            let known = model_fields(kind);

            for (name, fields) in self.table(kind) {
                let token = match scope::parse(name)? {
                    ParsedScope::Token(token) => token,
                    ParsedScope::All => {
                        return Err(AuthzError::Config(format!(
                            "Access map for {} cannot list the wildcard scope",
                            kind
                        )))
                    }
                };

                if token.is_filtered() {
                    return Err(AuthzError::Config(format!(
                        "Access map scope '{}' must not carry a filter",
                        name
                    )));
                }
                if token.kind != kind {
                    return Err(AuthzError::Config(format!(
                        "Access map scope '{}' listed under {}",
                        name, kind
                    )));
                }
                if !catalog::is_defined(name) {
                    return Err(AuthzError::Config(format!(
                        "Access map scope '{}' is not a known scope",
                        name
                    )));
                }
                if let Some(unknown) = fields.iter().find(|f| !known.contains(&f.as_str())) {
                    return Err(AuthzError::Config(format!(
                        "Access map scope '{}' unlocks unknown {} field '{}'",
                        name, kind, unknown
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Default for AccessMap {
    fn default() -> Self {
        (*Self::builtin()).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_is_valid() {
        let map = AccessMap::default();
        map.validate().unwrap();
        assert_eq!(map.scope_count(), 12);
    }

    #[test]
    fn test_builtin_is_shared() {
        assert!(Arc::ptr_eq(&AccessMap::builtin(), &AccessMap::builtin()));
    }

    #[test]
    fn test_field_union_users() {
        let union = AccessMap::default().field_union(ResourceKind::Users);
        assert!(union.contains("auth_state"));
        assert!(union.contains("servers"));
        assert!(union.contains("server_state"));
    }

    #[test]
    fn test_unlocked_fields() {
        let map = AccessMap::default();
        let scopes = scope::ScopeSet::from_raw(["read:users:groups"]).unwrap();
        let fields = map.unlocked_fields(ResourceKind::Users, &scopes);
        assert_eq!(fields.len(), 3);
        assert!(fields.contains("groups"));
    }

    #[test]
    fn test_from_toml() {
        let map = AccessMap::from_toml_str(
            r#"
            [users]
            "read:users:name" = ["kind", "name"]

            [groups]
            "read:groups" = ["kind", "name", "users"]
            "#,
        )
        .unwrap();

        assert_eq!(map.table(ResourceKind::Users).len(), 1);
        assert!(map.table(ResourceKind::Tokens).is_empty());
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = AccessMap::from_toml_str(
            r#"
            [users]
            "read:users" = ["kind", "password"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_rejects_wrong_kind() {
        let err = AccessMap::from_toml_str(
            r#"
            [services]
            "read:users" = ["kind"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AuthzError::Config(_)));
    }

    #[test]
    fn test_rejects_filtered_scope() {
        let err = AccessMap::from_toml_str(
            r#"
            [users]
            "read:users!user=alice" = ["kind"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("filter"));
    }

    #[test]
    fn test_rejects_misspelled_table() {
        let err = AccessMap::from_toml_str(
            r#"
            [user]
            "read:users" = ["kind", "name"]
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown field `user`"));
    }

    #[test]
    fn test_deserialize_validates() {
        let err = serde_json::from_value::<AccessMap>(serde_json::json!({
            "services": {"read:users": ["kind", "name", "admin"]}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("read:users"));

        let err = toml::from_str::<AccessMap>("[groups]\n\"read:groups\" = [\"members\"]\n").unwrap_err();
        assert!(err.to_string().contains("members"));

        let map: AccessMap = serde_json::from_value(serde_json::json!({
            "services": {"read:services:name": ["kind", "name"]}
        }))
        .unwrap();
        assert_eq!(map.scope_count(), 1);
    }

    #[test]
    fn test_serialized_builtin_reloads() {
        let builtin = AccessMap::default();
        let text = toml::to_string(&builtin).unwrap();
        assert_eq!(AccessMap::from_toml_str(&text).unwrap(), builtin);
    }

    #[test]
    fn test_rejects_malformed_scope() {
        let err = AccessMap::from_toml_str(
            r#"
            [users]
            "users" = ["kind"]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, AuthzError::MalformedScope(_)));
    }
}

//! Catalog of known scopes
//!
//! Every scope a role or token may grant must be listed here. Broad scopes
//! imply narrower ones; resolution expands the implication transitively and
//! carries the granting scope's filter down to each implied scope.

use std::collections::BTreeSet;

use super::types::ScopeToken;

/// A known scope and the scopes it implies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub implies: &'static [&'static str],
}

const fn def(
    name: &'static str,
    description: &'static str,
    implies: &'static [&'static str],
) -> ScopeDefinition {
    ScopeDefinition {
        name,
        description,
        implies,
    }
}

/// All scopes the engine knows about
pub const SCOPE_DEFINITIONS: &[ScopeDefinition] = &[
    // users
    def(
        "admin:users",
        "Read, write, create and delete users.",
        &["read:users", "write:users", "delete:users"],
    ),
    def(
        "read:users",
        "Read user models (excluding servers and authentication state).",
        &["read:users:name", "read:users:groups", "read:users:activity"],
    ),
    def("read:users:name", "Read names of users.", &[]),
    def("read:users:groups", "Read users' group membership.", &[]),
    def("read:users:activity", "Read time of last user activity.", &[]),
    def("read:users:servers", "Read users' server models.", &[]),
    def("read:users:auth_state", "Read users' authentication state.", &[]),
    def("read:users:server_state", "Read users' server state.", &[]),
    def("write:users", "Modify user names, admin flags and group membership.", &[]),
    def("delete:users", "Delete users.", &[]),
    // groups
    def(
        "admin:groups",
        "Read, write, create and delete groups.",
        &["read:groups", "write:groups", "delete:groups"],
    ),
    def("read:groups", "Read group models.", &["read:groups:name"]),
    def("read:groups:name", "Read group names.", &[]),
    def("write:groups", "Add and remove group members.", &[]),
    def("delete:groups", "Delete groups.", &[]),
    // services
    def("admin:services", "Read and manage services.", &["read:services"]),
    def("read:services", "Read service models.", &["read:services:name"]),
    def("read:services:name", "Read service names.", &[]),
    def("access:services", "Access services through OAuth.", &[]),
    // tokens
    def(
        "admin:tokens",
        "Read, issue and revoke tokens.",
        &["read:tokens", "write:tokens", "delete:tokens"],
    ),
    def("read:tokens", "Read token models.", &[]),
    def("write:tokens", "Issue new tokens.", &[]),
    def("delete:tokens", "Revoke tokens.", &[]),
];

/// Looks up a scope by its fully-qualified name
pub fn definition(name: &str) -> Option<&'static ScopeDefinition> {
    SCOPE_DEFINITIONS.iter().find(|d| d.name == name)
}

/// Whether the name is a known scope
pub fn is_defined(name: &str) -> bool {
    definition(name).is_some()
}

/// Expands a token into itself plus every scope it implies
///
/// Unknown names yield no implications. Implied scopes inherit the
/// token's filter.
pub fn expand(token: &ScopeToken) -> Vec<ScopeToken> {
    let mut seen = BTreeSet::new();
    let mut stack = vec![token.name()];
    let mut expanded = Vec::new();

    while let Some(name) = stack.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }

        if name == token.name() {
            expanded.push(token.clone());
        } else if let Ok(super::ParsedScope::Token(mut implied)) = super::parse(&name) {
            implied.filter = token.filter.clone();
            expanded.push(implied);
        }

        if let Some(def) = definition(&name) {
            stack.extend(def.implies.iter().map(|s| s.to_string()));
        }
    }

    expanded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::{parse, ParsedScope, ScopeFilter};

    fn token(raw: &str) -> ScopeToken {
        match parse(raw).unwrap() {
            ParsedScope::Token(t) => t,
            ParsedScope::All => unreachable!(),
        }
    }

    #[test]
    fn test_catalog_entries_parse() {
        for def in SCOPE_DEFINITIONS {
            let parsed = parse(def.name).unwrap();
            assert!(matches!(parsed, ParsedScope::Token(ref t) if t.filter.is_none()));
            for implied in def.implies {
                assert!(is_defined(implied), "{} implies unknown {}", def.name, implied);
            }
        }
    }

    #[test]
    fn test_expand_leaf() {
        let expanded = expand(&token("read:users:name"));
        assert_eq!(expanded, vec![token("read:users:name")]);
    }

    #[test]
    fn test_expand_transitive() {
        let names: BTreeSet<String> = expand(&token("admin:users"))
            .iter()
            .map(ScopeToken::name)
            .collect();

        assert!(names.contains("admin:users"));
        assert!(names.contains("read:users"));
        assert!(names.contains("read:users:groups"));
        assert!(names.contains("delete:users"));
        assert!(!names.contains("read:users:auth_state"));
    }

    #[test]
    fn test_expand_carries_filter() {
        let expanded = expand(&token("read:users!group=staff"));
        assert!(expanded.len() > 1);
        for t in &expanded {
            assert_eq!(t.filter, Some(ScopeFilter::groups(["staff"])));
        }
    }
}

//! Scope resolver
//!
//! Expands a principal's roles and directly granted token scopes into the
//! normalized scope set used for every decision in a request.

use std::sync::Arc;
use tracing::{debug, warn};

use super::catalog;
use super::set::ScopeSet;
use super::types::{parse, ParsedScope};
use crate::engine::AuthorizationContext;
use crate::error::{AuthzError, ScopeResolutionError};
use crate::roles::RoleRegistry;

/// Resolves authorization contexts against a role registry
///
/// # Examples
///
/// ```
/// use hubscope_authz::engine::AuthorizationContext;
/// use hubscope_authz::roles::{RoleDefinition, RoleRegistry};
/// use hubscope_authz::scope::ScopeResolver;
///
/// let mut roles = RoleRegistry::with_defaults();
/// roles.insert(RoleDefinition::new("reader", ["read:users"]));
///
/// let resolver = ScopeResolver::new(roles);
/// let ctx = AuthorizationContext::new("alice").with_role("reader");
///
/// let scopes = resolver.resolve(&ctx).unwrap();
/// assert!(scopes.contains("read:users:name"));
/// ```
#[derive(Debug, Clone)]
pub struct ScopeResolver {
    roles: Arc<RoleRegistry>,
}

impl ScopeResolver {
    /// Creates a resolver owning its role registry
    pub fn new(roles: RoleRegistry) -> Self {
        Self {
            roles: Arc::new(roles),
        }
    }

    /// Creates a resolver over a registry shared with other resolvers
    pub fn from_shared(roles: Arc<RoleRegistry>) -> Self {
        Self { roles }
    }

    /// Registry roles are resolved against
    pub fn roles(&self) -> &RoleRegistry {
        &self.roles
    }

    /// Resolves the effective scope set of one request
    ///
    /// Role problems are configuration errors and surface as
    /// [`ScopeResolutionError`]. A malformed scope granted directly to the
    /// token rejects the request with a malformed-scope error.
    pub fn resolve(&self, ctx: &AuthorizationContext) -> Result<ScopeSet, AuthzError> {
        let mut parsed: Vec<ParsedScope> = Vec::new();

        for role_name in &ctx.roles {
            let role = self.roles.get(role_name).ok_or_else(|| {
                warn!(
                    "Principal '{}' is assigned unknown role '{}'",
                    ctx.principal_name, role_name
                );
                ScopeResolutionError::UnknownRole(role_name.clone())
            })?;

            let scopes = role.parsed_scopes().map_err(|err| {
                warn!("Failed to resolve role '{}': {}", role_name, err);
                err
            })?;
            parsed.extend(scopes);
        }

        for raw in &ctx.granted_scopes {
            let scope = parse(raw)?;
            if let ParsedScope::Token(token) = &scope {
                if !catalog::is_defined(&token.name()) {
                    warn!(
                        "Token of '{}' carries undefined scope '{}'",
                        ctx.principal_name, raw
                    );
                    return Err(ScopeResolutionError::UndefinedScope {
                        role: String::new(),
                        scope: raw.clone(),
                    }
                    .into());
                }
            }
            parsed.push(scope);
        }

        if parsed.iter().any(|s| matches!(s, ParsedScope::All)) {
            debug!("Resolved scopes for '{}': all", ctx.principal_name);
            return Ok(ScopeSet::all());
        }

        let expanded = parsed.into_iter().flat_map(|scope| match scope {
            ParsedScope::Token(token) => catalog::expand(&token)
                .into_iter()
                .map(ParsedScope::Token)
                .collect::<Vec<_>>(),
            ParsedScope::All => vec![ParsedScope::All],
        });

        let scopes = ScopeSet::from_parsed(expanded);
        debug!(
            "Resolved {} scopes for '{}': [{}]",
            scopes.len(),
            ctx.principal_name,
            scopes
        );
        Ok(scopes)
    }
}

impl Default for ScopeResolver {
    fn default() -> Self {
        Self::new(RoleRegistry::with_defaults())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::RoleDefinition;

    fn resolver() -> ScopeResolver {
        let mut roles = RoleRegistry::with_defaults();
        roles.insert(RoleDefinition::new("reader", ["read:users", "read:groups"]));
        roles.insert(RoleDefinition::new("staff-viewer", ["read:users:name!group=staff"]));
        roles.insert(RoleDefinition::new("nothing", Vec::<String>::new()));
        ScopeResolver::new(roles)
    }

    #[test]
    fn test_resolve_roles() {
        let ctx = AuthorizationContext::new("alice").with_role("reader");
        let scopes = resolver().resolve(&ctx).unwrap();

        assert!(scopes.contains("read:users"));
        assert!(scopes.contains("read:users:groups"));
        assert!(scopes.contains("read:groups:name"));
        assert!(!scopes.contains("read:users:auth_state"));
    }

    #[test]
    fn test_resolvers_share_registry() {
        let mut roles = RoleRegistry::with_defaults();
        roles.insert(RoleDefinition::new("reader", ["read:groups"]));
        let shared = Arc::new(roles);

        let first = ScopeResolver::from_shared(Arc::clone(&shared));
        let second = ScopeResolver::from_shared(Arc::clone(&shared));
        assert_eq!(Arc::strong_count(&shared), 3);

        let ctx = AuthorizationContext::new("alice").with_role("reader");
        assert_eq!(first.resolve(&ctx).unwrap(), second.resolve(&ctx).unwrap());
        assert_eq!(first.roles().len(), 2);
    }

    #[test]
    fn test_role_with_no_scopes() {
        let ctx = AuthorizationContext::new("alice").with_role("nothing");
        assert!(resolver().resolve(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_union_with_token_scopes() {
        let ctx = AuthorizationContext::new("svc")
            .with_role("staff-viewer")
            .with_scope("read:tokens");
        let scopes = resolver().resolve(&ctx).unwrap();

        assert!(scopes.contains("read:tokens"));
        assert!(scopes.contains("read:users:name"));
    }

    #[test]
    fn test_wildcard_collapses() {
        let ctx = AuthorizationContext::new("root")
            .with_role("reader")
            .with_role(crate::roles::ADMIN_ROLE);
        let scopes = resolver().resolve(&ctx).unwrap();
        assert!(scopes.is_all());
        assert_eq!(scopes.len(), 1);
    }

    #[test]
    fn test_unknown_role() {
        let ctx = AuthorizationContext::new("alice").with_role("ghost");
        let err = resolver().resolve(&ctx).unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Resolution(ScopeResolutionError::UnknownRole(ref r)) if r == "ghost"
        ));
    }

    #[test]
    fn test_undefined_role_scope() {
        let mut roles = RoleRegistry::new();
        roles.insert(RoleDefinition::new("odd", ["write:users:avatar"]));
        let ctx = AuthorizationContext::new("alice").with_role("odd");

        let err = ScopeResolver::new(roles).resolve(&ctx).unwrap_err();
        assert!(matches!(
            err,
            AuthzError::Resolution(ScopeResolutionError::UndefinedScope { .. })
        ));
    }

    #[test]
    fn test_malformed_token_scope() {
        let ctx = AuthorizationContext::new("alice").with_scope("read:users!pet=cat");
        let err = resolver().resolve(&ctx).unwrap_err();
        assert!(matches!(err, AuthzError::MalformedScope(_)));
        assert_eq!(err.status_code(), 400);
    }
}

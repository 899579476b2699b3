//! Scope resolution integration tests
//!
//! Role registry → resolver → request context, including failure modes
//! that must abort a request before any projection happens.

use hubscope_authz::{
    engine::AccessPredicate,
    scope::{Grant, ScopeFilter},
    types::{ResourceView, UserView},
    AccessEngine, AccessMap, AuthorizationContext, AuthzError, RoleDefinition, RoleRegistry,
    ScopeResolutionError, ScopeResolver,
};
use chrono::Utc;
use std::sync::Arc;
use std::thread;

fn registry() -> RoleRegistry {
    let mut roles = RoleRegistry::with_defaults();
    roles.insert(RoleDefinition::new("user", ["read:users!user=alice", "read:groups:name"]));
    roles.insert(RoleDefinition::new("staff-reader", ["read:users!group=staff"]));
    roles.insert(RoleDefinition::new("broken", ["read:users:shoe_size"]));
    roles
}

// ============================================================================
// RESOLUTION
// ============================================================================

#[test]
fn test_roles_and_token_scopes_merge() {
    let resolver = ScopeResolver::new(registry());
    let ctx = AuthorizationContext::new("alice")
        .with_role("user")
        .with_role("staff-reader")
        .with_scope("read:users:servers");

    let scopes = resolver.resolve(&ctx).unwrap();
    assert!(scopes.contains("read:users"));
    assert!(scopes.contains("read:users:activity"));
    assert!(scopes.contains("read:users:servers"));
    assert!(scopes.contains("read:groups:name"));

    let mut expected = ScopeFilter::targets(["alice"]);
    expected.merge(&ScopeFilter::groups(["staff"]));
    assert_eq!(scopes.grant("read:users"), Some(&Grant::Filtered(Arc::new(expected))));
}

#[test]
fn test_wildcard_dominates() {
    let resolver = ScopeResolver::new(registry());
    let ctx = AuthorizationContext::new("root")
        .with_role("user")
        .with_role("admin");

    let scopes = resolver.resolve(&ctx).unwrap();
    assert!(scopes.is_all());
    assert_eq!(scopes.len(), 1);
    assert_eq!(scopes.to_string(), "all");
}

#[test]
fn test_duplicate_grants_collapse() {
    let resolver = ScopeResolver::new(registry());
    let ctx = AuthorizationContext::new("alice")
        .with_role("user")
        .with_scope("read:groups:name");

    let scopes = resolver.resolve(&ctx).unwrap();
    assert_eq!(scopes.grant("read:groups:name"), Some(&Grant::Unrestricted));
    assert_eq!(scopes.tokens().filter(|t| t.name() == "read:groups:name").count(), 1);
}

#[test]
fn test_unknown_role_fails() {
    let err = ScopeResolver::new(registry())
        .resolve(&AuthorizationContext::new("x").with_role("ghost"))
        .unwrap_err();
    assert!(matches!(
        err,
        AuthzError::Resolution(ScopeResolutionError::UnknownRole(ref name)) if name == "ghost"
    ));
    assert_eq!(err.status_code(), 500);
}

#[test]
fn test_undefined_scope_in_role_fails() {
    let err = ScopeResolver::new(registry())
        .resolve(&AuthorizationContext::new("x").with_role("broken"))
        .unwrap_err();
    assert!(matches!(
        err,
        AuthzError::Resolution(ScopeResolutionError::UndefinedScope { .. })
    ));
}

#[test]
fn test_malformed_token_scope_rejects_request() {
    let err = ScopeResolver::new(registry())
        .resolve(&AuthorizationContext::new("x").with_scope("read-users"))
        .unwrap_err();
    assert!(matches!(err, AuthzError::MalformedScope(_)));
    assert_eq!(err.status_code(), 400);
}

// ============================================================================
// PREDICATES
// ============================================================================

#[test]
fn test_predicate_shapes() {
    let engine = AccessEngine::new(registry(), AccessMap::default());
    let request = engine
        .begin_request(&AuthorizationContext::new("alice").with_role("user"))
        .unwrap();

    assert_eq!(request.predicate_for("read:groups:name"), AccessPredicate::Allow);
    assert_eq!(request.predicate_for("read:tokens"), AccessPredicate::Deny);
    assert!(matches!(request.predicate_for("read:users"), AccessPredicate::Filtered(_)));

    let alice = UserView::new("alice", Utc::now());
    let bob = UserView::new("bob", Utc::now());
    assert!(request.require("read:users", ResourceView::User(&alice)).is_ok());

    let err = request.require("read:users", ResourceView::User(&bob)).unwrap_err();
    assert_eq!(err.to_string(), "Action requires scope 'read:users' on users");
    assert_eq!(AuthzError::from(err).status_code(), 403);
}

#[test]
fn test_concurrent_requests_are_isolated() {
    let engine = Arc::new(AccessEngine::new(registry(), AccessMap::default()));
    let bob = Arc::new(UserView::new("bob", Utc::now()).with_group("staff"));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let bob = Arc::clone(&bob);
            thread::spawn(move || {
                let role = if i % 2 == 0 { "staff-reader" } else { "user" };
                let request = engine
                    .begin_request(&AuthorizationContext::new(format!("p{}", i)).with_role(role))
                    .unwrap();
                (i, request.can_access("read:users", ResourceView::User(&bob)))
            })
        })
        .collect();

    for handle in handles {
        let (i, visible) = handle.join().unwrap();
        assert_eq!(visible, i % 2 == 0, "request {} leaked a predicate", i);
    }
}

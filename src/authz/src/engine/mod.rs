//! Access engine
//!
//! Orchestrates scope resolution, per-request predicate memoization and
//! model projection.
//!
//! # Architecture
//!
//! ```text
//! AuthorizationContext → ScopeResolver → RequestContext → ModelProjector → Model
//!                            ↓                 ↓
//!                       [RoleRegistry]   [PredicateCache]
//! ```
//!
//! A [`RequestContext`] is created per request and threaded explicitly
//! through every call. Nothing about a principal is stored on the engine.

pub mod cache;
pub mod decision;

pub use cache::{CacheStats, PredicateCache};
pub use decision::{AccessPredicate, AuthorizationContext};

use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AuthorizationError, Result};
use crate::projection::{AccessMap, Model, ModelProjector, ProjectionOptions};
use crate::roles::RoleRegistry;
use crate::scope::{ScopeResolver, ScopeSet};
use crate::types::ResourceView;

/// Everything one request needs to make access decisions
///
/// Immutable once built apart from the write-once predicate cache.
#[derive(Debug)]
pub struct RequestContext {
    request_id: Uuid,
    principal: String,
    scopes: ScopeSet,
    predicates: PredicateCache,
}

impl RequestContext {
    /// Opens a context with a fresh request id and an empty cache
    pub fn new(principal: impl Into<String>, scopes: ScopeSet) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            principal: principal.into(),
            scopes,
            predicates: PredicateCache::new(),
        }
    }

    /// Identifier used to correlate log lines of one request
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Name of the requesting user or service
    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Resolved scope set of the request
    pub fn scopes(&self) -> &ScopeSet {
        &self.scopes
    }

    /// Whether the scope name is held at all, ignoring filters
    pub fn has_scope(&self, scope_name: &str) -> bool {
        self.scopes.contains(scope_name)
    }

    /// Memoized predicate for a scope name
    pub fn predicate_for(&self, scope_name: &str) -> AccessPredicate {
        self.predicates.get_or_build(scope_name, &self.scopes)
    }

    /// Whether `scope_name` is held and reaches the resource
    pub fn can_access(&self, scope_name: &str, resource: ResourceView<'_>) -> bool {
        self.has_scope(scope_name) && self.predicate_for(scope_name).allows(resource)
    }

    /// Explicit denial for handlers that act on a single resource
    pub fn require(
        &self,
        scope_name: &str,
        resource: ResourceView<'_>,
    ) -> std::result::Result<(), AuthorizationError> {
        if self.can_access(scope_name, resource) {
            Ok(())
        } else {
            debug!(
                request_id = %self.request_id,
                "Denied {} on {} '{}' for '{}'",
                scope_name,
                resource.kind(),
                resource.name(),
                self.principal
            );
            Err(AuthorizationError {
                scope: scope_name.to_string(),
                resource_kind: resource.kind(),
            })
        }
    }

    /// Predicate cache counters for this request
    pub fn cache_stats(&self) -> CacheStats {
        self.predicates.stats()
    }
}

/// Long-lived engine shared by all requests
///
/// Holds only process-wide, read-only configuration.
#[derive(Debug, Clone)]
pub struct AccessEngine {
    resolver: Arc<ScopeResolver>,
    projector: Arc<ModelProjector>,
}

impl AccessEngine {
    /// Creates an engine over a role registry and a validated access map
    pub fn new(roles: RoleRegistry, access_map: AccessMap) -> Self {
        info!(
            "AccessEngine initialized with {} roles and {} access-map scopes",
            roles.len(),
            access_map.scope_count()
        );
        Self {
            resolver: Arc::new(ScopeResolver::new(roles)),
            projector: Arc::new(ModelProjector::with_access_map(Arc::new(access_map))),
        }
    }

    /// Scope resolver shared by all requests
    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    /// Model projector shared by all requests
    pub fn projector(&self) -> &ModelProjector {
        &self.projector
    }

    /// Resolves the principal's scopes and opens a request context
    pub fn begin_request(&self, ctx: &AuthorizationContext) -> Result<RequestContext> {
        let scopes = self.resolver.resolve(ctx)?;
        Ok(RequestContext::new(ctx.principal_name.clone(), scopes))
    }

    /// Projects one resource for the request
    pub fn project(
        &self,
        request: &RequestContext,
        resource: ResourceView<'_>,
        options: &ProjectionOptions,
    ) -> Model {
        self.projector.project(resource, request, options)
    }
}

impl Default for AccessEngine {
    fn default() -> Self {
        Self {
            resolver: Arc::new(ScopeResolver::default()),
            projector: Arc::new(ModelProjector::new()),
        }
    }
}

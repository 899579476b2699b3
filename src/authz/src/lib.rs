//! # Hubscope Access Engine
//!
//! Scope-based access control and field-level model projection for a
//! multi-user notebook hub.
//!
//! ## Features
//!
//! - **Scope grammar** `action:kind[:subresource][!filter=value]` with the `all` wildcard
//! - **Role resolution** into a merged, de-duplicated scope set
//! - **Implied scopes** expanded transitively from a static catalog
//! - **Per-request predicates** memoized once per scope name
//! - **Model projection** that only emits fields a granted scope unlocks
//! - **Input validation** for client-submitted user and group models
//!
//! ## Example
//!
//! ```rust
//! use hubscope_authz::{AccessEngine, AuthorizationContext, ProjectionOptions};
//! use hubscope_authz::types::{ResourceView, UserView};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = AccessEngine::default();
//!
//! let ctx = AuthorizationContext::new("alice").with_scope("read:users:name!user=bob");
//! let request = engine.begin_request(&ctx)?;
//!
//! let bob = UserView::new("bob", chrono::Utc::now()).with_admin(true);
//! let model = engine.project(&request, ResourceView::User(&bob), &ProjectionOptions::default());
//!
//! assert_eq!(model["name"], "bob");
//! assert!(!model.contains_key("admin"));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod projection;
pub mod roles;
pub mod scope;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use config::PolicyConfig;
pub use engine::{AccessEngine, AccessPredicate, AuthorizationContext, RequestContext};
pub use error::{
    AuthorizationError, AuthzError, ErrorEnvelope, InvalidModelError, MalformedScopeError, Result,
    ScopeResolutionError,
};
pub use projection::{AccessMap, Model, ModelProjector, ProjectionOptions};
pub use roles::{RoleDefinition, RoleRegistry};
pub use scope::{parse, ParsedScope, ScopeResolver, ScopeSet, ScopeToken};
pub use types::{ResourceKind, ResourceView};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

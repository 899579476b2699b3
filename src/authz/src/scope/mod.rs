//! Scope parsing and resolution
//!
//! This module turns raw permission strings into structured tokens and
//! expands a principal's roles into the scope set of a request.
//!
//! # Examples
//!
//! ```
//! use hubscope_authz::scope::{parse, ParsedScope, ScopeSet};
//!
//! let scope = parse("read:users:groups!group=staff").unwrap();
//! assert!(matches!(scope, ParsedScope::Token(ref t) if t.name() == "read:users:groups"));
//!
//! let set = ScopeSet::from_raw(["read:users", "all"]).unwrap();
//! assert!(set.is_all());
//! ```

pub mod catalog;
mod resolver;
mod set;
mod types;


pub use catalog::{ScopeDefinition, SCOPE_DEFINITIONS};
pub use resolver::ScopeResolver;
pub use set::{Grant, ScopeSet};
pub use types::{parse, ParsedScope, ScopeFilter, ScopeToken, ALL_SCOPE, GROUP_FILTER};

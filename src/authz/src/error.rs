//! Error types for the access engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::ResourceKind;

/// A raw scope string that does not follow `action:kind[:subresource][!filter=value]`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed scope '{scope}': {reason}")]
pub struct MalformedScopeError {
    /// The offending raw scope string
    pub scope: String,
    /// Why the string was rejected
    pub reason: String,
}

impl MalformedScopeError {
    pub(crate) fn new(scope: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            reason: reason.into(),
        }
    }
}

/// Failure to expand a principal's roles and token scopes into a scope set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScopeResolutionError {
    /// The principal is assigned a role nobody defined
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    /// A role (or token, when `role` is empty) grants a scope outside the catalog
    #[error("Role '{role}' references undefined scope '{scope}'")]
    UndefinedScope { role: String, scope: String },

    /// A role definition carries a scope string that does not parse
    #[error("Role '{role}' has a malformed scope: {source}")]
    MalformedScope {
        role: String,
        #[source]
        source: MalformedScopeError,
    },
}

/// The principal holds no scope that admits the resource
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Action requires scope '{scope}' on {resource_kind}")]
pub struct AuthorizationError {
    /// Scope that was required
    pub scope: String,
    /// Kind of resource the check was made against
    pub resource_kind: ResourceKind,
}

/// A client-submitted model that does not match its schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidModelError {
    /// Body is not valid JSON
    #[error("Invalid JSON in body of request")]
    InvalidJson,

    /// Top-level value is not a JSON object
    #[error("Invalid JSON data: {0}")]
    NotAnObject(String),

    /// Keys the schema does not declare
    #[error("Invalid JSON keys: {keys:?}")]
    InvalidKeys { keys: Vec<String> },

    /// A value whose JSON type disagrees with the schema
    #[error("{model}.{key} must be {expected}, not: {found}")]
    TypeMismatch {
        model: String,
        key: String,
        expected: String,
        found: String,
    },

    /// A non-string element inside a list-of-strings field
    #[error("{model}.{key}[{index}] must be string, not: {found}")]
    ElementType {
        model: String,
        key: String,
        index: usize,
        found: String,
    },
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum AuthzError {
    #[error(transparent)]
    MalformedScope(#[from] MalformedScopeError),

    #[error(transparent)]
    Resolution(#[from] ScopeResolutionError),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    InvalidModel(#[from] InvalidModelError),

    /// Invalid policy or access map configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AuthzError {
    /// HTTP status a caller should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedScope(_) | Self::InvalidModel(_) => 400,
            Self::Authorization(_) => 403,
            Self::Resolution(_) | Self::Config(_) | Self::Io(_) => 500,
        }
    }
}

/// JSON error body handed to the response layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub status: u16,
    pub message: String,
}

impl From<&AuthzError> for ErrorEnvelope {
    fn from(err: &AuthzError) -> Self {
        Self {
            status: err.status_code(),
            message: err.to_string(),
        }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, AuthzError>;

//! The effective scope set of one request
//!
//! Built once per request from parsed tokens and never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use super::types::{parse, ParsedScope, ScopeFilter, ScopeToken, ALL_SCOPE};
use crate::error::MalformedScopeError;

/// What a held scope name grants after merging every token carrying it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Grant {
    /// At least one token for the name had no filter
    Unrestricted,
    /// Union of the filters of every token for the name
    Filtered(Arc<ScopeFilter>),
}

/// Normalized, de-duplicated set of scope tokens
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSet {
    all: bool,
    tokens: BTreeSet<ScopeToken>,
    grants: BTreeMap<String, Grant>,
}

impl ScopeSet {
    /// Set holding nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Set holding the wildcard
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::default()
        }
    }

    /// Builds a set from parsed scopes; the wildcard absorbs everything else
    pub fn from_parsed<I>(scopes: I) -> Self
    where
        I: IntoIterator<Item = ParsedScope>,
    {
        let mut tokens = BTreeSet::new();
        for scope in scopes {
            match scope {
                ParsedScope::All => return Self::all(),
                ParsedScope::Token(token) => {
                    tokens.insert(token);
                }
            }
        }
        Self::from_tokens(tokens)
    }

    /// Parses raw strings without consulting roles or the catalog
    pub fn from_raw<I, S>(raw: I) -> Result<Self, MalformedScopeError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = raw
            .into_iter()
            .map(|s| parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_parsed(parsed))
    }

    fn from_tokens(tokens: BTreeSet<ScopeToken>) -> Self {
        let mut grants: BTreeMap<String, Grant> = BTreeMap::new();

        for token in &tokens {
            let name = token.name();
            let merged = match (grants.remove(&name), &token.filter) {
                (Some(Grant::Unrestricted), _) | (_, None) => Grant::Unrestricted,
                (None, Some(filter)) => Grant::Filtered(Arc::new(filter.clone())),
                (Some(Grant::Filtered(existing)), Some(filter)) => {
                    let mut combined = (*existing).clone();
                    combined.merge(filter);
                    Grant::Filtered(Arc::new(combined))
                }
            };
            grants.insert(name, merged);
        }

        Self {
            all: false,
            tokens,
            grants,
        }
    }

    /// Whether the wildcard is held
    pub fn is_all(&self) -> bool {
        self.all
    }

    /// Whether no scope is held at all
    pub fn is_empty(&self) -> bool {
        !self.all && self.tokens.is_empty()
    }

    /// Number of distinct tokens (the wildcard counts as one)
    pub fn len(&self) -> usize {
        if self.all {
            1
        } else {
            self.tokens.len()
        }
    }

    /// Whether the scope name is held, directly or through the wildcard
    pub fn contains(&self, scope_name: &str) -> bool {
        self.all || self.grants.contains_key(scope_name)
    }

    /// Merged grant for a scope name; `None` under the wildcard or when absent
    pub fn grant(&self, scope_name: &str) -> Option<&Grant> {
        self.grants.get(scope_name)
    }

    /// Distinct tokens, filters included
    pub fn tokens(&self) -> impl Iterator<Item = &ScopeToken> {
        self.tokens.iter()
    }

    /// Held scope names, sorted
    pub fn scope_names(&self) -> impl Iterator<Item = &str> {
        self.grants.keys().map(String::as_str)
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.all {
            return f.write_str(ALL_SCOPE);
        }
        let rendered: Vec<String> = self.tokens.iter().map(ToString::to_string).collect();
        f.write_str(&rendered.join(", "))
    }
}

//! Scope token definitions and parsing
//!
//! A scope is a colon-separated permission string with an optional filter:
//! - `read:users` (every user, every readable field)
//! - `read:users:groups` (a sub-resource of every user)
//! - `read:users!group=staff` (users in the `staff` group)
//! - `all` (unconditional access)

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::MalformedScopeError;
use crate::types::{Action, ResourceKind, ResourceView};

/// Raw string of the wildcard scope
pub const ALL_SCOPE: &str = "all";

/// Filter key that selects users through their group memberships
pub const GROUP_FILTER: &str = "group";

static SCOPE_GRAMMAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<action>[a-z_]+):(?P<kind>[a-z_]+)(?::(?P<sub>[a-z_]+))?(?:!(?P<filter>[a-z_]+)=(?P<value>[^!=\s]+))?$",
    )
    .expect("scope grammar is a valid regex")
});

/// Restricts a scope to named resources
///
/// `targets` holds names of the scope's own resource kind. `groups` holds
/// group names and only ever admits users.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeFilter {
    pub targets: BTreeSet<String>,
    pub groups: BTreeSet<String>,
}

impl ScopeFilter {
    /// Filter admitting the named resources
    pub fn targets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: names.into_iter().map(Into::into).collect(),
            groups: BTreeSet::new(),
        }
    }

    /// Filter admitting members of the named groups
    pub fn groups<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: BTreeSet::new(),
            groups: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Unions another filter into this one
    pub fn merge(&mut self, other: &ScopeFilter) {
        self.targets.extend(other.targets.iter().cloned());
        self.groups.extend(other.groups.iter().cloned());
    }

    /// Direct name match, then group indirection for users
    pub fn admits(&self, resource: ResourceView<'_>) -> bool {
        if self.targets.contains(resource.name()) {
            return true;
        }

        resource.kind() == ResourceKind::Users
            && !self.groups.is_empty()
            && resource
                .group_names()
                .iter()
                .any(|group| self.groups.contains(group))
    }
}

/// Parsed, structured form of a scope string
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeToken {
    pub action: Action,
    pub kind: ResourceKind,
    pub subresource: Option<String>,
    /// `None` means every resource of the kind
    pub filter: Option<ScopeFilter>,
}

impl ScopeToken {
    /// Unfiltered token
    pub fn new(action: Action, kind: ResourceKind, subresource: Option<&str>) -> Self {
        Self {
            action,
            kind,
            subresource: subresource.map(str::to_string),
            filter: None,
        }
    }

    /// Restricts the token to a filter
    pub fn with_filter(mut self, filter: ScopeFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Fully-qualified scope name, without the filter (`read:users:groups`)
    pub fn name(&self) -> String {
        match &self.subresource {
            Some(sub) => format!("{}:{}:{}", self.action, self.kind, sub),
            None => format!("{}:{}", self.action, self.kind),
        }
    }

    /// Whether the token is restricted to named resources
    pub fn is_filtered(&self) -> bool {
        self.filter.is_some()
    }
}

impl fmt::Display for ScopeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        if let Some(filter) = &self.filter {
            for target in &filter.targets {
                write!(f, "!{}={}", self.kind.singular(), target)?;
            }
            for group in &filter.groups {
                write!(f, "!{}={}", GROUP_FILTER, group)?;
            }
        }
        Ok(())
    }
}

/// Result of parsing one raw scope string
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParsedScope {
    /// The `all` wildcard
    All,
    Token(ScopeToken),
}

impl FromStr for ParsedScope {
    type Err = MalformedScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// Parses `action:kind[:subresource][!filterKind=filterValue]` or `all`
pub fn parse(raw: &str) -> Result<ParsedScope, MalformedScopeError> {
    if raw.is_empty() {
        return Err(MalformedScopeError::new(raw, "scope cannot be empty"));
    }
    if raw == ALL_SCOPE {
        return Ok(ParsedScope::All);
    }

    let caps = SCOPE_GRAMMAR.captures(raw).ok_or_else(|| {
        MalformedScopeError::new(raw, "expected action:kind[:subresource][!filter=value]")
    })?;

    let action: Action = caps["action"]
        .parse()
        .map_err(|reason: String| MalformedScopeError::new(raw, reason))?;
    let kind: ResourceKind = caps["kind"]
        .parse()
        .map_err(|reason: String| MalformedScopeError::new(raw, reason))?;

    let mut token = ScopeToken::new(action, kind, caps.name("sub").map(|m| m.as_str()));

    if let (Some(filter_kind), Some(value)) = (caps.name("filter"), caps.name("value")) {
        let filter = build_filter(kind, filter_kind.as_str(), value.as_str())
            .ok_or_else(|| {
                MalformedScopeError::new(
                    raw,
                    format!("filter '{}' does not apply to {}", filter_kind.as_str(), kind),
                )
            })?;
        token = token.with_filter(filter);
    }

    Ok(ParsedScope::Token(token))
}

fn build_filter(kind: ResourceKind, filter_kind: &str, value: &str) -> Option<ScopeFilter> {
    if filter_kind == kind.singular() {
        Some(ScopeFilter::targets([value]))
    } else if filter_kind == GROUP_FILTER && kind == ResourceKind::Users {
        Some(ScopeFilter::groups([value]))
    } else {
        None
    }
}

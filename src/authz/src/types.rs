//! Core access-control types
//!
//! Resource views are read-only snapshots supplied by the persistence layer.
//! The engine never owns the records behind them and never mutates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of resource a scope applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Users,
    Groups,
    Services,
    Tokens,
}

impl ResourceKind {
    /// All kinds, in access-map order
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Users,
        ResourceKind::Groups,
        ResourceKind::Services,
        ResourceKind::Tokens,
    ];

    /// Plural form used in scope strings (`read:users`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Users => "users",
            Self::Groups => "groups",
            Self::Services => "services",
            Self::Tokens => "tokens",
        }
    }

    /// Singular form used as a filter key (`!user=alice`)
    pub fn singular(&self) -> &'static str {
        match self {
            Self::Users => "user",
            Self::Groups => "group",
            Self::Services => "service",
            Self::Tokens => "token",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(Self::Users),
            "groups" => Ok(Self::Groups),
            "services" => Ok(Self::Services),
            "tokens" => Ok(Self::Tokens),
            other => Err(format!("unknown resource kind '{}'", other)),
        }
    }
}

/// Verb part of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Write,
    Admin,
    Delete,
    Access,
}

impl Action {
    /// Scope action segment
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Write => "write",
            Self::Admin => "admin",
            Self::Delete => "delete",
            Self::Access => "access",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "write" => Ok(Self::Write),
            "admin" => Ok(Self::Admin),
            "delete" => Ok(Self::Delete),
            "access" => Ok(Self::Access),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// A single server (child resource) belonging to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerView {
    /// Server name, empty for the default server
    pub name: String,

    #[serde(default)]
    pub started: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,

    /// Pending transition (e.g. "spawn", "stop"), if any
    #[serde(default)]
    pub pending: Option<String>,

    #[serde(default)]
    pub ready: bool,

    /// Opaque spawner state
    #[serde(default)]
    pub state: Option<serde_json::Value>,

    #[serde(default)]
    pub user_options: serde_json::Map<String, serde_json::Value>,

    #[serde(default)]
    pub progress_url: String,
}

impl ServerView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            started: None,
            last_activity: None,
            pending: None,
            ready: false,
            state: None,
            user_options: serde_json::Map::new(),
            progress_url: String::new(),
        }
    }

    /// Marks the server as running and ready
    pub fn ready(mut self) -> Self {
        self.ready = true;
        self
    }

    /// Sets a pending transition such as `spawn` or `stop`
    pub fn with_pending(mut self, pending: impl Into<String>) -> Self {
        self.pending = Some(pending.into());
        self
    }

    pub fn with_started(mut self, started: DateTime<Utc>) -> Self {
        self.started = Some(started);
        self
    }

    /// Sets the spawner state
    pub fn with_state(mut self, state: serde_json::Value) -> Self {
        self.state = Some(state);
        self
    }

    /// Sets the spawn progress URL
    pub fn with_progress_url(mut self, url: impl Into<String>) -> Self {
        self.progress_url = url.into();
        self
    }

    /// Ready or transitioning
    pub fn is_active(&self) -> bool {
        self.ready || self.pending.is_some()
    }
}

/// Read-only view of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub name: String,

    #[serde(default)]
    pub admin: bool,

    #[serde(default)]
    pub roles: Vec<String>,

    /// Names of the groups the user belongs to
    #[serde(default)]
    pub groups: Vec<String>,

    /// Base URL of the user's servers (e.g. "/user/alice/")
    #[serde(default)]
    pub url: String,

    pub created: DateTime<Utc>,

    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,

    #[serde(default)]
    pub auth_state: Option<serde_json::Value>,

    /// Servers keyed by name; the default server has the empty name
    #[serde(default)]
    pub servers: BTreeMap<String, ServerView>,
}

impl UserView {
    /// Creates a user with no servers; `url` is `/user/<name>/`
    pub fn new(name: impl Into<String>, created: DateTime<Utc>) -> Self {
        let name = name.into();
        let url = format!("/user/{}/", name);
        Self {
            name,
            admin: false,
            roles: Vec::new(),
            groups: Vec::new(),
            url,
            created,
            last_activity: None,
            auth_state: None,
            servers: BTreeMap::new(),
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    /// Adds a group membership
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Sets the time of last activity
    pub fn with_last_activity(mut self, at: DateTime<Utc>) -> Self {
        self.last_activity = Some(at);
        self
    }

    pub fn with_auth_state(mut self, state: serde_json::Value) -> Self {
        self.auth_state = Some(state);
        self
    }

    /// Adds a server, keyed by its name
    pub fn with_server(mut self, server: ServerView) -> Self {
        self.servers.insert(server.name.clone(), server);
        self
    }

    /// The default (unnamed) server, if the user has one
    pub fn default_server(&self) -> Option<&ServerView> {
        self.servers.get("")
    }

    /// Whether the default server is up
    pub fn running(&self) -> bool {
        self.default_server().map_or(false, |s| s.ready)
    }
}

/// Read-only view of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub name: String,

    /// Member user names
    #[serde(default)]
    pub users: Vec<String>,
}

impl GroupView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            users: Vec::new(),
        }
    }

    /// Adds a member
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.users.push(user.into());
        self
    }
}

/// Read-only view of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceView {
    pub name: String,

    #[serde(default)]
    pub admin: bool,

    #[serde(default)]
    pub roles: Vec<String>,
}

impl ServiceView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            admin: false,
            roles: Vec::new(),
        }
    }

    pub fn with_admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

/// Who a token was issued to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "lowercase")]
pub enum TokenOwner {
    User(String),
    Service(String),
}

/// Token flavour and the fields specific to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenKind {
    /// Token issued through the REST API; carries roles
    ApiToken {
        #[serde(default)]
        note: Option<String>,
        #[serde(default)]
        roles: Vec<String>,
    },
    /// Token issued through OAuth; never carries roles
    Oauth {
        client_id: String,
        #[serde(default)]
        client_description: Option<String>,
    },
}

/// Read-only view of an issued token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenView {
    /// Public token id (never the secret)
    pub id: String,
    pub kind: TokenKind,
    pub owner: TokenOwner,
    pub created: DateTime<Utc>,

    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Borrowed view over any resource the engine can project
#[derive(Debug, Clone, Copy)]
pub enum ResourceView<'a> {
    User(&'a UserView),
    Group(&'a GroupView),
    Service(&'a ServiceView),
    Token(&'a TokenView),
}

impl<'a> ResourceView<'a> {
    /// Resource kind of the view
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::User(_) => ResourceKind::Users,
            Self::Group(_) => ResourceKind::Groups,
            Self::Service(_) => ResourceKind::Services,
            Self::Token(_) => ResourceKind::Tokens,
        }
    }

    /// Name matched against a scope filter's target names
    pub fn name(&self) -> &'a str {
        match *self {
            Self::User(u) => &u.name,
            Self::Group(g) => &g.name,
            Self::Service(s) => &s.name,
            Self::Token(t) => &t.id,
        }
    }

    /// Group memberships; only users have any
    pub fn group_names(&self) -> &'a [String] {
        match *self {
            Self::User(u) => &u.groups,
            _ => &[],
        }
    }
}

impl<'a> From<&'a UserView> for ResourceView<'a> {
    fn from(user: &'a UserView) -> Self {
        Self::User(user)
    }
}

impl<'a> From<&'a GroupView> for ResourceView<'a> {
    fn from(group: &'a GroupView) -> Self {
        Self::Group(group)
    }
}

impl<'a> From<&'a ServiceView> for ResourceView<'a> {
    fn from(service: &'a ServiceView) -> Self {
        Self::Service(service)
    }
}

impl<'a> From<&'a TokenView> for ResourceView<'a> {
    fn from(token: &'a TokenView) -> Self {
        Self::Token(token)
    }
}

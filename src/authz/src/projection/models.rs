//! Candidate models: every field a resource could expose before filtering

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Value};

use super::Model;
use crate::types::{
    GroupView, ResourceKind, ServerView, ServiceView, TokenKind, TokenOwner, TokenView, UserView,
};

const USER_FIELDS: &[&str] = &[
    "kind",
    "name",
    "admin",
    "roles",
    "groups",
    "server",
    "pending",
    "created",
    "last_activity",
    "auth_state",
    // gates, never in the candidate model
    "servers",
    "server_state",
];

const GROUP_FIELDS: &[&str] = &["kind", "name", "users"];

const SERVICE_FIELDS: &[&str] = &["kind", "name", "roles", "admin"];

const TOKEN_FIELDS: &[&str] = &[
    "kind",
    "id",
    "user",
    "service",
    "roles",
    "created",
    "last_activity",
    "expires_at",
    "note",
    "oauth_client",
];

/// Field names known to the schema of a resource kind
pub fn model_fields(kind: ResourceKind) -> &'static [&'static str] {
    match kind {
        ResourceKind::Users => USER_FIELDS,
        ResourceKind::Groups => GROUP_FIELDS,
        ResourceKind::Services => SERVICE_FIELDS,
        ResourceKind::Tokens => TOKEN_FIELDS,
    }
}

/// RFC 3339 in UTC with a `Z` suffix, or null
pub fn isoformat(at: Option<DateTime<Utc>>) -> Value {
    match at {
        Some(at) => Value::String(at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        None => Value::Null,
    }
}

fn server_url(user_url: &str, server_name: &str) -> String {
    let base = user_url.trim_end_matches('/');
    if server_name.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}/", base, server_name)
    }
}

fn into_model(value: Value) -> Model {
    match value {
        Value::Object(map) => map,
        _ => Model::new(),
    }
}

pub(crate) fn user_candidate(user: &UserView) -> Model {
    let server = if user.running() {
        Value::String(user.url.clone())
    } else {
        Value::Null
    };

    into_model(json!({
        "kind": "user",
        "name": user.name,
        "admin": user.admin,
        "roles": user.roles,
        "groups": user.groups,
        "server": server,
        "pending": Value::Null,
        "created": isoformat(Some(user.created)),
        "last_activity": isoformat(user.last_activity),
        "auth_state": user.auth_state.clone().unwrap_or(Value::Null),
    }))
}

/// Model of one server of a user
///
/// `state` is only filled when `include_state` is set.
pub fn server_model(user: &UserView, server: &ServerView, include_state: bool) -> Model {
    let state = if include_state {
        server.state.clone().unwrap_or(Value::Null)
    } else {
        Value::Null
    };

    into_model(json!({
        "name": server.name,
        "last_activity": isoformat(server.last_activity),
        "started": isoformat(server.started),
        "pending": server.pending,
        "ready": server.ready,
        "state": state,
        "url": server_url(&user.url, &server.name),
        "user_options": server.user_options,
        "progress_url": server.progress_url,
    }))
}

pub(crate) fn group_candidate(group: &GroupView) -> Model {
    into_model(json!({
        "kind": "group",
        "name": group.name,
        "users": group.users,
    }))
}

pub(crate) fn service_candidate(service: &ServiceView) -> Model {
    into_model(json!({
        "kind": "service",
        "name": service.name,
        "roles": service.roles,
        "admin": service.admin,
    }))
}

pub(crate) fn token_candidate(token: &TokenView) -> Model {
    let mut model = Model::new();

    let (owner_key, owner) = match &token.owner {
        TokenOwner::User(name) => ("user", name),
        TokenOwner::Service(name) => ("service", name),
    };
    model.insert(owner_key.to_string(), json!(owner));
    model.insert("id".to_string(), json!(token.id));

    match &token.kind {
        TokenKind::ApiToken { note, roles } => {
            model.insert("kind".to_string(), json!("api_token"));
            model.insert("roles".to_string(), json!(roles));
            model.insert("note".to_string(), json!(note));
        }
        TokenKind::Oauth {
            client_id,
            client_description,
        } => {
            let client = client_description
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or(client_id.as_str());
            model.insert("kind".to_string(), json!("oauth"));
            // oauth tokens do not bear roles
            model.insert("roles".to_string(), json!([]));
            model.insert("oauth_client".to_string(), json!(client));
        }
    }

    model.insert("created".to_string(), isoformat(Some(token.created)));
    model.insert("last_activity".to_string(), isoformat(token.last_activity));
    model.insert("expires_at".to_string(), isoformat(token.expires_at));
    model
}

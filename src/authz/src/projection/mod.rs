//! Field-level model projection
//!
//! For every resource the projector builds the full candidate model, then
//! keeps only the fields unlocked by granted scopes whose predicate admits
//! that resource. A resource no scope reaches projects to an empty model;
//! the caller decides whether that means 403, 404 or "omit from list".

pub mod access_map;
pub mod models;

pub use access_map::{AccessMap, FieldTable};
pub use models::{isoformat, model_fields, server_model};

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::engine::RequestContext;
use crate::types::{GroupView, ResourceView, ServiceView, TokenView, UserView};

/// JSON object handed to the response serializer
pub type Model = serde_json::Map<String, serde_json::Value>;

/// Extra gates a caller must request explicitly
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProjectionOptions {
    /// Emit `servers` (needs `read:users:servers`)
    pub include_servers: bool,
    /// Emit each server's `state` (needs `read:users:server_state`)
    pub include_server_state: bool,
    /// Emit `auth_state` (needs `read:users:auth_state`)
    pub include_auth_state: bool,
}

impl ProjectionOptions {
    /// Requests the `servers` field
    pub fn with_servers(mut self) -> Self {
        self.include_servers = true;
        self
    }

    /// Requests per-server `state`
    pub fn with_server_state(mut self) -> Self {
        self.include_server_state = true;
        self
    }

    /// Requests the `auth_state` field
    pub fn with_auth_state(mut self) -> Self {
        self.include_auth_state = true;
        self
    }
}

/// Projects resources through an access map
#[derive(Debug, Clone)]
pub struct ModelProjector {
    access_map: Arc<AccessMap>,
}

impl ModelProjector {
    /// Projector over the built-in access map
    pub fn new() -> Self {
        Self::with_access_map(AccessMap::builtin())
    }

    /// Projector over a custom access map
    pub fn with_access_map(access_map: Arc<AccessMap>) -> Self {
        Self { access_map }
    }

    /// Access map this projector filters with
    pub fn access_map(&self) -> &AccessMap {
        &self.access_map
    }

    /// Projects any resource
    pub fn project(
        &self,
        resource: ResourceView<'_>,
        request: &RequestContext,
        options: &ProjectionOptions,
    ) -> Model {
        match resource {
            ResourceView::User(user) => self.user_model(user, request, options),
            ResourceView::Group(group) => self.group_model(group, request),
            ResourceView::Service(service) => self.service_model(service, request),
            ResourceView::Token(token) => self.token_model(token, request),
        }
    }

    /// Projects a list, dropping resources the request cannot see
    pub fn project_all<'a, I>(
        &self,
        resources: I,
        request: &RequestContext,
        options: &ProjectionOptions,
    ) -> Vec<Model>
    where
        I: IntoIterator<Item = ResourceView<'a>>,
    {
        resources
            .into_iter()
            .map(|resource| self.project(resource, request, options))
            .filter(|model| !model.is_empty())
            .collect()
    }

    /// Union of fields unlocked for this resource by held, admitting scopes
    pub fn allowed_keys(&self, resource: ResourceView<'_>, request: &RequestContext) -> BTreeSet<String> {
        let mut allowed = BTreeSet::new();
        for (scope_name, fields) in self.access_map.table(resource.kind()) {
            if request.can_access(scope_name, resource) {
                allowed.extend(fields.iter().cloned());
            }
        }
        allowed
    }

    /// Projects a user, filling `pending` and `servers` when allowed
    pub fn user_model(
        &self,
        user: &UserView,
        request: &RequestContext,
        options: &ProjectionOptions,
    ) -> Model {
        debug!(
            "Asking for user model of {} with scopes [{}]",
            user.name,
            request.scopes()
        );

        let resource = ResourceView::User(user);
        let allowed = self.allowed_keys(resource, request);
        let mut model = retain_allowed(models::user_candidate(user), &allowed);

        if !options.include_auth_state {
            model.remove("auth_state");
        }
        if model.is_empty() {
            return model;
        }

        let include_server_state = options.include_server_state && allowed.contains("server_state");

        if allowed.contains("pending") {
            if let Some(server) = user.default_server() {
                model.insert("pending".to_string(), serde_json::json!(server.pending));
            }
        }

        if options.include_servers && allowed.contains("servers") {
            // active covers pending transitions, not just ready servers
            let servers: Model = user
                .servers
                .iter()
                .filter(|(_, server)| server.is_active())
                .map(|(name, server)| {
                    (
                        name.clone(),
                        serde_json::Value::Object(server_model(user, server, include_server_state)),
                    )
                })
                .collect();
            model.insert("servers".to_string(), serde_json::Value::Object(servers));
        }

        model
    }

    /// Projects a group
    pub fn group_model(&self, group: &GroupView, request: &RequestContext) -> Model {
        let allowed = self.allowed_keys(ResourceView::Group(group), request);
        retain_allowed(models::group_candidate(group), &allowed)
    }

    /// Projects a service
    pub fn service_model(&self, service: &ServiceView, request: &RequestContext) -> Model {
        let allowed = self.allowed_keys(ResourceView::Service(service), request);
        retain_allowed(models::service_candidate(service), &allowed)
    }

    /// Projects a token; filters match the token id
    pub fn token_model(&self, token: &TokenView, request: &RequestContext) -> Model {
        let allowed = self.allowed_keys(ResourceView::Token(token), request);
        retain_allowed(models::token_candidate(token), &allowed)
    }
}

impl Default for ModelProjector {
    fn default() -> Self {
        Self::new()
    }
}

fn retain_allowed(candidate: Model, allowed: &BTreeSet<String>) -> Model {
    candidate
        .into_iter()
        .filter(|(key, _)| allowed.contains(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeSet;
    use crate::types::{ServerView, TokenKind, TokenOwner};
    use chrono::Utc;
    use serde_json::json;

    fn request(scopes: &[&str]) -> RequestContext {
        RequestContext::new("tester", ScopeSet::from_raw(scopes.iter().copied()).unwrap())
    }

    fn keys(model: &Model) -> Vec<&str> {
        model.keys().map(String::as_str).collect()
    }

    fn bob() -> UserView {
        UserView::new("bob", Utc::now())
            .with_admin(true)
            .with_group("staff")
            .with_auth_state(json!({"access_token": "secret"}))
            .with_server(ServerView::new("").with_pending("spawn"))
            .with_server(ServerView::new("lab").ready().with_state(json!({"pid": 7})))
            .with_server(ServerView::new("stopped"))
    }

    #[test]
    fn test_name_only_scope() {
        let model = ModelProjector::new().user_model(&bob(), &request(&["read:users:name"]), &ProjectionOptions::default());
        assert_eq!(model, json!({"kind": "user", "name": "bob"}).as_object().unwrap().clone());
    }

    #[test]
    fn test_full_read_scope() {
        let model = ModelProjector::new().user_model(&bob(), &request(&["read:users"]), &ProjectionOptions::default());
        let mut expected = vec![
            "admin",
            "created",
            "groups",
            "kind",
            "last_activity",
            "name",
            "pending",
            "roles",
            "server",
        ];
        expected.sort();
        assert_eq!(keys(&model), expected);
        assert_eq!(model["pending"], json!("spawn"));
    }

    #[test]
    fn test_auth_state_needs_scope_and_option() {
        let projector = ModelProjector::new();
        let opts = ProjectionOptions::default().with_auth_state();

        let model = projector.user_model(&bob(), &request(&["read:users:auth_state"]), &ProjectionOptions::default());
        assert!(!model.contains_key("auth_state"));

        let model = projector.user_model(&bob(), &request(&["read:users:auth_state"]), &opts);
        assert_eq!(model["auth_state"], json!({"access_token": "secret"}));

        let model = projector.user_model(&bob(), &request(&["read:users"]), &opts);
        assert!(!model.contains_key("auth_state"));
    }

    #[test]
    fn test_servers_only_active() {
        let opts = ProjectionOptions::default().with_servers();
        let model = ModelProjector::new().user_model(&bob(), &request(&["read:users:servers"]), &opts);

        let servers = model["servers"].as_object().unwrap();
        assert!(servers.contains_key(""));
        assert!(servers.contains_key("lab"));
        assert!(!servers.contains_key("stopped"));
        assert_eq!(servers["lab"]["state"], serde_json::Value::Null);
    }

    #[test]
    fn test_server_state_gate() {
        let opts = ProjectionOptions::default().with_servers().with_server_state();

        let model = ModelProjector::new().user_model(
            &bob(),
            &request(&["read:users:servers", "read:users:server_state"]),
            &opts,
        );
        assert_eq!(model["servers"]["lab"]["state"], json!({"pid": 7}));
        assert!(!model.contains_key("server_state"));

        // option without the scope keeps state hidden
        let model = ModelProjector::new().user_model(&bob(), &request(&["read:users:servers"]), &opts);
        assert_eq!(model["servers"]["lab"]["state"], serde_json::Value::Null);
    }

    #[test]
    fn test_servers_not_emitted_without_option() {
        let model = ModelProjector::new().user_model(&bob(), &request(&["read:users:servers"]), &ProjectionOptions::default());
        assert_eq!(keys(&model), vec!["kind", "name"]);
    }

    #[test]
    fn test_no_scope_is_empty() {
        let model = ModelProjector::new().user_model(&bob(), &request(&[]), &ProjectionOptions::default().with_servers());
        assert!(model.is_empty());
    }

    #[test]
    fn test_group_model() {
        let group = GroupView::new("staff").with_user("bob");
        let projector = ModelProjector::new();

        let model = projector.group_model(&group, &request(&["read:groups"]));
        assert_eq!(model["users"], json!(["bob"]));

        let model = projector.group_model(&group, &request(&["read:groups!group=other"]));
        assert!(model.is_empty());

        let model = projector.group_model(&group, &request(&["read:groups:name"]));
        assert_eq!(keys(&model), vec!["kind", "name"]);
    }

    #[test]
    fn test_service_model() {
        let service = ServiceView::new("cull").with_admin(true).with_role("culler");
        let model = ModelProjector::new().service_model(&service, &request(&["read:services"]));
        assert_eq!(model["admin"], json!(true));
        assert_eq!(model["roles"], json!(["culler"]));
    }

    #[test]
    fn test_token_model_filtered_by_id() {
        let token = TokenView {
            id: "a7".to_string(),
            kind: TokenKind::ApiToken { note: None, roles: vec![] },
            owner: TokenOwner::User("bob".to_string()),
            created: Utc::now(),
            last_activity: None,
            expires_at: None,
        };
        let projector = ModelProjector::new();

        assert!(!projector.token_model(&token, &request(&["read:tokens!token=a7"])).is_empty());
        assert!(projector.token_model(&token, &request(&["read:tokens!token=b1"])).is_empty());
    }

    #[test]
    fn test_project_all_omits_hidden() {
        let users = vec![
            UserView::new("alice", Utc::now()),
            UserView::new("bob", Utc::now()),
            UserView::new("carol", Utc::now()).with_group("staff"),
        ];
        let req = request(&["read:users:name!user=alice", "read:users:name!group=staff"]);

        let models = ModelProjector::new().project_all(
            users.iter().map(ResourceView::User),
            &req,
            &ProjectionOptions::default(),
        );
        let names: Vec<_> = models.iter().map(|m| m["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["alice", "carol"]);
    }
}

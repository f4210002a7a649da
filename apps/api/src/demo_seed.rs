use std::sync::Arc;

use async_trait::async_trait;
use restward_application::{
    BeforeDecision, PolicyRegistry, ResourceCatalog, ResourcePolicy, ResourceService,
};
use restward_core::{AppResult, Caller};
use restward_domain::{
    AbilityName, CollectionQuery, QueryFacet, Resource, ResourceAction, ResourceSchema,
    VisibilityFacet,
};
use restward_infrastructure::{InMemoryResourceRepository, RelationLink};
use serde_json::{Value, json};
use tracing::info;

use crate::state::AppState;

const USER_TYPE: &str = "user";
const USER_LOG_TYPE: &str = "user_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UserRule {
    Authenticated,
    SelfOnly,
    AdminOnly,
}

/// Policy for the demo `user` resource.
///
/// Admins pass every defined ability through `before`. Everyone else sees and updates
/// only their own row and cannot sort or filter by email.
#[derive(Debug, Default)]
pub struct UserPolicy;

impl UserPolicy {
    fn rule(ability: &AbilityName) -> Option<UserRule> {
        let rules = [
            (AbilityName::for_action(ResourceAction::ViewAll), UserRule::Authenticated),
            (AbilityName::for_action(ResourceAction::View), UserRule::SelfOnly),
            (AbilityName::for_action(ResourceAction::Create), UserRule::Authenticated),
            (AbilityName::for_action(ResourceAction::Update), UserRule::SelfOnly),
            (
                AbilityName::for_visibility(VisibilityFacet::Edit, "id_status"),
                UserRule::AdminOnly,
            ),
            (
                AbilityName::for_query(QueryFacet::Sort, "email"),
                UserRule::AdminOnly,
            ),
            (
                AbilityName::for_query(QueryFacet::Filter, "email"),
                UserRule::AdminOnly,
            ),
            (
                AbilityName::for_query(QueryFacet::Include, "logs"),
                UserRule::Authenticated,
            ),
        ];

        rules
            .into_iter()
            .find_map(|(name, rule)| (&name == ability).then_some(rule))
    }
}

#[async_trait]
impl ResourcePolicy for UserPolicy {
    async fn before(
        &self,
        caller: Option<&Caller>,
        _ability: &AbilityName,
    ) -> AppResult<BeforeDecision> {
        Ok(if caller.is_some_and(Caller::is_admin) {
            BeforeDecision::Allow
        } else {
            BeforeDecision::Abstain
        })
    }

    fn defines(&self, ability: &AbilityName) -> bool {
        Self::rule(ability).is_some()
    }

    async fn check(
        &self,
        caller: Option<&Caller>,
        ability: &AbilityName,
        resource: Option<&dyn Resource>,
    ) -> AppResult<bool> {
        let Some(caller) = caller else {
            return Ok(false);
        };

        Ok(match Self::rule(ability) {
            Some(UserRule::Authenticated) => true,
            Some(UserRule::SelfOnly) => resource
                .and_then(|resource| resource.key())
                .and_then(Value::as_str)
                == Some(caller.subject()),
            Some(UserRule::AdminOnly) | None => false,
        })
    }

    async fn qualify_collection(
        &self,
        caller: Option<&Caller>,
        query: CollectionQuery,
    ) -> AppResult<CollectionQuery> {
        Ok(match caller {
            Some(caller) if caller.is_admin() => query,
            Some(caller) => query.where_equals("uuid", json!(caller.subject())),
            None => query.where_equals("uuid", Value::Null),
        })
    }
}

fn user_schema() -> AppResult<ResourceSchema> {
    ResourceSchema::builder(USER_TYPE)
        .primary_key("uuid")
        .hidden(["password", "remember_token"])
        .fillable(["username", "email", "comment", "id_status", "password"])
        .immutable(["username"])
        .query(QueryFacet::Sort, ["username", "email", "created_at"])
        .query(QueryFacet::Filter, ["username", "email", "id_status"])
        .query(QueryFacet::Field, ["username", "email", "comment", "id_status"])
        .query(QueryFacet::Include, ["logs"])
        .query(QueryFacet::Append, ["display_label"])
        .build()
}

fn user_log_schema() -> AppResult<ResourceSchema> {
    ResourceSchema::builder(USER_LOG_TYPE)
        .fillable(["user_uuid", "message"])
        .query(QueryFacet::Sort, ["created_at"])
        .query(QueryFacet::Filter, ["user_uuid", "message"])
        .build()
}

/// Builds the application state, seeding demo rows when requested.
pub async fn build_state(seed_demo: bool) -> AppResult<AppState> {
    let user_schema = user_schema()?;
    let user_log_schema = user_log_schema()?;

    let repository = InMemoryResourceRepository::new()
        .with_relation(
            USER_TYPE,
            "logs",
            RelationLink {
                target_type: USER_LOG_TYPE.to_owned(),
                foreign_key: "user_uuid".to_owned(),
                local_key: "uuid".to_owned(),
            },
        )
        .with_appender(USER_TYPE, "display_label", |row| {
            let username = row.get("username").and_then(Value::as_str).unwrap_or_default();
            match row.get("email").and_then(Value::as_str) {
                Some(email) => json!(format!("{username} <{email}>")),
                None => json!(username),
            }
        });

    if seed_demo {
        let users = repository
            .seed(
                &user_schema,
                vec![
                    json!({"uuid": "u-root", "username": "root", "email": "root@example.org", "id_status": 1, "comment": "", "password": "demo-hash-root"}),
                    json!({"uuid": "u-alice", "username": "alice", "email": "alice@example.org", "id_status": 1, "comment": "", "password": "demo-hash-alice"}),
                    json!({"uuid": "u-bob", "username": "bob", "email": "bob@example.org", "id_status": 0, "comment": "", "password": "demo-hash-bob"}),
                ],
            )
            .await?;
        let logs = repository
            .seed(
                &user_log_schema,
                vec![
                    json!({"id": "l-1", "user_uuid": "u-alice", "message": "signed in", "created_at": "2026-01-05T09:00:00Z"}),
                    json!({"id": "l-2", "user_uuid": "u-bob", "message": "signed in", "created_at": "2026-01-05T09:30:00Z"}),
                ],
            )
            .await?;
        info!(users, logs, "seeded demo resources");
    }

    let catalog = ResourceCatalog::default()
        .with_schema(user_schema)
        .with_schema(user_log_schema);
    let policies = PolicyRegistry::builder()
        .bind(USER_TYPE, Arc::new(UserPolicy))
        .build();

    Ok(AppState {
        resource_service: ResourceService::new(
            Arc::new(repository),
            Arc::new(catalog),
            Arc::new(policies),
        ),
    })
}

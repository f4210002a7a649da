use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use proptest::prelude::*;
use restward_core::Caller;
use restward_domain::{QueryFacet, ResourceRecord, ResourceSchema};
use serde_json::json;

use super::AuthorizedResource;
use crate::{BeforeDecision, Gate, PolicyRegistry, RulePolicy};

fn user_schema() -> Arc<ResourceSchema> {
    Arc::new(
        ResourceSchema::builder("user")
            .primary_key("uuid")
            .hidden(["password", "token"])
            .fillable(["username", "comment", "id_status"])
            .query(QueryFacet::Sort, ["username", "email"])
            .query(QueryFacet::Filter, ["username", "email"])
            .query(QueryFacet::Include, ["logs"])
            .build()
            .unwrap_or_else(|_| unreachable!()),
    )
}

fn persisted_user() -> ResourceRecord {
    ResourceRecord::from_persisted(
        user_schema(),
        json!({"uuid": "u-1", "username": "alice", "comment": "", "id_status": 1}),
    )
    .unwrap_or_else(|_| unreachable!())
}

fn wrap(
    registry: PolicyRegistry,
    caller: Option<Caller>,
) -> AuthorizedResource<ResourceRecord> {
    AuthorizedResource::new(persisted_user(), Gate::for_caller(Arc::new(registry), caller))
}

fn bind(policy: RulePolicy) -> PolicyRegistry {
    PolicyRegistry::builder().bind("user", Arc::new(policy)).build()
}

fn names(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

#[tokio::test]
async fn no_policy_is_permissive_across_facets() {
    let resource = wrap(PolicyRegistry::default(), None);

    let editable = resource.authorized_editable(false).await.unwrap_or_default();
    let forbidden = resource.forbidden_editable().await.unwrap_or_default();
    let hidden = resource.hidden().await.unwrap_or_default();
    let sortable = resource
        .authorized_query(QueryFacet::Sort)
        .await
        .unwrap_or_default();

    assert_eq!(editable, names(&["username", "comment", "id_status"]));
    assert!(forbidden.is_empty());
    assert_eq!(hidden, names(&["password", "token"]));
    assert_eq!(sortable, names(&["uuid", "username", "email"]));
}

#[tokio::test]
async fn primary_key_stays_queryable_when_every_rule_denies() {
    let policy = RulePolicy::builder()
        .query(QueryFacet::Filter, "username", |_, _| false)
        .query(QueryFacet::Filter, "email", |_, _| false)
        .query(QueryFacet::Filter, "uuid", |_, _| false)
        .build();
    let resource = wrap(bind(policy), None);

    let filterable = resource
        .authorized_query(QueryFacet::Filter)
        .await
        .unwrap_or_default();
    let includes = resource
        .authorized_query(QueryFacet::Include)
        .await
        .unwrap_or_default();

    assert_eq!(filterable, names(&["uuid"]));
    assert_eq!(includes, names(&["logs"]));
}

#[tokio::test]
async fn dirty_instance_picks_up_policy_changes() {
    let allow_comment = Arc::new(AtomicBool::new(true));
    let flag = allow_comment.clone();
    let policy = RulePolicy::builder()
        .edit("comment", move |_, _| flag.load(Ordering::SeqCst))
        .build();
    let mut resource = wrap(bind(policy), Some(Caller::new("u-1", "Alice", None)));

    let before = resource.authorized_editable(false).await.unwrap_or_default();
    assert!(before.contains("comment"));

    allow_comment.store(false, Ordering::SeqCst);
    let cached = resource.authorized_editable(false).await.unwrap_or_default();
    assert!(cached.contains("comment"));

    resource
        .resource_mut()
        .set_attribute("username", json!("alice2"));
    let refreshed = resource.authorized_editable(false).await.unwrap_or_default();
    assert!(!refreshed.contains("comment"));
}

#[tokio::test]
async fn force_update_bypasses_the_cache() {
    let allow_comment = Arc::new(AtomicBool::new(true));
    let flag = allow_comment.clone();
    let policy = RulePolicy::builder()
        .edit("comment", move |_, _| flag.load(Ordering::SeqCst))
        .build();
    let resource = wrap(bind(policy), None);

    assert!(
        resource
            .authorized_editable(false)
            .await
            .unwrap_or_default()
            .contains("comment")
    );

    allow_comment.store(false, Ordering::SeqCst);
    assert!(
        !resource
            .authorized_editable(true)
            .await
            .unwrap_or_default()
            .contains("comment")
    );
}

#[tokio::test]
async fn clean_instance_memoizes_each_facet_separately() {
    let evaluations = Arc::new(AtomicUsize::new(0));
    let counter = evaluations.clone();
    let policy = RulePolicy::builder()
        .query(QueryFacet::Sort, "email", move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .build();
    let resource = wrap(bind(policy), None);

    for _ in 0..3 {
        let _ = resource.authorized_query(QueryFacet::Sort).await;
        let _ = resource.authorized_query(QueryFacet::Filter).await;
    }
    assert_eq!(evaluations.load(Ordering::SeqCst), 1);

    resource.invalidate().await;
    let _ = resource.authorized_query(QueryFacet::Sort).await;
    assert_eq!(evaluations.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn before_allow_grants_defined_rules_but_keeps_unruled_hidden() {
    let policy = RulePolicy::builder()
        .before(|caller, _| {
            if caller.is_some_and(Caller::is_admin) {
                BeforeDecision::Allow
            } else {
                BeforeDecision::Abstain
            }
        })
        .edit("id_status", |_, _| false)
        .query(QueryFacet::Sort, "email", |_, _| false)
        .build();
    let admin = Caller::new("root", "Root", None).with_roles(["admin"]);
    let resource = wrap(bind(policy), Some(admin));

    assert_eq!(
        resource.hidden().await.unwrap_or_default(),
        names(&["password", "token"])
    );
    assert!(resource.forbidden_editable().await.unwrap_or_default().is_empty());
    assert_eq!(
        resource.authorized_editable(false).await.unwrap_or_default(),
        names(&["username", "comment", "id_status"])
    );
    assert_eq!(
        resource
            .authorized_query(QueryFacet::Sort)
            .await
            .unwrap_or_default(),
        names(&["uuid", "username", "email"])
    );
}

#[tokio::test]
async fn view_rule_reveals_hidden_attribute() {
    let policy = RulePolicy::builder()
        .view("token", |caller, resource| {
            match (caller, resource.and_then(|resource| resource.key())) {
                (Some(caller), Some(key)) => key.as_str() == Some(caller.subject()),
                _ => false,
            }
        })
        .build();
    let owner = wrap(bind(policy.clone()), Some(Caller::new("u-1", "Alice", None)));
    let stranger = wrap(bind(policy), Some(Caller::new("u-2", "Bob", None)));

    assert_eq!(owner.hidden().await.unwrap_or_default(), names(&["password"]));
    assert_eq!(
        stranger.hidden().await.unwrap_or_default(),
        names(&["password", "token"])
    );
    let visible = owner.visible_data().await.unwrap_or_default();
    assert!(visible.get("password").is_none());
}

#[tokio::test]
async fn admin_never_sees_hidden_attribute_without_view_rule() {
    let policy = RulePolicy::builder()
        .before(|caller, _| {
            if caller.is_some_and(Caller::is_admin) {
                BeforeDecision::Allow
            } else {
                BeforeDecision::Abstain
            }
        })
        .view("token", |_, _| false)
        .build();
    let admin = Caller::new("root", "Root", None).with_roles(["admin"]);
    let mut record = persisted_user();
    record.set_attribute("password", json!("hash"));
    record.set_attribute("token", json!("t-1"));
    record.sync_original();
    let resource = AuthorizedResource::new(
        record,
        Gate::for_caller(Arc::new(bind(policy)), Some(admin)),
    );

    let visible = resource.visible_data().await.unwrap_or_default();

    assert!(visible.get("password").is_none());
    assert_eq!(visible.get("token"), Some(&json!("t-1")));
}

#[tokio::test]
async fn fill_drops_keys_the_caller_may_not_edit() {
    let policy = RulePolicy::builder()
        .edit("id_status", |caller, _| caller.is_some_and(Caller::is_admin))
        .build();
    let mut resource = wrap(bind(policy), Some(Caller::new("u-1", "Alice", None)));

    let dropped = resource
        .fill(&json!({"comment": "hi", "id_status": 9, "password": "x"}))
        .await
        .unwrap_or_default();

    assert_eq!(dropped, vec!["id_status".to_owned(), "password".to_owned()]);
    assert_eq!(resource.resource().data().get("comment"), Some(&json!("hi")));
}

#[tokio::test]
async fn unknown_facet_name_fails_closed() {
    let resource = wrap(PolicyRegistry::default(), None);

    let sorts = resource
        .authorized_query_named("sorts")
        .await
        .unwrap_or_default();
    let unknown = resource
        .authorized_query_named("grouping")
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(sorts.contains("email"));
    assert!(unknown.is_empty());
}

fn rule_table() -> impl Strategy<Value = BTreeMap<String, Option<bool>>> {
    proptest::collection::btree_map("[a-e]{1,2}", proptest::option::of(any::<bool>()), 0..8)
}

fn table_policy(facet: QueryFacet, table: &BTreeMap<String, Option<bool>>) -> RulePolicy {
    table
        .iter()
        .fold(RulePolicy::builder(), |builder, (name, rule)| match rule {
            Some(outcome) => {
                let outcome = *outcome;
                builder
                    .query(facet, name, move |_, _| outcome)
                    .edit(name, move |_, _| outcome)
            }
            None => builder,
        })
        .build()
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap_or_else(|_| unreachable!())
}

proptest! {
    #[test]
    fn authorized_query_never_widens_declared_set(table in rule_table()) {
        let declared: Vec<String> = table.keys().cloned().collect();
        let schema = Arc::new(
            ResourceSchema::builder("item")
                .query(QueryFacet::Sort, declared.clone())
                .query(QueryFacet::Append, declared.clone())
                .build()
                .unwrap_or_else(|_| unreachable!()),
        );
        let registry = PolicyRegistry::builder()
            .bind("item", Arc::new(table_policy(QueryFacet::Sort, &table)))
            .build();
        let resource = AuthorizedResource::new(
            ResourceRecord::prototype(schema),
            Gate::for_caller(Arc::new(registry), None),
        );

        let (sortable, appendable) = runtime().block_on(async {
            (
                resource.authorized_query(QueryFacet::Sort).await.unwrap_or_default(),
                resource.authorized_query(QueryFacet::Append).await.unwrap_or_default(),
            )
        });

        let mut bound: BTreeSet<String> = declared.iter().cloned().collect();
        prop_assert_eq!(&appendable, &bound);
        bound.insert("id".to_owned());
        prop_assert!(sortable.is_subset(&bound));
        prop_assert!(sortable.contains("id"));
    }

    #[test]
    fn editable_and_forbidden_partition_fillable(table in rule_table()) {
        let fillable: Vec<String> = table.keys().cloned().collect();
        let schema = Arc::new(
            ResourceSchema::builder("item")
                .fillable(fillable.clone())
                .build()
                .unwrap_or_else(|_| unreachable!()),
        );
        let registry = PolicyRegistry::builder()
            .bind("item", Arc::new(table_policy(QueryFacet::Sort, &table)))
            .build();
        let resource = AuthorizedResource::new(
            ResourceRecord::prototype(schema),
            Gate::for_caller(Arc::new(registry), None),
        );

        let (editable, forbidden) = runtime().block_on(async {
            (
                resource.authorized_editable(false).await.unwrap_or_default(),
                resource.forbidden_editable().await.unwrap_or_default(),
            )
        });

        let union: BTreeSet<String> = editable.union(&forbidden).cloned().collect();
        let expected: BTreeSet<String> = fillable.into_iter().collect();
        prop_assert!(editable.is_disjoint(&forbidden));
        prop_assert_eq!(union, expected);
    }
}

use std::collections::BTreeSet;

use restward_core::AppResult;
use restward_domain::{
    CollectionQuery, FilterClause, FilterOperator, QueryFacet, QueryRequest, Resource, SortClause,
};
use tracing::debug;

use crate::AuthorizedResource;

/// Translates a parsed request into a collection query limited to the
/// caller's authorized values.
///
/// Names outside the authorized sets are dropped. An explicit field selection
/// always keeps the primary key.
pub async fn build_collection_query<R: Resource>(
    request: &QueryRequest,
    resource: &AuthorizedResource<R>,
) -> AppResult<CollectionQuery> {
    let schema = resource.resource().schema();
    let resource_type = schema.resource_type().as_str();
    let primary_key = schema.primary_key();
    let mut query = CollectionQuery::new(resource_type);

    query.with = resource
        .authorized_query(QueryFacet::With)
        .await?
        .into_iter()
        .collect();

    let includes = resource.authorized_query(QueryFacet::Include).await?;
    query.includes = retain_authorized(
        resource_type,
        QueryFacet::Include,
        &request.includes,
        &includes,
    );

    let appends = resource.authorized_query(QueryFacet::Append).await?;
    query.appends = retain_authorized(
        resource_type,
        QueryFacet::Append,
        &request.appends,
        &appends,
    );

    let selected = request.selected_fields(resource_type);
    if !selected.is_empty() {
        let fields = resource.authorized_query(QueryFacet::Field).await?;
        let requested: Vec<String> = selected.into_iter().collect();
        let mut kept =
            retain_authorized(resource_type, QueryFacet::Field, &requested, &fields);
        if !kept.iter().any(|field| field == primary_key) {
            kept.insert(0, primary_key.to_owned());
        }
        query.fields = kept;
    }

    let sortable = resource.authorized_query(QueryFacet::Sort).await?;
    for sort in &request.sorts {
        if sortable.contains(&sort.field) {
            query.sorts.push(SortClause {
                field: sort.field.clone(),
                direction: sort.direction,
            });
        } else {
            log_dropped(resource_type, QueryFacet::Sort, &sort.field);
        }
    }

    let filterable = resource.authorized_query(QueryFacet::Filter).await?;
    for (field, value) in &request.filters {
        if !filterable.contains(field) {
            log_dropped(resource_type, QueryFacet::Filter, field);
            continue;
        }

        let operator = if field == primary_key {
            FilterOperator::Exact
        } else {
            FilterOperator::Partial
        };
        query.filters.push(FilterClause {
            field: field.clone(),
            operator,
            value: value.clone(),
        });
    }

    Ok(query)
}

fn retain_authorized(
    resource_type: &str,
    facet: QueryFacet,
    requested: &[String],
    authorized: &BTreeSet<String>,
) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut kept = Vec::new();

    for name in requested {
        if !seen.insert(name.as_str()) {
            continue;
        }

        if authorized.contains(name) {
            kept.push(name.clone());
        } else {
            log_dropped(resource_type, facet, name);
        }
    }

    kept
}

fn log_dropped(resource_type: &str, facet: QueryFacet, name: &str) {
    debug!(
        resource_type = %resource_type,
        facet = facet.as_str(),
        name = %name,
        "dropped unauthorized query value"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use restward_core::Caller;
    use restward_domain::{
        FilterOperator, QueryFacet, QueryRequest, ResourceRecord, ResourceSchema, SortDirection,
    };

    use super::build_collection_query;
    use crate::{AuthorizedResource, Gate, PolicyRegistry, RulePolicy};

    fn prototype(registry: PolicyRegistry) -> AuthorizedResource<ResourceRecord> {
        let schema = Arc::new(
            ResourceSchema::builder("user")
                .primary_key("uuid")
                .query(QueryFacet::With, ["status"])
                .query(QueryFacet::Sort, ["username", "email"])
                .query(QueryFacet::Filter, ["username", "email"])
                .query(QueryFacet::Field, ["username", "email"])
                .query(QueryFacet::Include, ["logs", "roles"])
                .build()
                .unwrap_or_else(|_| unreachable!()),
        );

        AuthorizedResource::new(
            ResourceRecord::prototype(schema),
            Gate::for_caller(
                Arc::new(registry),
                Some(Caller::new("u-1", "Alice", None)),
            ),
        )
    }

    #[tokio::test]
    async fn builds_query_from_authorized_values_only() {
        let registry = PolicyRegistry::builder()
            .bind(
                "user",
                Arc::new(
                    RulePolicy::builder()
                        .query(QueryFacet::Include, "roles", |_, _| false)
                        .query(QueryFacet::Field, "email", |_, _| false)
                        .build(),
                ),
            )
            .build();
        let resource = prototype(registry);
        let request = QueryRequest::from_query_pairs([
            ("sort", "-username,bogus"),
            ("filter[uuid]", "u-1"),
            ("filter[email]", "example.org"),
            ("filter[password]", "x"),
            ("fields[user]", "email,username"),
            ("include", "logs,roles,logs"),
        ]);

        let query = build_collection_query(&request, &resource)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(query.with, vec!["status".to_owned()]);
        assert_eq!(query.includes, vec!["logs".to_owned()]);
        assert_eq!(query.fields, vec!["uuid".to_owned(), "username".to_owned()]);
        assert_eq!(query.sorts.len(), 1);
        assert_eq!(query.sorts[0].direction, SortDirection::Desc);

        let operators: Vec<(&str, FilterOperator)> = query
            .filters
            .iter()
            .map(|filter| (filter.field.as_str(), filter.operator))
            .collect();
        assert_eq!(
            operators,
            vec![
                ("email", FilterOperator::Partial),
                ("uuid", FilterOperator::Exact)
            ]
        );
    }

    #[tokio::test]
    async fn related_type_selection_leaves_parent_unprojected() {
        let resource = prototype(PolicyRegistry::default());
        let request =
            QueryRequest::from_query_pairs([("include", "logs"), ("fields[user_log]", "message")]);

        let query = build_collection_query(&request, &resource)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(query.fields.is_empty());
        assert_eq!(query.includes, vec!["logs".to_owned()]);
    }

    #[tokio::test]
    async fn empty_request_selects_everything() {
        let resource = prototype(PolicyRegistry::default());

        let query = build_collection_query(&QueryRequest::default(), &resource)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(query.fields.is_empty());
        assert!(query.filters.is_empty());
        assert_eq!(query.resource_type, "user");
    }
}

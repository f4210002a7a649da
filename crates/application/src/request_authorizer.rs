use std::collections::BTreeSet;

use restward_core::{AppError, AppResult, Caller};
use restward_domain::{RequestedFacets, Resource};
use tracing::warn;

use crate::AuthorizedResource;

/// Rejects a request that names declared query values the caller may not use.
///
/// Names the resource type never declares are left for the query builder to
/// drop; only `(requested ∩ declared) − authorized` is a violation. The first
/// facet with violations fails the request and names all of its offenders.
pub async fn authorize_request<R: Resource>(
    requested: &RequestedFacets,
    resource: &AuthorizedResource<R>,
) -> AppResult<()> {
    if requested.is_empty() || resource.policy().is_none() {
        return Ok(());
    }

    let schema = resource.resource().schema();
    for (facet, names) in requested.iter() {
        let possible = schema.declared(facet);
        let authorized = resource.authorized_query(facet).await?;

        let violations: BTreeSet<&String> = names
            .intersection(&possible)
            .filter(|name| !authorized.contains(name.as_str()))
            .collect();
        if violations.is_empty() {
            continue;
        }

        let attributes: Vec<String> = violations.into_iter().cloned().collect();
        warn!(
            resource_type = %schema.resource_type(),
            facet = facet.as_str(),
            attributes = ?attributes,
            subject = resource.gate().caller().map(Caller::subject),
            "request names unauthorized query values"
        );

        return Err(AppError::AccessDenied {
            facet: facet.as_str().to_owned(),
            attributes,
        });
    }

    Ok(())
}

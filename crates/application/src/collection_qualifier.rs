use restward_core::AppResult;
use restward_domain::CollectionQuery;
use tracing::debug;

use crate::Gate;

/// Narrows a collection query through the type's policy scope hook.
///
/// Types without a policy pass the query through unchanged.
pub async fn qualify_collection(
    gate: &Gate,
    query: CollectionQuery,
    resource_type: &str,
) -> AppResult<CollectionQuery> {
    let Some(policy) = gate.policy_for(resource_type) else {
        return Ok(query);
    };

    let constraints_before = query.constraints.len();
    let qualified = policy.qualify_collection(gate.caller(), query).await?;

    debug!(
        resource_type = %resource_type,
        added_constraints = qualified.constraints.len().saturating_sub(constraints_before),
        "qualified collection query"
    );

    Ok(qualified)
}

use std::collections::BTreeSet;

use restward_core::{AppError, AppResult, Caller};
use restward_domain::Resource;
use tracing::warn;

use crate::AuthorizedResource;

/// Validates pending changes before an update is persisted.
///
/// Checks run in order: primary key changes, immutable attributes, then
/// attributes an explicit edit rule denies. Immutable attributes are rejected
/// before any policy is consulted, so a `before` bypass cannot unlock them.
pub async fn guard_update<R: Resource>(resource: &AuthorizedResource<R>) -> AppResult<()> {
    let instance = resource.resource();
    let schema = instance.schema();
    let changed = instance.changed_attributes();

    let primary_key = schema.primary_key();
    if changed.contains(primary_key) && instance.original(primary_key).is_some() {
        return Err(AppError::Validation(format!(
            "primary key '{primary_key}' of resource '{}' cannot be changed",
            schema.resource_type()
        )));
    }

    if let Some(name) = changed.intersection(schema.immutable()).next() {
        warn!(
            resource_type = %schema.resource_type(),
            attribute = %name,
            "update touches immutable attribute"
        );
        return Err(AppError::ImmutableAttribute(name.clone()));
    }

    let forbidden = resource.forbidden_editable().await?;
    let violations: BTreeSet<&String> = changed.intersection(&forbidden).collect();
    if violations.is_empty() {
        return Ok(());
    }

    let attributes: Vec<String> = violations.into_iter().cloned().collect();
    warn!(
        resource_type = %schema.resource_type(),
        attributes = ?attributes,
        subject = resource.gate().caller().map(Caller::subject),
        "update touches attributes the caller may not edit"
    );

    Err(AppError::AccessDenied {
        facet: "edit".to_owned(),
        attributes,
    })
}

use std::collections::BTreeSet;

use restward_core::AppResult;
use restward_domain::{Resource, ResourceRecord, VisibilityFacet};
use serde_json::Value;
use tracing::debug;

use super::{AuthorizedResource, ViewSlot};
use crate::{AttributeGate, GateFacet, GateMode};

impl<R: Resource> AuthorizedResource<R> {
    /// Returns the schema-hidden attributes the caller still may not view.
    pub async fn hidden(&self) -> AppResult<BTreeSet<String>> {
        let candidates = self.resource().schema().hidden().clone();
        self.memoized(ViewSlot::Hidden, &candidates, false).await
    }

    /// Returns the fillable attributes the caller may write.
    pub async fn authorized_editable(&self, force_update: bool) -> AppResult<BTreeSet<String>> {
        let candidates = self.resource().schema().fillable().clone();
        self.memoized(ViewSlot::Editable, &candidates, force_update)
            .await
    }

    /// Returns the fillable attributes an explicit rule denies to the caller.
    pub async fn forbidden_editable(&self) -> AppResult<BTreeSet<String>> {
        let policy = self.policy();
        let resource: &dyn Resource = self.resource();

        AttributeGate::evaluate(
            policy.as_deref(),
            self.gate().caller(),
            Some(resource),
            GateFacet::Visibility(VisibilityFacet::Edit),
            resource.schema().fillable(),
            GateMode::Deny,
        )
        .await
    }
}

impl AuthorizedResource<ResourceRecord> {
    /// Mass-assigns the payload keys the caller may edit.
    ///
    /// Returns the dropped keys.
    pub async fn fill(&mut self, payload: &Value) -> AppResult<Vec<String>> {
        let editable = self.authorized_editable(false).await?;
        let dropped = self.resource_mut().fill(payload, &editable)?;

        if !dropped.is_empty() {
            debug!(
                resource_type = %self.resource().schema().resource_type(),
                attributes = ?dropped,
                "dropped non-editable payload keys"
            );
        }

        Ok(dropped)
    }

    /// Assigns update payload keys the schema knows about, leaving the
    /// authorization decision to the update guard.
    ///
    /// Keys outside fillable, immutable and the primary key are dropped.
    pub fn fill_for_update(&mut self, payload: &Value) -> AppResult<Vec<String>> {
        let schema = self.resource().schema();
        let assignable: BTreeSet<String> = schema
            .fillable()
            .iter()
            .chain(schema.immutable())
            .cloned()
            .chain(std::iter::once(schema.primary_key().to_owned()))
            .collect();

        let dropped = self.resource_mut().fill(payload, &assignable)?;
        if !dropped.is_empty() {
            debug!(
                resource_type = %self.resource().schema().resource_type(),
                attributes = ?dropped,
                "dropped unknown update payload keys"
            );
        }

        Ok(dropped)
    }

    /// Returns the record's attributes without the ones hidden from the caller.
    pub async fn visible_data(&self) -> AppResult<Value> {
        let hidden = self.hidden().await?;
        Ok(self.resource().visible_data(&hidden))
    }
}

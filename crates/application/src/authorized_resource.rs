use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use restward_core::AppResult;
use restward_domain::{QueryFacet, Resource, VisibilityFacet};
use tokio::sync::Mutex;

use crate::{AttributeGate, Gate, GateFacet, GateMode, ResourcePolicy};

mod attribute_set;
mod query_set;

/// Memoized authorization result for one slot of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AuthorizedView {
    stale: bool,
    data: BTreeSet<String>,
}

impl AuthorizedView {
    fn uninitialized() -> Self {
        Self {
            stale: true,
            data: BTreeSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) enum ViewSlot {
    Hidden,
    Editable,
    Query(QueryFacet),
}

/// Resource instance paired with the caller's memoized authorization views.
///
/// Caches start empty for every wrapped instance, are never serialized with
/// the entity, and go stale on mutable access or whenever the instance reports
/// unsaved changes. A dirty instance therefore recomputes on every read until
/// it is saved. The lock is held across recomputation so a reader never
/// observes a view computed before a concurrent invalidation.
pub struct AuthorizedResource<R> {
    resource: R,
    gate: Gate,
    views: Mutex<BTreeMap<ViewSlot, AuthorizedView>>,
}

impl<R: Resource> AuthorizedResource<R> {
    /// Wraps an instance for the gate's caller.
    #[must_use]
    pub fn new(resource: R, gate: Gate) -> Self {
        Self {
            resource,
            gate,
            views: Mutex::new(BTreeMap::new()),
        }
    }

    /// Returns the wrapped instance.
    #[must_use]
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// Returns the wrapped instance for mutation and marks every view stale.
    pub fn resource_mut(&mut self) -> &mut R {
        for view in self.views.get_mut().values_mut() {
            view.stale = true;
        }

        &mut self.resource
    }

    /// Unwraps the instance, dropping its authorization views.
    #[must_use]
    pub fn into_inner(self) -> R {
        self.resource
    }

    /// Returns the gate the views are evaluated with.
    #[must_use]
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Returns the policy bound to the instance's type.
    #[must_use]
    pub fn policy(&self) -> Option<Arc<dyn ResourcePolicy>> {
        self.gate
            .policy_for(self.resource.schema().resource_type().as_str())
    }

    /// Marks every memoized view stale.
    pub async fn invalidate(&self) {
        for view in self.views.lock().await.values_mut() {
            view.stale = true;
        }
    }

    pub(crate) async fn memoized(
        &self,
        slot: ViewSlot,
        candidates: &BTreeSet<String>,
        force_update: bool,
    ) -> AppResult<BTreeSet<String>> {
        let mut views = self.views.lock().await;
        let view = views.entry(slot).or_insert_with(AuthorizedView::uninitialized);

        if self.resource.is_dirty() {
            view.stale = true;
        }

        if !view.stale && !force_update {
            return Ok(view.data.clone());
        }

        let data = self.compute(slot, candidates).await?;
        view.data = data.clone();
        view.stale = false;

        Ok(data)
    }

    async fn compute(
        &self,
        slot: ViewSlot,
        candidates: &BTreeSet<String>,
    ) -> AppResult<BTreeSet<String>> {
        let policy = self.policy();
        let caller = self.gate.caller();
        let resource: &dyn Resource = &self.resource;

        match slot {
            ViewSlot::Hidden => {
                AttributeGate::hidden(policy.as_deref(), caller, Some(resource), candidates).await
            }
            ViewSlot::Editable => {
                AttributeGate::evaluate(
                    policy.as_deref(),
                    caller,
                    Some(resource),
                    GateFacet::Visibility(VisibilityFacet::Edit),
                    candidates,
                    GateMode::Allow,
                )
                .await
            }
            ViewSlot::Query(facet) => {
                AttributeGate::evaluate(
                    policy.as_deref(),
                    caller,
                    Some(resource),
                    GateFacet::Query(facet),
                    candidates,
                    GateMode::Allow,
                )
                .await
            }
        }
    }
}

impl<R: Resource + std::fmt::Debug> std::fmt::Debug for AuthorizedResource<R> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AuthorizedResource")
            .field("resource", &self.resource)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;

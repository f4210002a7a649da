use std::collections::BTreeSet;

use restward_core::AppResult;
use restward_domain::{QueryFacet, Resource};
use tracing::warn;

use super::{AuthorizedResource, ViewSlot};

impl<R: Resource> AuthorizedResource<R> {
    /// Returns the declared names of a query facet the caller may use.
    ///
    /// The primary key is always part of the sort, filter and field sets.
    pub async fn authorized_query(&self, facet: QueryFacet) -> AppResult<BTreeSet<String>> {
        let candidates = self.resource().schema().declared(facet);
        let mut authorized = self.queryable(facet, &candidates, false).await?;

        if facet.includes_primary_key() {
            authorized.insert(self.resource().schema().primary_key().to_owned());
        }

        Ok(authorized)
    }

    /// Gates arbitrary candidates under a query facet, memoized per facet.
    pub async fn queryable(
        &self,
        facet: QueryFacet,
        candidates: &BTreeSet<String>,
        force_update: bool,
    ) -> AppResult<BTreeSet<String>> {
        self.memoized(ViewSlot::Query(facet), candidates, force_update)
            .await
    }

    /// Resolves a transport facet name; unknown names yield nothing.
    pub async fn authorized_query_named(&self, facet: &str) -> AppResult<BTreeSet<String>> {
        match facet.parse::<QueryFacet>() {
            Ok(facet) => self.authorized_query(facet).await,
            Err(error) => {
                warn!(
                    resource_type = %self.resource().schema().resource_type(),
                    facet = %facet,
                    error = %error,
                    "unknown query facet requested; failing closed"
                );
                Ok(BTreeSet::new())
            }
        }
    }
}

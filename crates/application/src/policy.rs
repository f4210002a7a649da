use async_trait::async_trait;
use restward_core::{AppResult, Caller};
use restward_domain::{AbilityName, CollectionQuery, Resource};

/// Outcome of a policy's `before` hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeforeDecision {
    /// Grant the ability without consulting its rule.
    Allow,
    /// Deny the ability without consulting its rule.
    Deny,
    /// No opinion; fall through to the ability rule.
    Abstain,
}

/// Authorization policy bound to one resource type.
///
/// Policies only declare the abilities they restrict. [`ResourcePolicy::defines`]
/// tells the gate whether a specific rule exists; abilities without a rule fall
/// back to the facet baseline.
#[async_trait]
pub trait ResourcePolicy: Send + Sync {
    /// Global hook evaluated before every ability.
    async fn before(
        &self,
        _caller: Option<&Caller>,
        _ability: &AbilityName,
    ) -> AppResult<BeforeDecision> {
        Ok(BeforeDecision::Abstain)
    }

    /// Returns whether the policy has a specific rule for the ability.
    fn defines(&self, ability: &AbilityName) -> bool;

    /// Evaluates the ability rule for the caller and optional instance.
    async fn check(
        &self,
        caller: Option<&Caller>,
        ability: &AbilityName,
        resource: Option<&dyn Resource>,
    ) -> AppResult<bool>;

    /// Narrows a collection query to the rows the caller may see.
    async fn qualify_collection(
        &self,
        _caller: Option<&Caller>,
        query: CollectionQuery,
    ) -> AppResult<CollectionQuery> {
        Ok(query)
    }
}

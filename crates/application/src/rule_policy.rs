use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use restward_core::{AppResult, Caller};
use restward_domain::{
    AbilityName, CollectionQuery, QueryFacet, Resource, ResourceAction, VisibilityFacet,
};

use crate::{BeforeDecision, ResourcePolicy};

type BeforeHook = Arc<dyn Fn(Option<&Caller>, &AbilityName) -> BeforeDecision + Send + Sync>;
type AbilityRule = Arc<dyn Fn(Option<&Caller>, Option<&dyn Resource>) -> bool + Send + Sync>;
type CollectionScope = Arc<dyn Fn(Option<&Caller>, CollectionQuery) -> CollectionQuery + Send + Sync>;

/// Policy assembled from per-ability closures at registration time.
#[derive(Clone, Default)]
pub struct RulePolicy {
    before: Option<BeforeHook>,
    rules: HashMap<AbilityName, AbilityRule>,
    collection_scope: Option<CollectionScope>,
}

impl RulePolicy {
    /// Starts an empty policy.
    #[must_use]
    pub fn builder() -> RulePolicyBuilder {
        RulePolicyBuilder {
            policy: Self::default(),
        }
    }
}

impl std::fmt::Debug for RulePolicy {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut abilities: Vec<&str> = self.rules.keys().map(AbilityName::as_str).collect();
        abilities.sort_unstable();

        formatter
            .debug_struct("RulePolicy")
            .field("before", &self.before.is_some())
            .field("abilities", &abilities)
            .field("collection_scope", &self.collection_scope.is_some())
            .finish()
    }
}

#[async_trait]
impl ResourcePolicy for RulePolicy {
    async fn before(
        &self,
        caller: Option<&Caller>,
        ability: &AbilityName,
    ) -> AppResult<BeforeDecision> {
        Ok(self
            .before
            .as_ref()
            .map_or(BeforeDecision::Abstain, |hook| hook(caller, ability)))
    }

    fn defines(&self, ability: &AbilityName) -> bool {
        self.rules.contains_key(ability)
    }

    async fn check(
        &self,
        caller: Option<&Caller>,
        ability: &AbilityName,
        resource: Option<&dyn Resource>,
    ) -> AppResult<bool> {
        Ok(self
            .rules
            .get(ability)
            .is_some_and(|rule| rule(caller, resource)))
    }

    async fn qualify_collection(
        &self,
        caller: Option<&Caller>,
        query: CollectionQuery,
    ) -> AppResult<CollectionQuery> {
        Ok(match &self.collection_scope {
            Some(scope) => scope(caller, query),
            None => query,
        })
    }
}

/// Builder for [`RulePolicy`].
pub struct RulePolicyBuilder {
    policy: RulePolicy,
}

impl RulePolicyBuilder {
    /// Sets the hook evaluated before every ability.
    #[must_use]
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(Option<&Caller>, &AbilityName) -> BeforeDecision + Send + Sync + 'static,
    {
        self.policy.before = Some(Arc::new(hook));
        self
    }

    /// Adds a rule for a raw ability name.
    #[must_use]
    pub fn ability<F>(mut self, ability: AbilityName, rule: F) -> Self
    where
        F: Fn(Option<&Caller>, Option<&dyn Resource>) -> bool + Send + Sync + 'static,
    {
        self.policy.rules.insert(ability, Arc::new(rule));
        self
    }

    /// Adds a rule for a resource-level action.
    #[must_use]
    pub fn action<F>(self, action: ResourceAction, rule: F) -> Self
    where
        F: Fn(Option<&Caller>, Option<&dyn Resource>) -> bool + Send + Sync + 'static,
    {
        self.ability(AbilityName::for_action(action), rule)
    }

    /// Adds a rule deciding whether the caller may see an attribute.
    #[must_use]
    pub fn view<F>(self, attribute: &str, rule: F) -> Self
    where
        F: Fn(Option<&Caller>, Option<&dyn Resource>) -> bool + Send + Sync + 'static,
    {
        self.ability(
            AbilityName::for_visibility(VisibilityFacet::View, attribute),
            rule,
        )
    }

    /// Adds a rule deciding whether the caller may write an attribute.
    #[must_use]
    pub fn edit<F>(self, attribute: &str, rule: F) -> Self
    where
        F: Fn(Option<&Caller>, Option<&dyn Resource>) -> bool + Send + Sync + 'static,
    {
        self.ability(
            AbilityName::for_visibility(VisibilityFacet::Edit, attribute),
            rule,
        )
    }

    /// Adds a rule for one attribute under a query facet.
    #[must_use]
    pub fn query<F>(self, facet: QueryFacet, attribute: &str, rule: F) -> Self
    where
        F: Fn(Option<&Caller>, Option<&dyn Resource>) -> bool + Send + Sync + 'static,
    {
        self.ability(AbilityName::for_query(facet, attribute), rule)
    }

    /// Sets the hook narrowing collection queries.
    #[must_use]
    pub fn scope_collection<F>(mut self, scope: F) -> Self
    where
        F: Fn(Option<&Caller>, CollectionQuery) -> CollectionQuery + Send + Sync + 'static,
    {
        self.policy.collection_scope = Some(Arc::new(scope));
        self
    }

    /// Finishes the policy.
    #[must_use]
    pub fn build(self) -> RulePolicy {
        self.policy
    }
}

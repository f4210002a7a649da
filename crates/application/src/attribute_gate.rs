use std::collections::BTreeSet;

use restward_core::{AppResult, Caller};
use restward_domain::{AbilityName, QueryFacet, Resource, VisibilityFacet};
use tracing::debug;

use crate::{GateDecision, ResourcePolicy, decide};

/// Whether the gate returns permitted or forbidden candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    /// Keep candidates the caller is granted.
    Allow,
    /// Keep candidates the caller is explicitly denied.
    Deny,
}

/// Facet a candidate is gated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GateFacet {
    /// Attribute visibility facet.
    Visibility(VisibilityFacet),
    /// Query facet.
    Query(QueryFacet),
}

impl GateFacet {
    /// Returns the ability checked for one candidate.
    #[must_use]
    pub fn ability(&self, attribute: &str) -> AbilityName {
        match self {
            Self::Visibility(facet) => AbilityName::for_visibility(*facet, attribute),
            Self::Query(facet) => AbilityName::for_query(*facet, attribute),
        }
    }

    /// Returns whether a candidate without a specific rule is permitted.
    #[must_use]
    pub fn baseline_allows(&self) -> bool {
        !matches!(self, Self::Visibility(VisibilityFacet::View))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Visibility(facet) => facet.ability_prefix(),
            Self::Query(facet) => facet.ability_prefix(),
        }
    }
}

/// Filters candidate attribute and relation names through a resource policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeGate;

impl AttributeGate {
    /// Returns the candidates permitted (Allow) or forbidden (Deny) for the caller.
    ///
    /// Without a policy, Allow returns every candidate and Deny returns none.
    /// A candidate without a rule falls back to the facet baseline in Allow
    /// mode and is never forbidden in Deny mode, whatever `before` would say.
    pub async fn evaluate(
        policy: Option<&dyn ResourcePolicy>,
        caller: Option<&Caller>,
        resource: Option<&dyn Resource>,
        facet: GateFacet,
        candidates: &BTreeSet<String>,
        mode: GateMode,
    ) -> AppResult<BTreeSet<String>> {
        let Some(policy) = policy else {
            return Ok(match mode {
                GateMode::Allow => candidates.clone(),
                GateMode::Deny => BTreeSet::new(),
            });
        };

        let mut selected = BTreeSet::new();
        for candidate in candidates {
            let ability = facet.ability(candidate);

            // The before hook only applies to abilities the policy defines.
            let decision = if policy.defines(&ability) {
                decide(policy, caller, &ability, resource).await?
            } else {
                GateDecision::NoRule
            };
            let keep = match (mode, decision) {
                (GateMode::Allow, GateDecision::Granted) => true,
                (GateMode::Allow, GateDecision::NoRule) => facet.baseline_allows(),
                (GateMode::Deny, GateDecision::Denied) => true,
                _ => false,
            };

            if keep {
                selected.insert(candidate.clone());
            }
        }

        debug!(
            facet = facet.label(),
            mode = ?mode,
            candidates = candidates.len(),
            selected = selected.len(),
            "evaluated attribute gate"
        );

        Ok(selected)
    }

    /// Returns the hidden candidates the caller still may not view.
    ///
    /// Policies can only reveal attributes through `view<Attr>` rules; an
    /// attribute without a rule stays hidden, even for callers `before` admits.
    pub async fn hidden(
        policy: Option<&dyn ResourcePolicy>,
        caller: Option<&Caller>,
        resource: Option<&dyn Resource>,
        candidates: &BTreeSet<String>,
    ) -> AppResult<BTreeSet<String>> {
        if policy.is_none() {
            return Ok(candidates.clone());
        }

        let viewable = Self::evaluate(
            policy,
            caller,
            resource,
            GateFacet::Visibility(VisibilityFacet::View),
            candidates,
            GateMode::Allow,
        )
        .await?;

        Ok(candidates.difference(&viewable).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use restward_core::Caller;
    use restward_domain::{QueryFacet, VisibilityFacet};

    use super::{AttributeGate, GateFacet, GateMode};
    use crate::{BeforeDecision, RulePolicy};

    fn names(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    fn editor_policy() -> RulePolicy {
        RulePolicy::builder()
            .edit("id_status", |caller, _| caller.is_some_and(Caller::is_admin))
            .edit("comment", |caller, _| caller.is_some())
            .view("token", |caller, _| caller.is_some_and(Caller::is_admin))
            .build()
    }

    #[tokio::test]
    async fn allow_mode_keeps_granted_and_unruled_candidates() {
        let policy = editor_policy();
        let caller = Caller::new("alice", "Alice", None);

        let editable = AttributeGate::evaluate(
            Some(&policy),
            Some(&caller),
            None,
            GateFacet::Visibility(VisibilityFacet::Edit),
            &names(&["username", "comment", "id_status"]),
            GateMode::Allow,
        )
        .await
        .unwrap_or_default();

        assert_eq!(editable, names(&["username", "comment"]));
    }

    #[tokio::test]
    async fn deny_mode_keeps_only_denied_rules() {
        let policy = editor_policy();

        let forbidden = AttributeGate::evaluate(
            Some(&policy),
            None,
            None,
            GateFacet::Visibility(VisibilityFacet::Edit),
            &names(&["username", "comment", "id_status"]),
            GateMode::Deny,
        )
        .await
        .unwrap_or_default();

        assert_eq!(forbidden, names(&["comment", "id_status"]));
    }

    #[tokio::test]
    async fn missing_policy_is_permissive_in_allow_and_empty_in_deny() {
        let candidates = names(&["name", "email"]);
        let facet = GateFacet::Query(QueryFacet::Sort);

        let allowed =
            AttributeGate::evaluate(None, None, None, facet, &candidates, GateMode::Allow)
                .await
                .unwrap_or_default();
        let denied = AttributeGate::evaluate(None, None, None, facet, &candidates, GateMode::Deny)
            .await
            .unwrap_or_default();

        assert_eq!(allowed, candidates);
        assert!(denied.is_empty());
    }

    #[tokio::test]
    async fn hidden_attributes_stay_hidden_without_view_rule() {
        let policy = editor_policy();
        let admin = Caller::new("root", "Root", None).with_roles(["admin"]);
        let candidates = names(&["password", "token"]);

        let hidden = AttributeGate::hidden(Some(&policy), Some(&admin), None, &candidates)
            .await
            .unwrap_or_default();
        let hidden_without_policy = AttributeGate::hidden(None, Some(&admin), None, &candidates)
            .await
            .unwrap_or_default();

        assert_eq!(hidden, names(&["password"]));
        assert_eq!(hidden_without_policy, candidates);
    }

    #[tokio::test]
    async fn before_hook_short_circuits_defined_rules_only() {
        let policy = RulePolicy::builder()
            .before(|caller, _| {
                if caller.is_some_and(Caller::is_admin) {
                    BeforeDecision::Allow
                } else {
                    BeforeDecision::Abstain
                }
            })
            .query(QueryFacet::Filter, "email", |_, _| false)
            .view("token", |_, _| false)
            .build();
        let admin = Caller::new("root", "Root", None).with_roles(["admin"]);
        let candidates = names(&["email", "password"]);
        let hidden_candidates = names(&["password", "token"]);

        let filters = AttributeGate::evaluate(
            Some(&policy),
            Some(&admin),
            None,
            GateFacet::Query(QueryFacet::Filter),
            &candidates,
            GateMode::Allow,
        )
        .await
        .unwrap_or_default();
        let hidden = AttributeGate::hidden(Some(&policy), Some(&admin), None, &hidden_candidates)
            .await
            .unwrap_or_default();

        assert_eq!(filters, candidates);
        assert_eq!(hidden, names(&["password"]));
    }

    #[tokio::test]
    async fn before_deny_counts_as_forbidden_for_defined_rules() {
        let policy = RulePolicy::builder()
            .before(|caller, _| {
                if caller.is_none() {
                    BeforeDecision::Deny
                } else {
                    BeforeDecision::Abstain
                }
            })
            .edit("username", |_, _| true)
            .build();
        let candidates = names(&["username", "comment"]);
        let facet = GateFacet::Visibility(VisibilityFacet::Edit);

        let allowed = AttributeGate::evaluate(
            Some(&policy),
            None,
            None,
            facet,
            &candidates,
            GateMode::Allow,
        )
        .await
        .unwrap_or_default();
        let forbidden =
            AttributeGate::evaluate(Some(&policy), None, None, facet, &candidates, GateMode::Deny)
                .await
                .unwrap_or_default();

        assert_eq!(allowed, names(&["comment"]));
        assert_eq!(forbidden, names(&["username"]));
    }
}

use std::sync::Arc;

use restward_core::{AppError, AppResult, Caller};
use restward_domain::{AbilityName, Resource, ResourceAction};
use tracing::warn;

use crate::{BeforeDecision, PolicyRegistry, ResourcePolicy};

/// Resolution of one ability against one policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// The `before` hook or the ability rule granted the ability.
    Granted,
    /// The `before` hook or the ability rule denied the ability.
    Denied,
    /// The hook abstained and the policy has no rule for the ability.
    NoRule,
}

/// Resolves an ability: `before` hook first, then the specific rule.
pub async fn decide(
    policy: &dyn ResourcePolicy,
    caller: Option<&Caller>,
    ability: &AbilityName,
    resource: Option<&dyn Resource>,
) -> AppResult<GateDecision> {
    match policy.before(caller, ability).await? {
        BeforeDecision::Allow => return Ok(GateDecision::Granted),
        BeforeDecision::Deny => return Ok(GateDecision::Denied),
        BeforeDecision::Abstain => {}
    }

    if !policy.defines(ability) {
        return Ok(GateDecision::NoRule);
    }

    if policy.check(caller, ability, resource).await? {
        Ok(GateDecision::Granted)
    } else {
        Ok(GateDecision::Denied)
    }
}

/// Policy registry paired with the caller of the current request.
#[derive(Debug, Clone)]
pub struct Gate {
    registry: Arc<PolicyRegistry>,
    caller: Option<Caller>,
}

impl Gate {
    /// Creates a gate evaluating abilities for the caller; `None` is anonymous.
    #[must_use]
    pub fn for_caller(registry: Arc<PolicyRegistry>, caller: Option<Caller>) -> Self {
        Self { registry, caller }
    }

    /// Returns the caller, if authenticated.
    #[must_use]
    pub fn caller(&self) -> Option<&Caller> {
        self.caller.as_ref()
    }

    /// Returns the policy bound to a resource type.
    #[must_use]
    pub fn policy_for(&self, resource_type: &str) -> Option<Arc<dyn ResourcePolicy>> {
        self.registry.resolve(resource_type)
    }

    /// Returns whether the caller may perform a resource-level action.
    ///
    /// Types without a policy are unrestricted. With a policy, an action without
    /// a rule is denied.
    pub async fn allows_action(
        &self,
        resource_type: &str,
        action: ResourceAction,
        resource: Option<&dyn Resource>,
    ) -> AppResult<bool> {
        let Some(policy) = self.policy_for(resource_type) else {
            return Ok(true);
        };

        let decision = decide(
            policy.as_ref(),
            self.caller(),
            &AbilityName::for_action(action),
            resource,
        )
        .await?;

        Ok(decision == GateDecision::Granted)
    }

    /// Fails with an access denial when the caller may not perform the action.
    pub async fn authorize_action(
        &self,
        resource_type: &str,
        action: ResourceAction,
        resource: Option<&dyn Resource>,
    ) -> AppResult<()> {
        if self.allows_action(resource_type, action, resource).await? {
            return Ok(());
        }

        warn!(
            resource_type = %resource_type,
            action = action.as_str(),
            subject = self.caller().map(Caller::subject),
            "resource action denied"
        );

        Err(AppError::AccessDenied {
            facet: "action".to_owned(),
            attributes: vec![action.as_str().to_owned()],
        })
    }
}

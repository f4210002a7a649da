use std::collections::HashMap;
use std::sync::Arc;

use crate::ResourcePolicy;

/// Read-only binding of resource types to their policies.
#[derive(Clone, Default)]
pub struct PolicyRegistry {
    policies: HashMap<String, Arc<dyn ResourcePolicy>>,
}

impl PolicyRegistry {
    /// Starts an empty registry.
    #[must_use]
    pub fn builder() -> PolicyRegistryBuilder {
        PolicyRegistryBuilder {
            policies: HashMap::new(),
        }
    }

    /// Returns the policy bound to a resource type, if any.
    ///
    /// `None` is the explicit unrestricted state, not an error.
    #[must_use]
    pub fn resolve(&self, resource_type: &str) -> Option<Arc<dyn ResourcePolicy>> {
        self.policies.get(resource_type).cloned()
    }
}

impl std::fmt::Debug for PolicyRegistry {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut bound: Vec<&str> = self.policies.keys().map(String::as_str).collect();
        bound.sort_unstable();

        formatter
            .debug_struct("PolicyRegistry")
            .field("bound", &bound)
            .finish()
    }
}

/// Builder populated once at startup.
pub struct PolicyRegistryBuilder {
    policies: HashMap<String, Arc<dyn ResourcePolicy>>,
}

impl PolicyRegistryBuilder {
    /// Binds a policy to a resource type, replacing any earlier binding.
    #[must_use]
    pub fn bind(mut self, resource_type: impl Into<String>, policy: Arc<dyn ResourcePolicy>) -> Self {
        self.policies.insert(resource_type.into(), policy);
        self
    }

    /// Freezes the registry.
    #[must_use]
    pub fn build(self) -> PolicyRegistry {
        PolicyRegistry {
            policies: self.policies,
        }
    }
}

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use restward_core::AppError;
use serde::{Deserialize, Serialize};

/// Query dimensions a caller can shape through request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryFacet {
    /// Relations always eager loaded with the resource.
    With,
    /// Attributes usable in `sort`.
    Sort,
    /// Attributes usable in `filter[...]`.
    Filter,
    /// Attributes selectable through `fields[...]`.
    Field,
    /// Relations loadable through `include`.
    Include,
    /// Computed attributes addable through `append`.
    Append,
}

impl QueryFacet {
    /// Returns the ability-name prefix checked in resource policies.
    #[must_use]
    pub fn ability_prefix(&self) -> &'static str {
        match self {
            Self::With => "with",
            Self::Sort => "sort",
            Self::Filter => "filter",
            Self::Field => "field",
            Self::Include => "include",
            Self::Append => "append",
        }
    }

    /// Returns a stable transport value for this facet.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.ability_prefix()
    }

    /// Returns whether the primary key is always part of the authorized set.
    #[must_use]
    pub fn includes_primary_key(&self) -> bool {
        matches!(self, Self::Sort | Self::Filter | Self::Field)
    }
}

impl Display for QueryFacet {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for QueryFacet {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "with" => Ok(Self::With),
            "sort" | "sorts" => Ok(Self::Sort),
            "filter" | "filters" => Ok(Self::Filter),
            "field" | "fields" | "select" => Ok(Self::Field),
            "include" | "includes" => Ok(Self::Include),
            "append" | "appends" => Ok(Self::Append),
            _ => Err(AppError::UnknownFacet(value.to_owned())),
        }
    }
}

/// Attribute visibility dimensions checked per attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityFacet {
    /// Whether the caller may see the attribute in output.
    View,
    /// Whether the caller may write the attribute.
    Edit,
}

impl VisibilityFacet {
    /// Returns the ability-name prefix checked in resource policies.
    #[must_use]
    pub fn ability_prefix(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
        }
    }
}

/// Resource-level actions authorized before any attribute gating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceAction {
    /// List the collection.
    ViewAll,
    /// Read a single instance.
    View,
    /// Create an instance.
    Create,
    /// Update an instance.
    Update,
    /// Delete an instance.
    Delete,
}

impl ResourceAction {
    /// Returns the policy ability name for the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ViewAll => "viewAll",
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{QueryFacet, ResourceAction};

    #[test]
    fn facet_aliases_resolve_to_one_facet() {
        assert_eq!(QueryFacet::from_str("select").ok(), Some(QueryFacet::Field));
        assert_eq!(QueryFacet::from_str("fields").ok(), Some(QueryFacet::Field));
        assert_eq!(QueryFacet::from_str("sorts").ok(), Some(QueryFacet::Sort));
    }

    #[test]
    fn unknown_facet_is_rejected() {
        assert!(QueryFacet::from_str("groupings").is_err());
    }

    #[test]
    fn actions_use_policy_ability_names() {
        assert_eq!(ResourceAction::ViewAll.as_str(), "viewAll");
        assert_eq!(ResourceAction::Delete.as_str(), "delete");
    }
}

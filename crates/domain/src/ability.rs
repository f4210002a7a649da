use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::{QueryFacet, ResourceAction, VisibilityFacet};

/// Policy ability identifier such as `sortEmail` or `editPhoneNumber`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AbilityName(String);

impl AbilityName {
    /// Creates an ability name from a raw policy method name.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the ability checked for a query facet on one attribute.
    #[must_use]
    pub fn for_query(facet: QueryFacet, attribute: &str) -> Self {
        Self(format!("{}{}", facet.ability_prefix(), studly_case(attribute)))
    }

    /// Returns the ability checked for attribute visibility.
    #[must_use]
    pub fn for_visibility(facet: VisibilityFacet, attribute: &str) -> Self {
        Self(format!("{}{}", facet.ability_prefix(), studly_case(attribute)))
    }

    /// Returns the ability checked for a resource-level action.
    #[must_use]
    pub fn for_action(action: ResourceAction) -> Self {
        Self(action.as_str().to_owned())
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for AbilityName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Converts an attribute name to its capitalized identifier form.
///
/// `-`, `_` and whitespace separate words; every word starts upper-case and
/// separators are dropped, so `user_name`, `user-name` and `userName` all map
/// to `UserName`.
#[must_use]
pub fn studly_case(value: &str) -> String {
    let mut output = String::with_capacity(value.len());

    for word in value
        .split(|character: char| character == '-' || character == '_' || character.is_whitespace())
        .filter(|word| !word.is_empty())
    {
        let mut characters = word.chars();
        if let Some(first) = characters.next() {
            output.extend(first.to_uppercase());
            output.push_str(characters.as_str());
        }
    }

    output
}

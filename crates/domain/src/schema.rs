use std::collections::{BTreeMap, BTreeSet};

use restward_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

use crate::QueryFacet;

/// Caller-independent declaration of what a resource type exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSchema {
    resource_type: NonEmptyString,
    primary_key: NonEmptyString,
    hidden: BTreeSet<String>,
    fillable: BTreeSet<String>,
    immutable: BTreeSet<String>,
    query: BTreeMap<QueryFacet, BTreeSet<String>>,
}

impl ResourceSchema {
    /// Starts a schema declaration for a resource type.
    pub fn builder(resource_type: impl Into<String>) -> ResourceSchemaBuilder {
        ResourceSchemaBuilder {
            resource_type: resource_type.into(),
            primary_key: "id".to_owned(),
            hidden: Vec::new(),
            fillable: Vec::new(),
            immutable: Vec::new(),
            query: BTreeMap::new(),
        }
    }

    /// Returns the resource type name policies are bound to.
    #[must_use]
    pub fn resource_type(&self) -> &NonEmptyString {
        &self.resource_type
    }

    /// Returns the primary key attribute name.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        self.primary_key.as_str()
    }

    /// Returns attributes excluded from output by default.
    #[must_use]
    pub fn hidden(&self) -> &BTreeSet<String> {
        &self.hidden
    }

    /// Returns attributes eligible for mass assignment by default.
    #[must_use]
    pub fn fillable(&self) -> &BTreeSet<String> {
        &self.fillable
    }

    /// Returns attributes that never change through the API once created.
    #[must_use]
    pub fn immutable(&self) -> &BTreeSet<String> {
        &self.immutable
    }

    /// Returns the declared candidates for a query facet.
    #[must_use]
    pub fn declared(&self, facet: QueryFacet) -> BTreeSet<String> {
        self.query.get(&facet).cloned().unwrap_or_default()
    }
}

/// Validating builder for [`ResourceSchema`].
#[derive(Debug, Clone)]
pub struct ResourceSchemaBuilder {
    resource_type: String,
    primary_key: String,
    hidden: Vec<String>,
    fillable: Vec<String>,
    immutable: Vec<String>,
    query: BTreeMap<QueryFacet, Vec<String>>,
}

impl ResourceSchemaBuilder {
    /// Sets the primary key attribute (defaults to `id`).
    #[must_use]
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        self.primary_key = name.into();
        self
    }

    /// Declares attributes hidden from output by default.
    #[must_use]
    pub fn hidden<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declares attributes eligible for mass assignment.
    #[must_use]
    pub fn fillable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fillable.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declares attributes that can never be changed through the API.
    #[must_use]
    pub fn immutable<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.immutable.extend(names.into_iter().map(Into::into));
        self
    }

    /// Declares the candidates the type supports for a query facet.
    #[must_use]
    pub fn query<I, S>(mut self, facet: QueryFacet, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.query
            .entry(facet)
            .or_default()
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Validates and builds the schema.
    pub fn build(self) -> AppResult<ResourceSchema> {
        let resource_type = NonEmptyString::new(self.resource_type.trim())?;
        let primary_key = NonEmptyString::new(self.primary_key.trim()).map_err(|_| {
            AppError::Validation(format!(
                "resource '{resource_type}' must declare a non-empty primary key"
            ))
        })?;

        let mut query = BTreeMap::new();
        for (facet, names) in self.query {
            query.insert(facet, normalize_names(resource_type.as_str(), names)?);
        }

        Ok(ResourceSchema {
            hidden: normalize_names(resource_type.as_str(), self.hidden)?,
            fillable: normalize_names(resource_type.as_str(), self.fillable)?,
            immutable: normalize_names(resource_type.as_str(), self.immutable)?,
            resource_type,
            primary_key,
            query,
        })
    }
}

fn normalize_names(resource_type: &str, names: Vec<String>) -> AppResult<BTreeSet<String>> {
    names
        .into_iter()
        .map(|name| {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(AppError::Validation(format!(
                    "resource '{resource_type}' declares an empty attribute name"
                )));
            }

            Ok(trimmed.to_owned())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::ResourceSchema;
    use crate::QueryFacet;

    #[test]
    fn schema_deduplicates_and_trims_names() {
        let schema = ResourceSchema::builder("user")
            .primary_key("uuid")
            .fillable(["username", " username ", "email"])
            .query(QueryFacet::Sort, ["username"])
            .query(QueryFacet::Sort, ["email"])
            .build()
            .unwrap_or_else(|_| unreachable!());

        assert_eq!(schema.primary_key(), "uuid");
        assert_eq!(schema.fillable().len(), 2);
        assert_eq!(schema.declared(QueryFacet::Sort).len(), 2);
        assert!(schema.declared(QueryFacet::Append).is_empty());
    }

    #[test]
    fn schema_rejects_empty_names() {
        let result = ResourceSchema::builder("user").hidden([""]).build();
        assert!(result.is_err());
    }

    #[test]
    fn schema_rejects_empty_primary_key() {
        let result = ResourceSchema::builder("user").primary_key("  ").build();
        assert!(result.is_err());
    }
}

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{QueryFacet, SortDirection};

/// Requested sort key with its direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRequest {
    /// Attribute name without direction prefix.
    pub field: String,
    /// Requested direction.
    pub direction: SortDirection,
}

impl SortRequest {
    /// Parses a `-name` / `name` transport value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (direction, field) = match value.strip_prefix('-') {
            Some(field) => (SortDirection::Desc, field),
            None => (SortDirection::Asc, value.strip_prefix('+').unwrap_or(value)),
        };

        if field.is_empty() {
            return None;
        }

        Some(Self {
            field: field.to_owned(),
            direction,
        })
    }
}

/// Parsed query-string request against one resource type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Requested sort keys in priority order.
    pub sorts: Vec<SortRequest>,
    /// Requested filters keyed by attribute name.
    pub filters: BTreeMap<String, String>,
    /// Requested selections keyed by resource type; the empty key is untyped.
    pub fields: BTreeMap<String, Vec<String>>,
    /// Requested relations to eager load.
    pub includes: Vec<String>,
    /// Requested computed attributes.
    pub appends: Vec<String>,
}

impl QueryRequest {
    /// Builds a request from decoded query-string pairs.
    ///
    /// Understands `sort=-name,email`, `filter[name]=x`, `fields[user]=id,name`,
    /// `fields=id`, `include=a,b` and `append=a`; other parameters are ignored.
    pub fn from_query_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = Self::default();

        for (key, value) in pairs {
            let key = key.as_ref().trim();
            let value = value.as_ref();

            if let Some(inner) = bracketed(key, "filter") {
                if !inner.is_empty() {
                    request.filters.insert(inner.to_owned(), value.to_owned());
                }
                continue;
            }

            if let Some(inner) = bracketed(key, "fields") {
                request
                    .fields
                    .entry(inner.to_owned())
                    .or_default()
                    .extend(split_list(value));
                continue;
            }

            match key {
                "sort" => request
                    .sorts
                    .extend(split_list(value).iter().filter_map(|item| SortRequest::parse(item))),
                "fields" => request
                    .fields
                    .entry(String::new())
                    .or_default()
                    .extend(split_list(value)),
                "include" => request.includes.extend(split_list(value)),
                "append" => request.appends.extend(split_list(value)),
                _ => {}
            }
        }

        request
    }

    /// Returns the selection for one resource type: the untyped `fields` list
    /// plus `fields[<resource_type>]`. Selections keyed by other types belong
    /// to related resources and are left out.
    #[must_use]
    pub fn selected_fields(&self, resource_type: &str) -> BTreeSet<String> {
        self.fields
            .iter()
            .filter(|(key, _)| key.is_empty() || key.as_str() == resource_type)
            .flat_map(|(_, names)| names.iter().cloned())
            .collect()
    }

    /// Normalizes the request to bare names per facet for one resource type.
    #[must_use]
    pub fn requested_facets(&self, resource_type: &str) -> RequestedFacets {
        let mut requested = RequestedFacets::default();
        requested.extend(
            QueryFacet::Sort,
            self.sorts.iter().map(|sort| sort.field.clone()),
        );
        requested.extend(QueryFacet::Filter, self.filters.keys().cloned());
        requested.extend(QueryFacet::Field, self.selected_fields(resource_type));
        requested.extend(QueryFacet::Include, self.includes.iter().cloned());
        requested.extend(QueryFacet::Append, self.appends.iter().cloned());
        requested
    }
}

/// Bare requested names per query facet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedFacets(BTreeMap<QueryFacet, BTreeSet<String>>);

impl RequestedFacets {
    /// Adds requested names to a facet; empty facets are not recorded.
    pub fn extend<I>(&mut self, facet: QueryFacet, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        let names: BTreeSet<String> = names
            .into_iter()
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect();
        if names.is_empty() {
            return;
        }

        self.0.entry(facet).or_default().extend(names);
    }

    /// Returns the requested names for a facet.
    #[must_use]
    pub fn get(&self, facet: QueryFacet) -> Option<&BTreeSet<String>> {
        self.0.get(&facet)
    }

    /// Iterates facets with at least one requested name.
    pub fn iter(&self) -> impl Iterator<Item = (QueryFacet, &BTreeSet<String>)> {
        self.0.iter().map(|(facet, names)| (*facet, names))
    }

    /// Returns whether nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(QueryFacet, Vec<String>)> for RequestedFacets {
    fn from_iter<T: IntoIterator<Item = (QueryFacet, Vec<String>)>>(iter: T) -> Self {
        let mut requested = Self::default();
        for (facet, names) in iter {
            requested.extend(facet, names);
        }
        requested
    }
}

fn bracketed<'a>(key: &'a str, name: &str) -> Option<&'a str> {
    key.strip_prefix(name)?
        .strip_prefix('[')?
        .strip_suffix(']')
        .map(str::trim)
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

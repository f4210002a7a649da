use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Sort direction for collection queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending sort direction.
    Asc,
    /// Descending sort direction.
    Desc,
}

impl SortDirection {
    /// Returns the stable transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// Matching strategy for a request filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Value must match exactly.
    Exact,
    /// Value must contain the filter text, case-insensitively.
    Partial,
}

/// Authorized filter clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterClause {
    /// Attribute name.
    pub field: String,
    /// Matching strategy.
    pub operator: FilterOperator,
    /// Raw filter text from the request.
    pub value: String,
}

/// Authorized sort clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    /// Attribute name.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

/// Server-side equality constraint, used for key lookups and ownership scopes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Attribute name.
    pub field: String,
    /// Required JSON value.
    pub value: Value,
}

/// Declarative collection query handed to the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionQuery {
    /// Target resource type.
    pub resource_type: String,
    /// Relations always eager loaded.
    pub with: Vec<String>,
    /// Requested relations to eager load.
    pub includes: Vec<String>,
    /// Selected attributes; empty selects everything.
    pub fields: Vec<String>,
    /// Computed attributes to add.
    pub appends: Vec<String>,
    /// Request filters.
    pub filters: Vec<FilterClause>,
    /// Sort clauses in priority order.
    pub sorts: Vec<SortClause>,
    /// Server-side equality constraints.
    pub constraints: Vec<Constraint>,
    /// Maximum number of rows.
    pub limit: Option<usize>,
}

impl CollectionQuery {
    /// Creates an unrestricted query over a resource type.
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            with: Vec::new(),
            includes: Vec::new(),
            fields: Vec::new(),
            appends: Vec::new(),
            filters: Vec::new(),
            sorts: Vec::new(),
            constraints: Vec::new(),
            limit: None,
        }
    }

    /// Adds an equality constraint.
    #[must_use]
    pub fn where_equals(mut self, field: impl Into<String>, value: Value) -> Self {
        self.constraints.push(Constraint {
            field: field.into(),
            value,
        });
        self
    }

    /// Limits the number of rows.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::CollectionQuery;

    #[test]
    fn where_equals_accumulates_constraints() {
        let query = CollectionQuery::new("user")
            .where_equals("uuid", json!("u-1"))
            .where_equals("owner", json!("alice"))
            .with_limit(1);

        assert_eq!(query.constraints.len(), 2);
        assert_eq!(query.limit, Some(1));
    }
}

//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod ability;
mod facet;
mod query;
mod request;
mod resource;
mod schema;

pub use ability::{AbilityName, studly_case};
pub use facet::{QueryFacet, ResourceAction, VisibilityFacet};
pub use query::{
    CollectionQuery, Constraint, FilterClause, FilterOperator, SortClause, SortDirection,
};
pub use request::{QueryRequest, RequestedFacets, SortRequest};
pub use resource::{Resource, ResourceRecord};
pub use schema::{ResourceSchema, ResourceSchemaBuilder};

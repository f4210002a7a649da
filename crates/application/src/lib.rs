//! Application services and ports.
//!
//! Resolves resource policies and gates the attributes and query values a
//! caller may see, edit and request.

#![forbid(unsafe_code)]

mod attribute_gate;
mod authorized_resource;
mod collection_qualifier;
mod gate;
mod policy;
mod policy_registry;
mod query_builder;
mod request_authorizer;
mod resource_ports;
mod resource_service;
mod rule_policy;
mod update_guard;

pub use attribute_gate::{AttributeGate, GateFacet, GateMode};
pub use authorized_resource::AuthorizedResource;
pub use collection_qualifier::qualify_collection;
pub use gate::{Gate, GateDecision, decide};
pub use policy::{BeforeDecision, ResourcePolicy};
pub use policy_registry::{PolicyRegistry, PolicyRegistryBuilder};
pub use query_builder::build_collection_query;
pub use request_authorizer::authorize_request;
pub use resource_ports::{ResourceCatalog, ResourceRepository};
pub use resource_service::ResourceService;
pub use rule_policy::{RulePolicy, RulePolicyBuilder};
pub use update_guard::guard_update;

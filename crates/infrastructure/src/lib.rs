//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_resource_repository;

pub use in_memory_resource_repository::{Appender, InMemoryResourceRepository, RelationLink};

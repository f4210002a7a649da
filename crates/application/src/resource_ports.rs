use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use restward_core::{AppError, AppResult};
use restward_domain::{CollectionQuery, ResourceRecord, ResourceSchema};

/// Repository port for resource records.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Executes an authorized collection query.
    async fn list(
        &self,
        schema: &Arc<ResourceSchema>,
        query: &CollectionQuery,
    ) -> AppResult<Vec<ResourceRecord>>;

    /// Loads a single record by primary key.
    async fn find(
        &self,
        schema: &Arc<ResourceSchema>,
        key: &str,
    ) -> AppResult<Option<ResourceRecord>>;

    /// Persists a new record and returns it as stored.
    async fn insert(&self, record: ResourceRecord) -> AppResult<ResourceRecord>;

    /// Persists pending changes of an existing record and returns it as stored.
    async fn update(&self, record: ResourceRecord) -> AppResult<ResourceRecord>;

    /// Deletes a record by primary key.
    async fn delete(&self, schema: &Arc<ResourceSchema>, key: &str) -> AppResult<()>;
}

/// Registered resource types and their schemas.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    schemas: BTreeMap<String, Arc<ResourceSchema>>,
}

impl ResourceCatalog {
    /// Registers a schema under its resource type, replacing earlier ones.
    #[must_use]
    pub fn with_schema(mut self, schema: ResourceSchema) -> Self {
        self.schemas.insert(
            schema.resource_type().as_str().to_owned(),
            Arc::new(schema),
        );
        self
    }

    /// Returns the schema of a registered resource type.
    pub fn schema(&self, resource_type: &str) -> AppResult<Arc<ResourceSchema>> {
        self.schemas
            .get(resource_type)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("resource type '{resource_type}'")))
    }

    /// Returns the registered resource type names.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use restward_core::AppError;
    use restward_domain::ResourceSchema;

    use super::ResourceCatalog;

    #[test]
    fn unknown_resource_type_is_not_found() {
        let catalog = ResourceCatalog::default().with_schema(
            ResourceSchema::builder("user")
                .build()
                .unwrap_or_else(|_| unreachable!()),
        );

        assert!(catalog.schema("user").is_ok());
        assert!(matches!(
            catalog.schema("invoice"),
            Err(AppError::NotFound(_))
        ));
        assert_eq!(catalog.resource_types().collect::<Vec<_>>(), vec!["user"]);
    }
}

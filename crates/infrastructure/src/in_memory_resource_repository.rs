use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use restward_application::ResourceRepository;
use restward_core::{AppError, AppResult};
use restward_domain::{CollectionQuery, Resource, ResourceRecord, ResourceSchema};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

mod query;

use query::{apply_query, key_string};

/// Computed attribute derived from a stored row.
pub type Appender = Arc<dyn Fn(&Map<String, Value>) -> Value + Send + Sync>;

/// One-to-many relation resolved by matching a foreign key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationLink {
    /// Resource type holding the related rows.
    pub target_type: String,
    /// Attribute on the related rows pointing back at the parent.
    pub foreign_key: String,
    /// Attribute on the parent row the foreign key refers to.
    pub local_key: String,
}

type Table = BTreeMap<String, Map<String, Value>>;

/// In-memory resource repository implementation.
#[derive(Default)]
pub struct InMemoryResourceRepository {
    tables: RwLock<HashMap<String, Table>>,
    relations: HashMap<(String, String), RelationLink>,
    appenders: HashMap<(String, String), Appender>,
}

impl InMemoryResourceRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a relation loadable through `with` and `include`.
    #[must_use]
    pub fn with_relation(
        mut self,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        link: RelationLink,
    ) -> Self {
        self.relations
            .insert((resource_type.into(), name.into()), link);
        self
    }

    /// Registers a computed attribute addable through `append`.
    #[must_use]
    pub fn with_appender<F>(
        mut self,
        resource_type: impl Into<String>,
        name: impl Into<String>,
        appender: F,
    ) -> Self
    where
        F: Fn(&Map<String, Value>) -> Value + Send + Sync + 'static,
    {
        self.appenders
            .insert((resource_type.into(), name.into()), Arc::new(appender));
        self
    }

    /// Stores rows as they are, bypassing authorization. Used for seeding.
    pub async fn seed(&self, schema: &ResourceSchema, rows: Vec<Value>) -> AppResult<usize> {
        let mut tables = self.tables.write().await;
        let table = tables
            .entry(schema.resource_type().as_str().to_owned())
            .or_default();

        let mut seeded = 0;
        for row in rows {
            let Value::Object(data) = row else {
                return Err(AppError::Validation(format!(
                    "seed rows for '{}' must be JSON objects",
                    schema.resource_type()
                )));
            };
            let key = data
                .get(schema.primary_key())
                .and_then(key_string)
                .ok_or_else(|| {
                    AppError::Validation(format!(
                        "seed row for '{}' is missing primary key '{}'",
                        schema.resource_type(),
                        schema.primary_key()
                    ))
                })?;

            table.insert(key, data);
            seeded += 1;
        }

        Ok(seeded)
    }

    fn record_key(record: &ResourceRecord) -> AppResult<String> {
        record.key().and_then(key_string).ok_or_else(|| {
            AppError::Validation(format!(
                "resource '{}' has no usable primary key",
                record.schema().resource_type()
            ))
        })
    }
}

#[async_trait]
impl ResourceRepository for InMemoryResourceRepository {
    async fn list(
        &self,
        schema: &Arc<ResourceSchema>,
        query: &CollectionQuery,
    ) -> AppResult<Vec<ResourceRecord>> {
        let tables = self.tables.read().await;
        let rows = apply_query(
            &tables,
            &self.relations,
            &self.appenders,
            schema.as_ref(),
            query,
        );

        debug!(
            resource_type = %schema.resource_type(),
            rows = rows.len(),
            filters = query.filters.len(),
            constraints = query.constraints.len(),
            "executed collection query"
        );

        rows.into_iter()
            .map(|row| ResourceRecord::from_persisted(schema.clone(), Value::Object(row)))
            .collect()
    }

    async fn find(
        &self,
        schema: &Arc<ResourceSchema>,
        key: &str,
    ) -> AppResult<Option<ResourceRecord>> {
        let tables = self.tables.read().await;
        tables
            .get(schema.resource_type().as_str())
            .and_then(|table| table.get(key))
            .map(|row| ResourceRecord::from_persisted(schema.clone(), Value::Object(row.clone())))
            .transpose()
    }

    async fn insert(&self, mut record: ResourceRecord) -> AppResult<ResourceRecord> {
        let schema = record.schema_handle().clone();
        if record.key().is_none_or(Value::is_null) {
            record.set_attribute(
                schema.primary_key(),
                Value::String(Uuid::new_v4().to_string()),
            );
        }

        let key = Self::record_key(&record)?;
        let now = Value::String(Utc::now().to_rfc3339());
        record.set_attribute("created_at", now.clone());
        record.set_attribute("updated_at", now);

        let mut tables = self.tables.write().await;
        let table = tables
            .entry(schema.resource_type().as_str().to_owned())
            .or_default();
        if table.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "resource '{}' with key '{key}' already exists",
                schema.resource_type()
            )));
        }

        table.insert(key, record.data().clone());
        record.sync_original();
        Ok(record)
    }

    async fn update(&self, mut record: ResourceRecord) -> AppResult<ResourceRecord> {
        let key = Self::record_key(&record)?;
        record.set_attribute("updated_at", Value::String(Utc::now().to_rfc3339()));

        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .get_mut(record.schema().resource_type().as_str())
            .and_then(|table| table.get_mut(&key))
        else {
            return Err(AppError::NotFound(format!(
                "resource '{}' with key '{key}'",
                record.schema().resource_type()
            )));
        };

        *row = record.data().clone();
        record.sync_original();
        Ok(record)
    }

    async fn delete(&self, schema: &Arc<ResourceSchema>, key: &str) -> AppResult<()> {
        let mut tables = self.tables.write().await;
        let removed = tables
            .get_mut(schema.resource_type().as_str())
            .and_then(|table| table.remove(key));

        if removed.is_none() {
            return Err(AppError::NotFound(format!(
                "resource '{}' with key '{key}'",
                schema.resource_type()
            )));
        }

        Ok(())
    }
}

use std::sync::Arc;

use restward_core::{AppError, AppResult, Caller};
use restward_domain::{QueryRequest, ResourceAction, ResourceRecord, ResourceSchema};
use serde_json::{Map, Value};
use tracing::info;

use crate::{
    AuthorizedResource, Gate, PolicyRegistry, ResourceCatalog, ResourceRepository,
    authorize_request, build_collection_query, guard_update, qualify_collection,
};

/// Application service for the authorized RESTful resource flow.
#[derive(Clone)]
pub struct ResourceService {
    repository: Arc<dyn ResourceRepository>,
    catalog: Arc<ResourceCatalog>,
    policies: Arc<PolicyRegistry>,
}

impl ResourceService {
    /// Creates a new resource service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ResourceRepository>,
        catalog: Arc<ResourceCatalog>,
        policies: Arc<PolicyRegistry>,
    ) -> Self {
        Self {
            repository,
            catalog,
            policies,
        }
    }

    /// Returns the registered resource catalog.
    #[must_use]
    pub fn catalog(&self) -> &ResourceCatalog {
        self.catalog.as_ref()
    }

    /// Lists the records the caller may see, shaped by the request.
    pub async fn list(
        &self,
        caller: Option<&Caller>,
        resource_type: &str,
        request: &QueryRequest,
    ) -> AppResult<Vec<Value>> {
        let schema = self.catalog.schema(resource_type)?;
        let gate = self.gate(caller);
        gate.authorize_action(resource_type, ResourceAction::ViewAll, None)
            .await?;

        let prototype =
            AuthorizedResource::new(ResourceRecord::prototype(schema.clone()), gate.clone());
        authorize_request(&request.requested_facets(resource_type), &prototype).await?;

        let query = build_collection_query(request, &prototype).await?;
        let query = qualify_collection(&gate, query, resource_type).await?;
        let records = self.repository.list(&schema, &query).await?;

        let mut items = Vec::with_capacity(records.len());
        for record in records {
            items.push(
                AuthorizedResource::new(record, gate.clone())
                    .visible_data()
                    .await?,
            );
        }

        Ok(items)
    }

    /// Returns one record, shaped by the request.
    pub async fn get(
        &self,
        caller: Option<&Caller>,
        resource_type: &str,
        key: &str,
        request: &QueryRequest,
    ) -> AppResult<Value> {
        let schema = self.catalog.schema(resource_type)?;
        let gate = self.gate(caller);

        let prototype =
            AuthorizedResource::new(ResourceRecord::prototype(schema.clone()), gate.clone());
        authorize_request(&request.requested_facets(resource_type), &prototype).await?;

        let query = build_collection_query(request, &prototype)
            .await?
            .where_equals(schema.primary_key(), Value::String(key.to_owned()))
            .with_limit(1);
        let record = self
            .repository
            .list(&schema, &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| not_found(&schema, key))?;

        let resource = AuthorizedResource::new(record, gate);
        resource
            .gate()
            .authorize_action(resource_type, ResourceAction::View, Some(resource.resource()))
            .await?;

        resource.visible_data().await
    }

    /// Creates a record from the payload keys the caller may edit.
    pub async fn create(
        &self,
        caller: Option<&Caller>,
        resource_type: &str,
        payload: &Value,
    ) -> AppResult<Value> {
        let schema = self.catalog.schema(resource_type)?;
        let gate = self.gate(caller);
        gate.authorize_action(resource_type, ResourceAction::Create, None)
            .await?;

        let record = ResourceRecord::new(schema, Value::Object(Map::new()))?;
        let mut resource = AuthorizedResource::new(record, gate.clone());
        resource.fill(payload).await?;

        let stored = self.repository.insert(resource.into_inner()).await?;
        info!(
            resource_type = %resource_type,
            subject = caller.map(Caller::subject),
            "created resource"
        );

        AuthorizedResource::new(stored, gate).visible_data().await
    }

    /// Applies the payload to an existing record after the update guard passes.
    pub async fn update(
        &self,
        caller: Option<&Caller>,
        resource_type: &str,
        key: &str,
        payload: &Value,
    ) -> AppResult<Value> {
        let schema = self.catalog.schema(resource_type)?;
        let gate = self.gate(caller);
        let record = self.load(&schema, key).await?;

        let mut resource = AuthorizedResource::new(record, gate.clone());
        gate.authorize_action(resource_type, ResourceAction::Update, Some(resource.resource()))
            .await?;

        resource.fill_for_update(payload)?;
        guard_update(&resource).await?;

        let stored = self.repository.update(resource.into_inner()).await?;
        info!(
            resource_type = %resource_type,
            key = %key,
            subject = caller.map(Caller::subject),
            "updated resource"
        );

        AuthorizedResource::new(stored, gate).visible_data().await
    }

    /// Deletes an existing record.
    pub async fn delete(
        &self,
        caller: Option<&Caller>,
        resource_type: &str,
        key: &str,
    ) -> AppResult<()> {
        let schema = self.catalog.schema(resource_type)?;
        let gate = self.gate(caller);
        let record = self.load(&schema, key).await?;

        gate.authorize_action(resource_type, ResourceAction::Delete, Some(&record))
            .await?;
        self.repository.delete(&schema, key).await?;

        info!(
            resource_type = %resource_type,
            key = %key,
            subject = caller.map(Caller::subject),
            "deleted resource"
        );

        Ok(())
    }

    fn gate(&self, caller: Option<&Caller>) -> Gate {
        Gate::for_caller(self.policies.clone(), caller.cloned())
    }

    async fn load(&self, schema: &Arc<ResourceSchema>, key: &str) -> AppResult<ResourceRecord> {
        self.repository
            .find(schema, key)
            .await?
            .ok_or_else(|| not_found(schema, key))
    }
}

fn not_found(schema: &ResourceSchema, key: &str) -> AppError {
    AppError::NotFound(format!(
        "resource '{}' with key '{key}'",
        schema.resource_type()
    ))
}

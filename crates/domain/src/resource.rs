use std::collections::BTreeSet;
use std::sync::Arc;

use restward_core::{AppError, AppResult};
use serde_json::{Map, Value};

use crate::ResourceSchema;

/// Entity exposed through the API and gated by its type's policy.
pub trait Resource: Send + Sync {
    /// Returns the caller-independent schema of the resource type.
    fn schema(&self) -> &ResourceSchema;

    /// Returns the current in-memory value of an attribute.
    fn attribute(&self, name: &str) -> Option<&Value>;

    /// Returns the value of an attribute as last loaded from storage.
    fn original(&self, name: &str) -> Option<&Value>;

    /// Returns attributes whose current value differs from the stored one.
    fn changed_attributes(&self) -> BTreeSet<String>;

    /// Returns whether the instance has unsaved attribute changes.
    fn is_dirty(&self) -> bool {
        !self.changed_attributes().is_empty()
    }

    /// Returns the current primary key value.
    fn key(&self) -> Option<&Value> {
        self.attribute(self.schema().primary_key())
    }
}

/// JSON-object resource instance with original-value tracking.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceRecord {
    schema: Arc<ResourceSchema>,
    attributes: Map<String, Value>,
    original: Map<String, Value>,
}

impl ResourceRecord {
    /// Creates an unsaved record; every attribute counts as changed.
    pub fn new(schema: Arc<ResourceSchema>, data: Value) -> AppResult<Self> {
        Ok(Self {
            attributes: into_object(schema.as_ref(), data)?,
            original: Map::new(),
            schema,
        })
    }

    /// Creates a clean record from values loaded from storage.
    pub fn from_persisted(schema: Arc<ResourceSchema>, data: Value) -> AppResult<Self> {
        let attributes = into_object(schema.as_ref(), data)?;
        Ok(Self {
            original: attributes.clone(),
            attributes,
            schema,
        })
    }

    /// Creates an empty instance used to evaluate type-level capabilities.
    #[must_use]
    pub fn prototype(schema: Arc<ResourceSchema>) -> Self {
        Self {
            schema,
            attributes: Map::new(),
            original: Map::new(),
        }
    }

    /// Returns the shared schema handle.
    #[must_use]
    pub fn schema_handle(&self) -> &Arc<ResourceSchema> {
        &self.schema
    }

    /// Sets one attribute without any gating.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: Value) {
        self.attributes.insert(name.into(), value);
    }

    /// Assigns payload keys contained in `allowed` and returns the dropped keys.
    pub fn fill(&mut self, payload: &Value, allowed: &BTreeSet<String>) -> AppResult<Vec<String>> {
        let object = payload.as_object().ok_or_else(|| {
            AppError::Validation(format!(
                "payload for resource '{}' must be a JSON object",
                self.schema.resource_type()
            ))
        })?;

        let mut dropped = Vec::new();
        for (key, value) in object {
            if allowed.contains(key.as_str()) {
                self.attributes.insert(key.clone(), value.clone());
            } else {
                dropped.push(key.clone());
            }
        }

        Ok(dropped)
    }

    /// Marks the current attribute values as persisted.
    pub fn sync_original(&mut self) {
        self.original = self.attributes.clone();
    }

    /// Returns all current attribute values.
    #[must_use]
    pub fn data(&self) -> &Map<String, Value> {
        &self.attributes
    }

    /// Returns current attribute values without the hidden ones.
    #[must_use]
    pub fn visible_data(&self, hidden: &BTreeSet<String>) -> Value {
        Value::Object(
            self.attributes
                .iter()
                .filter(|(key, _)| !hidden.contains(key.as_str()))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        )
    }
}

impl Resource for ResourceRecord {
    fn schema(&self) -> &ResourceSchema {
        self.schema.as_ref()
    }

    fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    fn original(&self, name: &str) -> Option<&Value> {
        self.original.get(name)
    }

    fn changed_attributes(&self) -> BTreeSet<String> {
        self.attributes
            .iter()
            .filter(|(key, value)| self.original.get(key.as_str()) != Some(*value))
            .map(|(key, _)| key.clone())
            .collect()
    }
}

fn into_object(schema: &ResourceSchema, data: Value) -> AppResult<Map<String, Value>> {
    match data {
        Value::Object(object) => Ok(object),
        _ => Err(AppError::Validation(format!(
            "resource '{}' data must be a JSON object",
            schema.resource_type()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use serde_json::json;

    use super::{Resource, ResourceRecord};
    use crate::ResourceSchema;

    fn user_schema() -> Arc<ResourceSchema> {
        Arc::new(
            ResourceSchema::builder("user")
                .primary_key("uuid")
                .fillable(["username", "comment"])
                .build()
                .unwrap_or_else(|_| unreachable!()),
        )
    }

    #[test]
    fn persisted_record_starts_clean() {
        let record = ResourceRecord::from_persisted(
            user_schema(),
            json!({"uuid": "u-1", "username": "alice"}),
        )
        .unwrap_or_else(|_| unreachable!());

        assert!(!record.is_dirty());
        assert_eq!(record.key(), Some(&json!("u-1")));
    }

    #[test]
    fn fill_respects_allowed_keys() {
        let mut record = ResourceRecord::from_persisted(
            user_schema(),
            json!({"uuid": "u-1", "username": "alice"}),
        )
        .unwrap_or_else(|_| unreachable!());
        let allowed = BTreeSet::from(["username".to_owned()]);

        let dropped = record
            .fill(&json!({"username": "bob", "password": "x"}), &allowed)
            .unwrap_or_default();

        assert_eq!(dropped, vec!["password".to_owned()]);
        assert_eq!(
            record.changed_attributes(),
            BTreeSet::from(["username".to_owned()])
        );
        assert_eq!(record.original("username"), Some(&json!("alice")));
    }

    #[test]
    fn sync_original_clears_dirty_state() {
        let mut record = ResourceRecord::new(user_schema(), json!({"username": "alice"}))
            .unwrap_or_else(|_| unreachable!());
        assert!(record.is_dirty());

        record.sync_original();
        assert!(!record.is_dirty());
    }

    #[test]
    fn visible_data_drops_hidden_attributes() {
        let record = ResourceRecord::from_persisted(
            user_schema(),
            json!({"uuid": "u-1", "password": "secret"}),
        )
        .unwrap_or_else(|_| unreachable!());

        let visible = record.visible_data(&BTreeSet::from(["password".to_owned()]));
        assert_eq!(visible, json!({"uuid": "u-1"}));
    }

    #[test]
    fn non_object_data_is_rejected() {
        assert!(ResourceRecord::new(user_schema(), json!([1, 2])).is_err());
    }
}

use serde::Serialize;
use serde_json::Value;

/// Health response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub resource_types: Vec<String>,
}

/// Collection response envelope.
#[derive(Debug, Serialize)]
pub struct ResourceCollectionResponse {
    pub data: Vec<Value>,
}

/// Single resource response envelope.
#[derive(Debug, Serialize)]
pub struct ResourceResponse {
    pub data: Value,
}

use axum::Json;
use axum::extract::{Extension, Path, RawQuery, State};
use axum::http::StatusCode;
use restward_domain::QueryRequest;
use serde_json::Value;

use crate::dto::{ResourceCollectionResponse, ResourceResponse};
use crate::error::ApiResult;
use crate::middleware::CallerContext;
use crate::state::AppState;

pub async fn list_resources_handler(
    State(state): State<AppState>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(resource_type): Path<String>,
    RawQuery(raw_query): RawQuery,
) -> ApiResult<Json<ResourceCollectionResponse>> {
    let request = query_request(raw_query.as_deref());
    let data = state
        .resource_service
        .list(caller.as_ref(), resource_type.as_str(), &request)
        .await?;

    Ok(Json(ResourceCollectionResponse { data }))
}

pub async fn get_resource_handler(
    State(state): State<AppState>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path((resource_type, key)): Path<(String, String)>,
    RawQuery(raw_query): RawQuery,
) -> ApiResult<Json<ResourceResponse>> {
    let request = query_request(raw_query.as_deref());
    let data = state
        .resource_service
        .get(caller.as_ref(), resource_type.as_str(), key.as_str(), &request)
        .await?;

    Ok(Json(ResourceResponse { data }))
}

pub async fn create_resource_handler(
    State(state): State<AppState>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path(resource_type): Path<String>,
    Json(payload): Json<Value>,
) -> ApiResult<(StatusCode, Json<ResourceResponse>)> {
    let data = state
        .resource_service
        .create(caller.as_ref(), resource_type.as_str(), &payload)
        .await?;

    Ok((StatusCode::CREATED, Json(ResourceResponse { data })))
}

pub async fn update_resource_handler(
    State(state): State<AppState>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path((resource_type, key)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> ApiResult<Json<ResourceResponse>> {
    let data = state
        .resource_service
        .update(
            caller.as_ref(),
            resource_type.as_str(),
            key.as_str(),
            &payload,
        )
        .await?;

    Ok(Json(ResourceResponse { data }))
}

pub async fn delete_resource_handler(
    State(state): State<AppState>,
    Extension(CallerContext(caller)): Extension<CallerContext>,
    Path((resource_type, key)): Path<(String, String)>,
) -> ApiResult<StatusCode> {
    state
        .resource_service
        .delete(caller.as_ref(), resource_type.as_str(), key.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

fn query_request(raw_query: Option<&str>) -> QueryRequest {
    let pairs = url::form_urlencoded::parse(raw_query.unwrap_or_default().as_bytes());
    QueryRequest::from_query_pairs(pairs)
}

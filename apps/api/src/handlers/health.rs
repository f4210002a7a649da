use axum::Json;
use axum::extract::State;

use crate::dto::HealthResponse;
use crate::state::AppState;

pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        resource_types: state
            .resource_service
            .catalog()
            .resource_types()
            .map(str::to_owned)
            .collect(),
    })
}

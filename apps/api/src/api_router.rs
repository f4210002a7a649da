use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::middleware::from_fn;
use axum::routing::get;
use restward_core::AppError;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::{
    CALLER_EMAIL_HEADER, CALLER_NAME_HEADER, CALLER_ROLES_HEADER, CALLER_SUBJECT_HEADER,
};
use crate::state::AppState;
use crate::{handlers, middleware};

const CORS_METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

pub fn build_router(app_state: AppState, frontend_url: &str) -> Result<Router, AppError> {
    let resource_routes = Router::new()
        .route(
            "/api/{resource_type}",
            get(handlers::resources::list_resources_handler)
                .post(handlers::resources::create_resource_handler),
        )
        .route(
            "/api/{resource_type}/{key}",
            get(handlers::resources::get_resource_handler)
                .put(handlers::resources::update_resource_handler)
                .patch(handlers::resources::update_resource_handler)
                .delete(handlers::resources::delete_resource_handler),
        )
        .route_layer(from_fn(middleware::resolve_caller));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(resource_routes)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(frontend_url)?)
        .with_state(app_state))
}

fn build_cors_layer(frontend_url: &str) -> Result<CorsLayer, AppError> {
    Ok(CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(frontend_url)
                .map_err(|error| AppError::Validation(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_methods(CORS_METHODS)
        .allow_headers([
            CONTENT_TYPE,
            HeaderName::from_static(CALLER_SUBJECT_HEADER),
            HeaderName::from_static(CALLER_NAME_HEADER),
            HeaderName::from_static(CALLER_EMAIL_HEADER),
            HeaderName::from_static(CALLER_ROLES_HEADER),
        ]))
}

use restward_application::ResourceService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub resource_service: ResourceService,
}

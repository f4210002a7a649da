use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use restward_core::Caller;

pub const CALLER_SUBJECT_HEADER: &str = "x-caller-subject";
pub const CALLER_NAME_HEADER: &str = "x-caller-name";
pub const CALLER_EMAIL_HEADER: &str = "x-caller-email";
pub const CALLER_ROLES_HEADER: &str = "x-caller-roles";

/// Caller resolved for the current request; `None` is anonymous.
#[derive(Debug, Clone, Default)]
pub struct CallerContext(pub Option<Caller>);

/// Resolves the caller from headers set by the trusted upstream gateway.
pub async fn resolve_caller(mut request: Request, next: Next) -> Response {
    let caller = caller_from_headers(request.headers());
    request.extensions_mut().insert(CallerContext(caller));
    next.run(request).await
}

pub fn caller_from_headers(headers: &HeaderMap) -> Option<Caller> {
    let subject = header_value(headers, CALLER_SUBJECT_HEADER)?;
    let display_name =
        header_value(headers, CALLER_NAME_HEADER).unwrap_or_else(|| subject.clone());
    let email = header_value(headers, CALLER_EMAIL_HEADER);
    let roles: Vec<String> = header_value(headers, CALLER_ROLES_HEADER)
        .map(|value| {
            value
                .split(',')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Some(Caller::new(subject, display_name, email).with_roles(roles))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

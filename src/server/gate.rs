//! Origin and token checks plus the CORS wrapping shared by both
//! endpoints.

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::app::AppData;
use crate::store::KvStore;

pub(super) const AUTH_HEADER: &str = "x-auth-token";

/// Attach CORS headers to every API response and answer OPTIONS
/// preflights without touching the handlers.
pub(super) async fn attach_cors<S: KvStore + 'static>(
    State(data): State<AppData<S>>,
    request: Request,
    next: Next,
) -> Response {
    let request_origin = caller_origin(request.headers());
    let allow_origin = allow_origin_value(&data.allowed_origin, &request_origin);

    if request.method() == Method::OPTIONS {
        return with_cors_headers(StatusCode::NO_CONTENT.into_response(), &allow_origin);
    }

    let response = next.run(request).await;
    with_cors_headers(response, &allow_origin)
}

fn with_cors_headers(mut response: Response, allow_origin: &str) -> Response {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(allow_origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, X-Auth-Token"),
    );
    response
}

/// `Origin` for cross-origin fetches, `Referer` for direct page loads.
pub(super) fn caller_origin(headers: &HeaderMap) -> String {
    headers
        .get(header::ORIGIN)
        .or_else(|| headers.get(header::REFERER))
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn allow_origin_value(allowed: &str, request_origin: &str) -> String {
    if allowed == "*" {
        "*".to_string()
    } else if !allowed.is_empty() {
        allowed.to_string()
    } else {
        request_origin.to_string()
    }
}

/// Origin gate for the visit endpoint. `*` admits everything (local
/// debugging); otherwise the caller must match the configured origin,
/// and loopback origins are always rejected so that an unconfigured
/// deployment cannot be fed from a local page.
pub(super) fn origin_allowed(allowed: &str, request_origin: &str) -> bool {
    if allowed == "*" {
        return true;
    }
    if !allowed.is_empty() && !request_origin.contains(allowed) {
        return false;
    }
    if request_origin.contains("localhost") || request_origin.contains("127.0.0.1") {
        return false;
    }
    true
}

/// Admin requests must present the configured dashboard token. No
/// configured token rejects everything.
pub(super) fn authorized(expected: &Option<String>, headers: &HeaderMap) -> bool {
    let Some(expected) = expected.as_deref().filter(|t| !t.is_empty()) else {
        return false;
    };

    headers
        .get(AUTH_HEADER)
        .and_then(|value| value.to_str().ok())
        == Some(expected)
}

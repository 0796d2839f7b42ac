//! CORS middleware
//!
//! Stamps the relay's access-control headers on every outbound response,
//! relayed upstream responses and error bodies included, and answers every
//! OPTIONS request directly with 204 before any routing or proxy work.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::AppState;

/// Methods advertised to browsers
const ALLOWED_METHODS: &str = "GET, POST, OPTIONS, PUT, DELETE";

/// Headers callers are allowed to send
const ALLOWED_HEADERS: &str = "Content-Type, Authorization, x-goog-api-key";

/// CORS middleware
///
/// The allow-origin header echoes the configured origin only when the
/// request's Origin matches it exactly; the remaining access-control
/// headers are stamped unconditionally.
pub async fn cors_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let allowed_origin = state.config.allowed_origin.as_str();
    let echo_origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|origin| origin == allowed_origin);

    // All OPTIONS traffic is answered at the boundary, never proxied
    if request.method() == Method::OPTIONS {
        debug!(path = %request.uri().path(), "Answering OPTIONS at the boundary");
        let mut response = StatusCode::NO_CONTENT.into_response();
        apply_cors_headers(&mut response, echo_origin, allowed_origin);
        return response;
    }

    let mut response = next.run(request).await;
    apply_cors_headers(&mut response, echo_origin, allowed_origin);
    response
}

/// Insert the access-control headers, overriding any relayed ones
fn apply_cors_headers(response: &mut Response, echo_origin: bool, allowed_origin: &str) {
    let headers = response.headers_mut();

    if echo_origin {
        if let Ok(value) = HeaderValue::from_str(allowed_origin) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
    } else {
        // A relayed allow-origin must not outlive the relay's own policy
        headers.remove(header::ACCESS_CONTROL_ALLOW_ORIGIN);
    }

    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
        HeaderValue::from_static("true"),
    );
}

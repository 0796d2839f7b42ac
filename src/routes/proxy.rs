//! Proxy dispatch endpoint
//!
//! Handles any method on the recognized model paths: extracts the caller's
//! credentials, resolves the owning project, rewrites the path onto the
//! upstream scheme and relays the round trip.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{OriginalUri, State},
    http::{HeaderMap, Method},
    response::Response,
};
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    proxy::credentials::{self, API_KEY_PARAM},
    proxy::path,
    AppState,
};

/// Dispatch a proxied request
///
/// Resolution only applies to header-borne keys. A header key that cannot
/// be resolved fails the request outright rather than silently falling back
/// to the generic upstream path; a caller using only the `key` query
/// parameter skips resolution and rides the generic path.
pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    method: Method,
    headers: HeaderMap,
    request: axum::extract::Request,
) -> AppResult<Response> {
    let start_time = Instant::now();
    let inbound_path = uri.path();

    let query_pairs = parse_query(uri.query());
    let query_key = query_pairs
        .iter()
        .find(|(name, _)| name == API_KEY_PARAM)
        .map(|(_, value)| value.as_str());

    let creds = credentials::extract_credentials(&headers, query_key);

    let project_id = match creds.resolution_key.as_deref() {
        Some(key) => match state.projects.get_or_resolve(key).await {
            Some(project_id) => Some(project_id),
            None => {
                warn!(
                    key = %credentials::fingerprint(key),
                    path = %inbound_path,
                    "API key did not resolve to a project"
                );
                return Err(AppError::UnresolvedCredential);
            }
        },
        None => None,
    };

    // The router only matches the recognized prefixes, so a rewrite failure
    // here means the path named no model
    let upstream_path = path::rewrite(inbound_path, project_id.as_deref()).ok_or_else(|| {
        AppError::UnrecognizedPath(format!("No upstream route for {}", inbound_path))
    })?;

    let query = upstream_query(&query_pairs, creds.upstream_key.as_deref());

    info!(
        method = %method,
        path = %inbound_path,
        upstream_path = %upstream_path,
        project = ?project_id,
        "Proxying request upstream"
    );

    let response = state
        .upstream
        .forward(
            method.clone(),
            &upstream_path,
            query.as_deref(),
            &headers,
            request.into_body(),
        )
        .await?;

    info!(
        method = %method,
        path = %inbound_path,
        status = %response.status(),
        duration_ms = %format!("{:.2}", start_time.elapsed().as_secs_f64() * 1000.0),
        "Upstream response relayed"
    );

    Ok(response)
}

/// Decode the inbound query string into ordered pairs
fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    match query {
        Some(query) => url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect(),
        None => Vec::new(),
    }
}

/// Re-encode the outbound query string. Caller parameters survive untouched
/// except `key`, which is replaced by the forwarded credential when one is
/// present.
fn upstream_query(pairs: &[(String, String)], upstream_key: Option<&str>) -> Option<String> {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    let mut has_pairs = false;

    for (name, value) in pairs {
        if name == API_KEY_PARAM {
            continue;
        }
        serializer.append_pair(name, value);
        has_pairs = true;
    }

    if let Some(key) = upstream_key {
        serializer.append_pair(API_KEY_PARAM, key);
        has_pairs = true;
    }

    has_pairs.then(|| serializer.finish())
}

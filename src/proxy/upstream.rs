//! Upstream forwarding
//!
//! Relays rewritten requests to the upstream platform. Bodies are streamed
//! in both directions and never buffered; upstream statuses and bodies come
//! back verbatim, with only hop-by-hop headers filtered out. Application
//! level errors from the upstream are relayed, not interpreted.

use axum::body::Body;
use axum::http::{header, HeaderName, Method, Response};
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, error, info, instrument};

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Headers copied onto the upstream request; everything else, including the
/// custom key header and any caller routing metadata, is dropped
const FORWARDED_HEADERS: [HeaderName; 3] = [CONTENT_TYPE, ACCEPT, AUTHORIZATION];

/// Headers scoped to a single connection that must not be relayed back
const HOP_BY_HOP_HEADERS: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Client for the upstream AI platform
pub struct UpstreamClient {
    client: reqwest::Client,
    base_url: String,
}

impl UpstreamClient {
    /// Create a new upstream client sharing the application HTTP client
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.upstream_url.clone(),
        }
    }

    /// Forward a request to the upstream platform.
    ///
    /// `path` must already be rewritten to the upstream scheme; `query` is
    /// appended as-is. The inbound method and body stream are preserved and
    /// the response is relayed verbatim apart from hop-by-hop headers.
    #[instrument(skip(self, query, inbound_headers, body), fields(method = %method, path = %path))]
    pub async fn forward(
        &self,
        method: Method,
        path: &str,
        query: Option<&str>,
        inbound_headers: &HeaderMap,
        body: Body,
    ) -> AppResult<Response<Body>> {
        // The query string may carry the caller's key, so log lines only
        // ever include the bare path
        let mut url = format!("{}{}", self.base_url, path);
        info!(url = %url, method = %method, "Forwarding request upstream");

        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }

        let headers = forwarded_headers(inbound_headers);

        let mut request_builder = self.client.request(method.clone(), &url).headers(headers);

        // Only attach a body for methods that carry one; it is streamed
        // straight through without buffering
        if method != Method::GET && method != Method::HEAD {
            request_builder =
                request_builder.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let response = request_builder.send().await.map_err(|e| {
            error!(path = %path, error = %e, "Upstream request failed in transit");
            e
        })?;

        debug!(path = %path, status = %response.status(), "Upstream responded");

        relay_response(response)
    }
}

/// Copy the explicit allow-list of headers from the inbound request
fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for header_name in FORWARDED_HEADERS {
        if let Some(value) = inbound.get(&header_name) {
            headers.insert(header_name, value.clone());
        }
    }

    headers
}

/// Copy upstream response headers, filtering out hop-by-hop headers
fn relayed_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in upstream {
        if !HOP_BY_HOP_HEADERS.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    headers
}

/// Convert an upstream reqwest response into an axum response, streaming
/// the body through untouched
fn relay_response(response: reqwest::Response) -> AppResult<Response<Body>> {
    let mut builder = Response::builder().status(response.status());

    if let Some(headers) = builder.headers_mut() {
        *headers = relayed_headers(response.headers());
    }

    let body = Body::from_stream(response.bytes_stream());

    builder
        .body(body)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to build relayed response: {}", e)))
}

//! Credential extraction
//!
//! Callers can supply their API key through the custom key header, a
//! standard Authorization header, or the `key` query parameter. The key
//! forwarded upstream follows that priority order; identity resolution
//! only ever considers header-borne keys.

use axum::http::{header, HeaderMap};
use sha2::{Digest, Sha256};

/// Custom header carrying the API key
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Query parameter carrying the API key
pub const API_KEY_PARAM: &str = "key";

/// Credentials extracted from an inbound request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCredentials {
    /// Key attached to the upstream call, from header or query
    pub upstream_key: Option<String>,
    /// Key used for identity resolution, from a header only
    pub resolution_key: Option<String>,
}

/// Extract credentials from the request headers and the `key` query
/// parameter. Empty values count as absent.
pub fn extract_credentials(headers: &HeaderMap, query_key: Option<&str>) -> RequestCredentials {
    let header_key = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .map(strip_bearer)
                .filter(|value| !value.is_empty())
        })
        .map(str::to_owned);

    let upstream_key = header_key.clone().or_else(|| {
        query_key
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
    });

    RequestCredentials {
        upstream_key,
        resolution_key: header_key,
    }
}

/// Strip an optional `Bearer ` prefix from an Authorization value
fn strip_bearer(value: &str) -> &str {
    value.strip_prefix("Bearer ").unwrap_or(value)
}

/// Short, stable fingerprint of a credential for log lines. Raw keys must
/// never reach the logs.
pub fn fingerprint(credential: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credential.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..8].to_string()
}

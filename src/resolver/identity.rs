//! Identity resolution against the upstream platform
//!
//! Maps an opaque API key to the project that owns it. The upstream names
//! the owning project in its error payloads; the resolver issues a single
//! probe generation request and scrapes a `projects/<id>` reference out of
//! the reply.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::proxy::credentials::fingerprint;
use crate::proxy::path::UPSTREAM_API_VERSION;

/// Marker the upstream includes when the API key itself is rejected
const INVALID_KEY_MARKER: &str = "api key not valid";

/// Project reference anywhere in an error message
static PROJECT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"projects/([a-zA-Z0-9_-]+)").unwrap());

/// Stricter variant requiring a path separator after the id, applied to the
/// raw body of not-found responses where the reference usually sits in the
/// error details rather than the message
static SCOPED_PROJECT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"projects/([a-zA-Z0-9_-]+)/").unwrap());

/// Resolves a caller credential to the upstream project that owns it
#[async_trait]
pub trait ResolveProject: Send + Sync {
    /// Resolve `api_key` to a project id, or `None` when the key cannot be
    /// mapped. Implementations must not fail louder than `None`.
    async fn resolve(&self, api_key: &str) -> Option<String>;
}

/// Identity resolver backed by a probe call to the upstream platform
pub struct IdentityResolver {
    client: reqwest::Client,
    base_url: String,
    probe_model: String,
}

impl IdentityResolver {
    /// Create a new resolver sharing the application HTTP client
    pub fn new(client: reqwest::Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.upstream_url.clone(),
            probe_model: config.probe_model.clone(),
        }
    }

    /// Minimal generation request body; only the error payload of the
    /// reply is ever inspected
    fn probe_body() -> Value {
        json!({
            "contents": [{ "role": "user", "parts": [{ "text": "ping" }] }]
        })
    }
}

#[async_trait]
impl ResolveProject for IdentityResolver {
    #[instrument(skip_all, fields(key = %fingerprint(api_key)))]
    async fn resolve(&self, api_key: &str) -> Option<String> {
        // Generic (non-project-scoped) path so the upstream has to name the
        // project itself in its reply
        let url = format!(
            "{}/{}/publishers/google/models/{}:generateContent",
            self.base_url, UPSTREAM_API_VERSION, self.probe_model
        );

        let response = match self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&Self::probe_body())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Probe request failed to reach upstream");
                return None;
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to read probe response body");
                return None;
            }
        };

        debug!(status = %status, body_len = body.len(), "Probe response received");
        extract_project_id(status, &body)
    }
}

/// Scrape a project id out of a probe response.
///
/// The body is parsed as JSON and the `error.message` string (or the raw
/// body when no message is present) is scanned for a `projects/<id>`
/// reference. Not-found responses get a second chance with a stricter
/// pattern over the raw body. A body that is not JSON resolves nothing.
fn extract_project_id(status: StatusCode, body: &str) -> Option<String> {
    let parsed: Value = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(error = %e, "Probe response is not valid JSON");
            return None;
        }
    };

    let message = parsed
        .pointer("/error/message")
        .and_then(Value::as_str)
        .unwrap_or(body);

    if status == StatusCode::BAD_REQUEST && message.to_lowercase().contains(INVALID_KEY_MARKER) {
        debug!("Upstream reports the API key as invalid");
        return None;
    }

    if let Some(captures) = PROJECT_PATTERN.captures(message) {
        return Some(captures[1].to_string());
    }

    if status == StatusCode::NOT_FOUND {
        if let Some(captures) = SCOPED_PROJECT_PATTERN.captures(body) {
            return Some(captures[1].to_string());
        }
    }

    None
}

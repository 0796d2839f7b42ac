//! Vertex Relay - edge proxy for Gemini-style model requests
//!
//! This library provides the core functionality for the relay server.
//! Inbound model requests are rewritten onto the upstream platform's
//! publisher path scheme, scoped to the project owning the caller's API
//! key, and relayed with bodies streaming through untouched.

pub mod config;
pub mod error;
pub mod middleware;
pub mod proxy;
pub mod resolver;
pub mod routes;

use std::sync::Arc;

use anyhow::Result;

pub use crate::config::Config;
pub use crate::proxy::UpstreamClient;
pub use crate::resolver::{IdentityResolver, ProjectCache, ResolveProject};

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    /// Credential to project memoization in front of the identity resolver
    pub projects: Arc<ProjectCache>,
    /// Client for the upstream platform round trips
    pub upstream: Arc<UpstreamClient>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        // HTTP client with connection pooling, shared by the resolver and
        // the forwarding path. No client-wide timeout: relayed calls may
        // legitimately stream for a long time.
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(100)
            .build()?;

        let resolver = Arc::new(IdentityResolver::new(http_client.clone(), &config));
        let projects = Arc::new(ProjectCache::new(resolver));
        let upstream = Arc::new(UpstreamClient::new(http_client, &config));

        Ok(Self {
            config,
            projects,
            upstream,
        })
    }
}

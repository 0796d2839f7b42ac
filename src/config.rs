//! Configuration management for Vertex Relay
//!
//! Configuration is loaded from environment variables. Every variable has a
//! default, so the relay starts with no environment at all.

use anyhow::{Context, Result};
use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Base URL of the upstream AI platform
    pub upstream_url: String,
    /// Model name used for identity-resolution probe calls
    pub probe_model: String,

    /// Origin allowed to call the relay from a browser
    pub allowed_origin: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("RELAY_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid RELAY_PORT")?,

            upstream_url: env::var("UPSTREAM_URL")
                .unwrap_or_else(|_| "https://aiplatform.googleapis.com".to_string()),
            probe_model: env::var("PROBE_MODEL")
                .unwrap_or_else(|_| "gemini-1.0-pro".to_string()),

            allowed_origin: env::var("ALLOWED_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        })
    }
}

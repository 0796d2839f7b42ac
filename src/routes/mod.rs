//! HTTP routes for Vertex Relay
//!
//! Two wildcard model routes are the relay's entire public surface. Every
//! other path, `/health` included, answers 404 with a JSON error body for
//! any method.

pub mod proxy;

use std::sync::Arc;

use axum::{extract::OriginalUri, middleware, routing::any, Router};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::{error::AppError, middleware::cors::cors_middleware, AppState};

/// Create the main application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1beta/models/*rest", any(proxy::dispatch))
        .route("/v1/models/*rest", any(proxy::dispatch))
        .fallback(not_found)
        // Global middleware (applied to all routes)
        // Middleware is applied in reverse order (last applied runs first),
        // so the CORS boundary sees every request before tracing and routing
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(state.clone(), cors_middleware))
        .with_state(state)
}

/// Fallback for every path outside the relay convention, any method
async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    debug!(path = %uri.path(), "No route for path");
    AppError::UnrecognizedPath(format!("No upstream route for {}", uri.path()))
}

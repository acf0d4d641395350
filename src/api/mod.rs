//! REST API surface
//!
//! Thin axum binding over [`SearchGateway`]: request decoding, response
//! envelopes and error-to-status mapping. No search logic lives here.

use std::sync::Arc;

use axum::{routing::get, Extension, Json, Router};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::gateway::SearchGateway;

pub mod error;
pub mod search_routes;

pub use error::AppError;
pub use search_routes::create_search_router;

/// Build the full router: search endpoints, health check, tracing and CORS.
pub fn build_router(gateway: Arc<SearchGateway>) -> Router {
    create_search_router()
        .route("/api/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .layer(Extension(gateway))
}

/// GET /api/health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{make_span_with_request_id, request_id_middleware};

pub mod cells;
pub mod properties;
pub mod rankings;
pub mod recommendations;
pub mod state;

pub use state::{AppState, Collaborators};

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/recommend", post(recommendations::recommend))
        .route("/property/cells", post(cells::query_cells))
        .route("/property/:id", get(properties::get_property))
        .route("/rankings/:neighborhood_id", get(rankings::top_k))
        .with_state(state)
        // Outermost first: the request id exists before the trace span is made.
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id)),
        )
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

//! API Routes
//!
//! Configures the Axum router for the demo service.

use axum::{middleware::from_fn_with_state, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    create_item, delete_item, get_item, health_handler, list_items, stats_handler, update_item,
    AppState,
};
use super::layer::cache_layer;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /items`, `POST /items` - List or create items
/// - `GET|PUT|DELETE /items/:id` - Read, replace or delete one item
/// - `GET /stats` - Controller statistics
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - Cache: serves `/items` reads from the store, invalidates on writes
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route(
            "/items/:id",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(from_fn_with_state(state.clone(), cache_layer))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

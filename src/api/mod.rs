//! API Module
//!
//! Demo HTTP service showing the cache engine in front of real routes.
//!
//! # Endpoints
//! - `GET /items`, `POST /items` - List or create items (list is cached)
//! - `GET /items/:id` - Fetch an item (cached)
//! - `PUT /items/:id`, `DELETE /items/:id` - Mutate an item (invalidates `/items*`)
//! - `GET /stats` - Controller statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod layer;
pub mod routes;

pub use handlers::*;
pub use layer::{cache_layer, CACHE_STATUS_HEADER};
pub use routes::create_router;

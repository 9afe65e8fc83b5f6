//! Response Cache - HTTP response caching engine
//!
//! Stores HTTP responses keyed by request, with a bounded in-memory store
//! (LRU eviction, lazy TTL expiry) or a Redis-backed store, a controller that
//! decides cacheability and drives invalidation, and a demo axum service.

pub mod api;
pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;

pub use api::{create_router, AppState};
pub use cache::{BoundedMemoryStore, MemoryStoreConfig, RemoteStore, RemoteStoreConfig, Store};
pub use config::{BackendKind, Config};
pub use controller::{CachePolicy, Controller, ControllerConfig, InvalidationPolicy};
pub use error::{CacheError, Result};

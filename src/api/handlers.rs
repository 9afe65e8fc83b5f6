//! API Handlers
//!
//! Request handlers for the demo item service. Handlers know nothing about
//! caching; the cache layer in front of them does.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::cache::Store;
use crate::controller::{path_key, CachePolicy, Controller, InvalidationPolicy};
use crate::error::{CacheError, Result};
use crate::models::{CreateItemRequest, HealthResponse, ItemResponse, StatsResponse};

/// Route templates whose cached responses a mutating `/items` request drops.
pub const ITEM_INVALIDATION_PATHS: [&str; 1] = ["/items"];

/// In-memory item table backing the demo routes.
#[derive(Debug, Default)]
pub struct ItemTable {
    next_id: u64,
    items: BTreeMap<u64, ItemResponse>,
}

impl ItemTable {
    fn insert(&mut self, req: CreateItemRequest) -> ItemResponse {
        self.next_id += 1;
        let item = ItemResponse {
            id: self.next_id,
            name: req.name,
            description: req.description,
        };
        self.items.insert(item.id, item.clone());
        item
    }
}

/// Application state shared across all handlers and the cache layer.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<Controller>,
    pub store: Arc<dyn Store>,
    pub items: Arc<RwLock<ItemTable>>,
    /// Applied to cacheable `/items` reads; keys start with the request path
    /// so pattern invalidation reaches them on every backend
    pub cache_policy: CachePolicy,
    /// Applied to mutating `/items` requests
    pub invalidation: InvalidationPolicy,
}

impl AppState {
    /// Creates state with a default controller over `store`.
    ///
    /// Fails with [`CacheError::Configuration`] when `max_age` is zero.
    pub fn new(store: Arc<dyn Store>, max_age: u64) -> Result<Self> {
        Self::with_controller(Controller::new(), store, max_age)
    }

    pub fn with_controller(
        controller: Controller,
        store: Arc<dyn Store>,
        max_age: u64,
    ) -> Result<Self> {
        Ok(Self {
            controller: Arc::new(controller),
            store,
            items: Arc::new(RwLock::new(ItemTable::default())),
            cache_policy: CachePolicy::new(max_age)?.with_key_func(path_key),
            invalidation: InvalidationPolicy::from_templates(&ITEM_INVALIDATION_PATHS)?,
        })
    }
}

/// Handler for GET /items
pub async fn list_items(State(state): State<AppState>) -> Json<Vec<ItemResponse>> {
    let table = state.items.read().await;
    Json(table.items.values().cloned().collect())
}

/// Handler for GET /items/:id
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ItemResponse>> {
    let table = state.items.read().await;
    table
        .items
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| CacheError::NotFound(format!("item {id}")))
}

/// Handler for POST /items
pub async fn create_item(
    State(state): State<AppState>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>)> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let mut table = state.items.write().await;
    let item = table.insert(req);
    Ok((StatusCode::CREATED, Json(item)))
}

/// Handler for PUT /items/:id
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(req): Json<CreateItemRequest>,
) -> Result<Json<ItemResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let mut table = state.items.write().await;
    let item = table
        .items
        .get_mut(&id)
        .ok_or_else(|| CacheError::NotFound(format!("item {id}")))?;
    item.name = req.name;
    item.description = req.description;
    Ok(Json(item.clone()))
}

/// Handler for DELETE /items/:id
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode> {
    let mut table = state.items.write().await;
    table
        .items
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| CacheError::NotFound(format!("item {id}")))
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.controller.stats();
    let entries = state.store.entry_count().await;
    Json(StatsResponse::new(&stats, entries))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.store.backend_name()))
}

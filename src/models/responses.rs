//! Response DTOs for the demo service
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::{Deserialize, Serialize};

use crate::cache::CacheStats;

/// A stored item (GET /items/:id, POST /items)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Cached responses served
    pub hits: u64,
    /// Lookups that found nothing
    pub misses: u64,
    /// Responses written to the store
    pub stores: u64,
    /// Responses rejected as non-cacheable
    pub skipped: u64,
    /// Invalidation patterns dispatched
    pub invalidations: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Current entry count, when the backend can report it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
}

impl StatsResponse {
    /// Creates a new StatsResponse from controller statistics
    pub fn new(stats: &CacheStats, entries: Option<usize>) -> Self {
        Self {
            hits: stats.hits,
            misses: stats.misses,
            stores: stats.stores,
            skipped: stats.skipped,
            invalidations: stats.invalidations,
            hit_rate: stats.hit_rate(),
            entries,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Active cache backend
    pub backend: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(backend: impl Into<String>) -> Self {
        Self {
            status: "healthy".to_string(),
            backend: backend.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    /// Creates a new ErrorResponse
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

//! Data model for the response cache
//!
//! Request/response snapshots and metadata form the unit of storage; the
//! request and response DTOs are used by the demo HTTP service.

pub mod metadata;
pub mod requests;
pub mod responses;
pub mod snapshot;

// Re-export commonly used types
pub use metadata::{Metadata, StoredRecord};
pub use requests::CreateItemRequest;
pub use responses::{ErrorResponse, HealthResponse, ItemResponse, StatsResponse};
pub use snapshot::{Headers, RequestSnapshot, ResponseSnapshot};

//! Cache metadata and the stored record triple

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::snapshot::{RequestSnapshot, ResponseSnapshot};

// == Metadata ==
/// Per-record metadata.
///
/// Well-known fields are typed; anything else a caller attaches lives in
/// `extra` and is persisted alongside them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// TTL in seconds; `None` falls back to the store default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,
    /// Set by the store when the record is written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_time: Option<DateTime<Utc>>,
    /// Set by the controller when the response is accepted for caching
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Metadata {
    /// Metadata carrying only a TTL.
    pub fn with_ttl(ttl: Option<u64>) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }
}

// == Stored Record ==
/// The unit of storage: response, originating request and metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub response: ResponseSnapshot,
    pub request: RequestSnapshot,
    pub metadata: Metadata,
}

impl StoredRecord {
    pub fn new(response: ResponseSnapshot, request: RequestSnapshot, metadata: Metadata) -> Self {
        Self {
            response,
            request,
            metadata,
        }
    }
}

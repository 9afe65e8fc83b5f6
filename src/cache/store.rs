//! Store contract
//!
//! The uniform interface every cache backend implements. Stores know nothing
//! about caching policy; they persist and return [`StoredRecord`]s.

use async_trait::async_trait;

use crate::cache::PathMatcher;
use crate::error::Result;
use crate::models::{Metadata, RequestSnapshot, ResponseSnapshot, StoredRecord};

/// A cache backend.
///
/// Misses of every kind (never stored, expired, removed, undecodable) are
/// reported as `Ok(None)` from [`Store::retrieve`]; `Err` is reserved for
/// transport failures and use after [`Store::close`].
#[async_trait]
pub trait Store: Send + Sync {
    /// Persists the record under `key`, fully replacing any previous record.
    async fn store(
        &self,
        key: &str,
        response: ResponseSnapshot,
        request: RequestSnapshot,
        metadata: Metadata,
    ) -> Result<()>;

    /// Returns the record if present and unexpired.
    async fn retrieve(&self, key: &str) -> Result<Option<StoredRecord>>;

    /// Removes every record whose request path matches `pattern`.
    async fn remove(&self, pattern: &PathMatcher) -> Result<()>;

    /// Drops every record and refuses further writes.
    async fn close(&self) -> Result<()>;

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;

    /// Number of live records, if the backend can count them cheaply.
    async fn entry_count(&self) -> Option<usize> {
        None
    }
}

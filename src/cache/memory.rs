//! Bounded in-memory store
//!
//! Records live in a map guarded, together with the LRU order and the expiry
//! index, by one async mutex. Expiry is lazy: a record is checked when it is
//! read, and a throttled sweep runs from inside `store` at most once per
//! `expiry_check_interval`. Eviction is batched: nothing is evicted until
//! the store grows past `cleanup_threshold`, then up to `cleanup_batch_size`
//! of the least recently used records go at once.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::{Clock, LruTracker, PathMatcher, Store, SystemClock};
use crate::error::{CacheError, Result};
use crate::models::{Metadata, RequestSnapshot, ResponseSnapshot, StoredRecord};

/// Default interval between expiry sweeps triggered by writes.
pub const DEFAULT_EXPIRY_CHECK_INTERVAL: Duration = Duration::from_secs(60);

// == Configuration ==
/// Construction parameters for [`BoundedMemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryStoreConfig {
    /// Target maximum number of records
    pub max_size: usize,
    /// Default TTL in seconds for records without their own
    pub ttl: Option<u64>,
    /// Minimum time between write-triggered expiry sweeps
    pub expiry_check_interval: Duration,
}

impl MemoryStoreConfig {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn with_expiry_check_interval(mut self, interval: Duration) -> Self {
        self.expiry_check_interval = interval;
        self
    }
}

impl Default for MemoryStoreConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            ttl: None,
            expiry_check_interval: DEFAULT_EXPIRY_CHECK_INTERVAL,
        }
    }
}

// == Counters ==
/// Record count plus removal counters of a [`BoundedMemoryStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub entries: usize,
    /// Records dropped by LRU cleanup
    pub evictions: u64,
    /// Records dropped because their TTL elapsed
    pub expirations: u64,
}

#[derive(Debug, Default)]
struct Inner {
    records: HashMap<String, StoredRecord>,
    lru: LruTracker,
    /// Absolute expiry (Unix ms) for every record with an effective TTL
    expiry: HashMap<String, u64>,
    last_sweep_ms: u64,
    evictions: u64,
    expirations: u64,
    closed: bool,
}

impl Inner {
    fn pop(&mut self, key: &str) -> Option<StoredRecord> {
        self.lru.remove(key);
        self.expiry.remove(key);
        self.records.remove(key)
    }

    fn is_expired(&self, key: &str, now_ms: u64) -> bool {
        self.expiry
            .get(key)
            .is_some_and(|&expires_at| now_ms > expires_at)
    }
}

// == Bounded Memory Store ==
/// Process-local store with LRU eviction and lazy TTL expiry.
#[derive(Debug)]
pub struct BoundedMemoryStore {
    inner: Mutex<Inner>,
    max_size: usize,
    default_ttl: Option<u64>,
    cleanup_batch_size: usize,
    cleanup_threshold: usize,
    expiry_check_interval_ms: u64,
    clock: Arc<dyn Clock>,
}

impl BoundedMemoryStore {
    // == Constructor ==
    /// Creates a store reading wall-clock time.
    ///
    /// Fails with [`CacheError::Configuration`] when `max_size` or `ttl` is zero.
    pub fn new(config: MemoryStoreConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a store reading time from `clock`.
    pub fn with_clock(config: MemoryStoreConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.max_size == 0 {
            return Err(CacheError::Configuration(
                "max_size must be positive".to_string(),
            ));
        }
        if config.ttl == Some(0) {
            return Err(CacheError::Configuration("TTL must be positive".to_string()));
        }

        let max_size = config.max_size;
        Ok(Self {
            inner: Mutex::new(Inner::default()),
            max_size,
            default_ttl: config.ttl,
            cleanup_batch_size: (max_size / 10).max(1),
            cleanup_threshold: max_size + (max_size / 20).max(1),
            expiry_check_interval_ms: config.expiry_check_interval.as_millis() as u64,
            clock,
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Records removed per LRU cleanup pass, at most.
    pub fn cleanup_batch_size(&self) -> usize {
        self.cleanup_batch_size
    }

    /// Size above which an LRU cleanup pass runs.
    pub fn cleanup_threshold(&self) -> usize {
        self.cleanup_threshold
    }

    /// Number of records currently held, expired-but-unswept included.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns `true` if a record is held for `key`, without touching recency.
    pub async fn contains(&self, key: &str) -> bool {
        self.inner.lock().await.records.contains_key(key)
    }

    pub async fn stats(&self) -> MemoryStoreStats {
        let inner = self.inner.lock().await;
        MemoryStoreStats {
            entries: inner.records.len(),
            evictions: inner.evictions,
            expirations: inner.expirations,
        }
    }

    // == Expiry Sweep ==
    /// Drops every expired record, unless a sweep ran within the interval.
    fn sweep_expired(&self, inner: &mut Inner, now_ms: u64) {
        if now_ms.saturating_sub(inner.last_sweep_ms) < self.expiry_check_interval_ms {
            return;
        }
        inner.last_sweep_ms = now_ms;

        let expired: Vec<String> = inner
            .expiry
            .iter()
            .filter(|(_, &expires_at)| now_ms > expires_at)
            .map(|(key, _)| key.clone())
            .collect();
        if expired.is_empty() {
            return;
        }

        for key in &expired {
            inner.pop(key);
        }
        inner.expirations += expired.len() as u64;
        debug!("Removed {} expired entries from cache", expired.len());
    }

    // == LRU Cleanup ==
    /// Evicts a batch of least recently used records once past the threshold.
    fn evict_lru(&self, inner: &mut Inner) {
        let size = inner.records.len();
        if size <= self.cleanup_threshold {
            return;
        }

        let to_remove = self.cleanup_batch_size.min(size - self.max_size);
        let mut evicted = 0;
        while evicted < to_remove {
            let Some(key) = inner.lru.pop_oldest() else {
                break;
            };
            inner.expiry.remove(&key);
            inner.records.remove(&key);
            evicted += 1;
        }
        inner.evictions += evicted as u64;
        debug!("Evicted {} entries from cache by LRU", evicted);
    }
}

#[async_trait]
impl Store for BoundedMemoryStore {
    async fn store(
        &self,
        key: &str,
        response: ResponseSnapshot,
        request: RequestSnapshot,
        mut metadata: Metadata,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return Err(CacheError::Closed);
        }

        let now_ms = self.clock.now_ms();
        metadata.write_time = DateTime::<Utc>::from_timestamp_millis(now_ms as i64);
        let effective_ttl = metadata.ttl.or(self.default_ttl);

        // Re-insertion must land at the LRU tail with no stale expiry
        if inner.pop(key).is_some() {
            info!("Entry {} overwritten", key);
        }

        inner
            .records
            .insert(key.to_string(), StoredRecord::new(response, request, metadata));
        inner.lru.touch(key);
        if let Some(ttl) = effective_ttl {
            inner
                .expiry
                .insert(key.to_string(), now_ms.saturating_add(ttl.saturating_mul(1000)));
        }

        self.sweep_expired(&mut inner, now_ms);
        self.evict_lru(&mut inner);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<StoredRecord>> {
        let mut inner = self.inner.lock().await;
        if !inner.records.contains_key(key) {
            return Ok(None);
        }

        if inner.is_expired(key, self.clock.now_ms()) {
            inner.pop(key);
            inner.expirations += 1;
            debug!("Entry {} removed from cache - TTL expired", key);
            return Ok(None);
        }

        inner.lru.touch(key);
        Ok(inner.records.get(key).cloned())
    }

    async fn remove(&self, pattern: &PathMatcher) -> Result<()> {
        let mut inner = self.inner.lock().await;

        let matching: Vec<String> = inner
            .records
            .iter()
            .filter(|(_, record)| pattern.matches(&record.request.path))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &matching {
            inner.pop(key);
        }
        debug!(
            "Removed {} entries from cache by pattern {}",
            matching.len(),
            pattern
        );
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.records.clear();
        inner.lru.clear();
        inner.expiry.clear();
        inner.closed = true;
        debug!("Cache storage cleared");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn entry_count(&self) -> Option<usize> {
        Some(self.len().await)
    }
}

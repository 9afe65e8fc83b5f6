//! Remote key-value store adapter
//!
//! [`RemoteStore`] keeps serialized records in a networked key-value service
//! under `"{namespace}:{key}"`. Expiry is delegated to the service's native
//! TTL, so no local bookkeeping is kept. [`RedisBackend`] is the production
//! backend; anything implementing [`KvBackend`] can stand in for it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use tracing::{debug, info, warn};

use crate::cache::matcher::escape_glob;
use crate::cache::{JsonSerializer, PathMatcher, Serializer, Store};
use crate::error::{CacheError, Result};
use crate::models::{Metadata, RequestSnapshot, ResponseSnapshot, StoredRecord};

/// Keys requested per SCAN round trip.
const SCAN_BATCH: usize = 100;

// == Backend Contract ==
/// The handful of key-value operations the remote store relies on.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool>;

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Writes `value`, expiring after `expiry_secs` when given.
    async fn set(&self, key: &str, value: Vec<u8>, expiry_secs: Option<u64>) -> Result<()>;

    /// Returns `true` if a key was deleted.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Every key matching the glob `pattern`.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>>;
}

// == Redis Backend ==
/// Redis over a multiplexed async connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: MultiplexedConnection,
}

impl RedisBackend {
    /// Connects to `url` (e.g. `redis://127.0.0.1:6379`).
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Connected to Redis at {}", url);
        Ok(Self { conn })
    }

    pub fn from_connection(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let exists: bool = conn.exists(key).await?;
        Ok(exists)
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, expiry_secs: Option<u64>) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(seconds) = expiry_secs {
            cmd.arg("EX").arg(seconds);
        }
        let _: () = cmd.query_async(&mut conn).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let deleted: i64 = conn.del(key).await?;
        Ok(deleted > 0)
    }

    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        // SCAN may return a key more than once across iterations
        keys.sort();
        keys.dedup();
        Ok(keys)
    }
}

// == Configuration ==
/// Construction parameters for [`RemoteStore`].
#[derive(Debug, Clone)]
pub struct RemoteStoreConfig {
    /// Default TTL in seconds for records without their own
    pub ttl: Option<u64>,
    /// Prefix isolating this cache's keys in a shared backend
    pub namespace: String,
}

impl Default for RemoteStoreConfig {
    fn default() -> Self {
        Self {
            ttl: None,
            namespace: "cache".to_string(),
        }
    }
}

// == Remote Store ==
/// Store adapter over a [`KvBackend`].
pub struct RemoteStore {
    backend: Arc<dyn KvBackend>,
    serializer: Arc<dyn Serializer>,
    ttl: Option<u64>,
    namespace: String,
    closed: AtomicBool,
}

impl RemoteStore {
    /// Creates a store with the JSON serializer.
    ///
    /// Fails with [`CacheError::Configuration`] when `ttl` is zero.
    pub fn new(backend: Arc<dyn KvBackend>, config: RemoteStoreConfig) -> Result<Self> {
        Self::with_serializer(backend, Arc::new(JsonSerializer), config)
    }

    pub fn with_serializer(
        backend: Arc<dyn KvBackend>,
        serializer: Arc<dyn Serializer>,
        config: RemoteStoreConfig,
    ) -> Result<Self> {
        if config.ttl == Some(0) {
            return Err(CacheError::Configuration("TTL must be positive".to_string()));
        }
        Ok(Self {
            backend,
            serializer,
            ttl: config.ttl,
            namespace: config.namespace,
            closed: AtomicBool::new(false),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Backend key for a cache key.
    pub fn full_key(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Backend glob selecting the keys `pattern` invalidates.
    pub fn scan_pattern(&self, pattern: &PathMatcher) -> String {
        format!("{}:{}", escape_glob(&self.namespace), pattern.scan_glob())
    }

    async fn delete_matching(&self, glob: &str) -> Result<usize> {
        let keys = self.backend.scan(glob).await?;
        let mut deleted = 0;
        for key in &keys {
            if self.backend.delete(key).await? {
                deleted += 1;
            }
            debug!("Key deleted from backend: {}", key);
        }
        Ok(deleted)
    }
}

#[async_trait]
impl Store for RemoteStore {
    async fn store(
        &self,
        key: &str,
        response: ResponseSnapshot,
        request: RequestSnapshot,
        mut metadata: Metadata,
    ) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Closed);
        }

        metadata.write_time = Some(Utc::now());
        let payload = self.serializer.dumps(&response, &request, &metadata)?;
        let ttl = metadata.ttl.or(self.ttl);
        if ttl == Some(0) {
            debug!("Skipping write of {} with zero TTL", key);
            return Ok(());
        }

        let full_key = self.full_key(key);
        if self.backend.exists(&full_key).await? {
            info!("Entry {} overwritten", full_key);
            self.backend.delete(&full_key).await?;
        }

        self.backend.set(&full_key, payload, ttl).await?;
        debug!("Entry written to backend, key={}, ttl={:?}", full_key, ttl);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<StoredRecord>> {
        if self.closed.load(Ordering::Acquire) {
            return Ok(None);
        }

        let full_key = self.full_key(key);
        let Some(raw) = self.backend.get(&full_key).await? else {
            return Ok(None);
        };

        match self.serializer.loads(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Discarding undecodable entry {}: {}", full_key, e);
                Ok(None)
            }
        }
    }

    async fn remove(&self, pattern: &PathMatcher) -> Result<()> {
        let glob = self.scan_pattern(pattern);
        let deleted = self.delete_matching(&glob).await?;
        if deleted == 0 {
            debug!("No backend keys matched {}", glob);
        } else {
            info!("Removed {} entries matching {}", deleted, glob);
        }
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::Release);
        let glob = format!("{}:*", escape_glob(&self.namespace));
        let deleted = self.delete_matching(&glob).await?;
        debug!("Cache namespace {} cleared ({} keys)", self.namespace, deleted);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

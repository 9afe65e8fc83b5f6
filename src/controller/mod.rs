//! Controller Module
//!
//! Policy side of the response cache: decides what may be cached, derives
//! cache keys, and drives a [`Store`] for writes, reads and invalidation.
//! Store failures never reach the caller from here; they are logged and
//! treated as misses so a broken cache cannot fail the request it fronts.

pub mod conditional;
mod key;
mod policy;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::cache::{CacheStats, StatsRecorder, Store};
use crate::error::{CacheError, Result};
use crate::models::{Metadata, RequestSnapshot, ResponseSnapshot};

pub use key::{generate_key, path_key, KEY_HEX_LEN};
pub use policy::{CachePolicy, InvalidationPolicy, KeyFn, DEFAULT_TRIGGER_METHODS};

// == Public Constants ==
/// Methods accepted in a cacheable-method allow-list.
pub const KNOWN_HTTP_METHODS: [&str; 9] = [
    "CONNECT", "DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT", "TRACE",
];

/// Largest response body that will be cached (1 MiB).
pub const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// OK, Moved Permanently, Permanent Redirect.
pub const DEFAULT_CACHEABLE_STATUS_CODES: [u16; 3] = [200, 301, 308];

// == Configuration ==
/// Allow-lists and limits applied by the [`Controller`].
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub cacheable_methods: Vec<String>,
    pub cacheable_status_codes: Vec<u16>,
    pub max_body_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cacheable_methods: vec!["GET".to_string()],
            cacheable_status_codes: DEFAULT_CACHEABLE_STATUS_CODES.to_vec(),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }
}

// == Controller ==
/// Cacheability rules, key generation and store orchestration.
#[derive(Debug)]
pub struct Controller {
    cacheable_methods: Vec<String>,
    cacheable_status_codes: Vec<u16>,
    max_body_size: usize,
    stats: StatsRecorder,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new()
    }
}

impl Controller {
    /// GET-only, `200/301/308`, 1 MiB body ceiling.
    pub fn new() -> Self {
        let config = ControllerConfig::default();
        Self {
            cacheable_methods: config.cacheable_methods,
            cacheable_status_codes: config.cacheable_status_codes,
            max_body_size: config.max_body_size,
            stats: StatsRecorder::new(),
        }
    }

    /// Validates and applies custom allow-lists.
    ///
    /// Methods are upper-cased; an unknown method is a configuration error.
    pub fn with_config(config: ControllerConfig) -> Result<Self> {
        let mut methods = Vec::with_capacity(config.cacheable_methods.len());
        for method in &config.cacheable_methods {
            let method = method.to_ascii_uppercase();
            if !KNOWN_HTTP_METHODS.contains(&method.as_str()) {
                return Err(CacheError::Configuration(format!(
                    "Invalid HTTP method: {method}"
                )));
            }
            methods.push(method);
        }
        if methods.is_empty() {
            methods.push("GET".to_string());
        }

        let status_codes = if config.cacheable_status_codes.is_empty() {
            DEFAULT_CACHEABLE_STATUS_CODES.to_vec()
        } else {
            config.cacheable_status_codes
        };

        Ok(Self {
            cacheable_methods: methods,
            cacheable_status_codes: status_codes,
            max_body_size: config.max_body_size,
            stats: StatsRecorder::new(),
        })
    }

    pub fn cacheable_methods(&self) -> &[String] {
        &self.cacheable_methods
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot()
    }

    // == Cacheability ==
    /// A request is cacheable when it uses an allowed method, carries no
    /// `no-cache`/`no-store` directive, and a policy applies to its route.
    pub fn is_cachable_request(
        &self,
        request: &RequestSnapshot,
        policy: Option<&CachePolicy>,
    ) -> bool {
        if policy.is_none() {
            return false;
        }
        if !self
            .cacheable_methods
            .iter()
            .any(|m| m.eq_ignore_ascii_case(&request.method))
        {
            return false;
        }
        !request
            .headers
            .has_cache_directive(&["no-cache", "no-store"])
    }

    /// A response is cacheable when its status is allowed, it carries no
    /// `no-cache`/`no-store`/`private` directive, and the body fits.
    pub fn is_cachable_response(&self, response: &ResponseSnapshot) -> bool {
        if !self.cacheable_status_codes.contains(&response.status) {
            return false;
        }
        if response
            .headers
            .has_cache_directive(&["no-cache", "no-store", "private"])
        {
            return false;
        }
        response.body.len() <= self.max_body_size
    }

    // == Keys ==
    /// The policy's key function if it has one, the default key otherwise.
    pub fn generate_cache_key(&self, request: &RequestSnapshot, policy: &CachePolicy) -> String {
        match &policy.key_func {
            Some(key_func) => key_func(request),
            None => generate_key(request),
        }
    }

    // == Store Orchestration ==
    /// Stores `response` under `key` if it is cacheable.
    ///
    /// Metadata records the TTL, the caching instant and the response's
    /// `ETag` / `Last-Modified` validators.
    pub async fn cache_response(
        &self,
        key: &str,
        request: &RequestSnapshot,
        response: &ResponseSnapshot,
        store: &dyn Store,
        ttl: Option<u64>,
    ) {
        if !self.is_cachable_response(response) {
            self.stats.record_skip();
            debug!("Skip caching for response: {}", response.status);
            return;
        }

        let metadata = Metadata {
            ttl,
            cached_at: Some(Utc::now()),
            etag: response.headers.get("etag").map(str::to_string),
            last_modified: response.headers.get("last-modified").map(str::to_string),
            ..Metadata::default()
        };

        match store
            .store(key, response.clone(), request.clone(), metadata)
            .await
        {
            Ok(()) => {
                self.stats.record_store();
                debug!("Cached response for {} under {}", request.path, key);
            }
            Err(e) => warn!("Failed to cache response under {}: {}", key, e),
        }
    }

    /// Returns the cached response for `key`, if any.
    pub async fn get_cached_response(
        &self,
        key: &str,
        store: &dyn Store,
    ) -> Option<ResponseSnapshot> {
        match store.retrieve(key).await {
            Ok(Some(record)) => {
                self.stats.record_hit();
                Some(record.response)
            }
            Ok(None) => {
                self.stats.record_miss();
                None
            }
            Err(e) => {
                self.stats.record_miss();
                warn!("Cache lookup for {} failed, treating as miss: {}", key, e);
                None
            }
        }
    }

    /// Like [`Controller::get_cached_response`], but answers 304 when the
    /// request's validators match the cached record.
    pub async fn get_cached_response_conditional(
        &self,
        key: &str,
        request: &RequestSnapshot,
        store: &dyn Store,
    ) -> Option<ResponseSnapshot> {
        let record = match store.retrieve(key).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.stats.record_miss();
                return None;
            }
            Err(e) => {
                self.stats.record_miss();
                warn!("Cache lookup for {} failed, treating as miss: {}", key, e);
                return None;
            }
        };

        self.stats.record_hit();
        if conditional::is_not_modified(request, &record.metadata) {
            debug!("Validators match for {}, answering 304", key);
            return Some(conditional::not_modified(&record.response));
        }
        Some(record.response)
    }

    /// Removes every cached record matching the policy's path patterns.
    pub async fn invalidate(&self, policy: &InvalidationPolicy, store: &dyn Store) {
        for pattern in &policy.paths {
            match store.remove(pattern).await {
                Ok(()) => {
                    self.stats.record_invalidation();
                    info!("Invalidated cache for pattern: {}", pattern);
                }
                Err(e) => warn!("Failed to invalidate pattern {}: {}", pattern, e),
            }
        }
    }
}

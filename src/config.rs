//! Configuration Module
//!
//! Loads service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{MemoryStoreConfig, RemoteStoreConfig};
use crate::error::{CacheError, Result};

/// Which [`Store`](crate::cache::Store) implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Memory,
    Redis,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "redis" => Ok(BackendKind::Redis),
            other => Err(CacheError::Configuration(format!(
                "unknown cache backend: {other}"
            ))),
        }
    }
}

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of records the memory store holds
    pub max_entries: usize,
    /// Store-level default TTL in seconds, 0 for none
    pub default_ttl: u64,
    /// Minimum seconds between expiry sweeps
    pub expiry_check_interval: u64,
    /// HTTP server port
    pub server_port: u16,
    pub backend: BackendKind,
    pub redis_url: String,
    /// Key prefix in the remote backend
    pub namespace: String,
    /// Max-age in seconds attached to the demo service's cached routes
    pub max_age: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MAX_ENTRIES` - Memory store capacity (default: 1000)
    /// - `DEFAULT_TTL` - Default TTL in seconds, 0 disables (default: 0)
    /// - `EXPIRY_CHECK_INTERVAL` - Sweep interval in seconds (default: 60)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_BACKEND` - `memory` or `redis` (default: memory)
    /// - `REDIS_URL` - Redis connection URL (default: redis://127.0.0.1:6379)
    /// - `CACHE_NAMESPACE` - Remote key prefix (default: cache)
    /// - `MAX_AGE` - Cached route max-age in seconds (default: 300)
    ///
    /// Unparseable numbers fall back to their defaults; an unknown backend
    /// name is a configuration error.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let backend = match env::var("CACHE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => defaults.backend,
        };

        Ok(Self {
            max_entries: parse_var("MAX_ENTRIES").unwrap_or(defaults.max_entries),
            default_ttl: parse_var("DEFAULT_TTL").unwrap_or(defaults.default_ttl),
            expiry_check_interval: parse_var("EXPIRY_CHECK_INTERVAL")
                .unwrap_or(defaults.expiry_check_interval),
            server_port: parse_var("SERVER_PORT").unwrap_or(defaults.server_port),
            backend,
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            namespace: env::var("CACHE_NAMESPACE").unwrap_or(defaults.namespace),
            max_age: parse_var("MAX_AGE").unwrap_or(defaults.max_age),
        })
    }

    fn ttl(&self) -> Option<u64> {
        (self.default_ttl > 0).then_some(self.default_ttl)
    }

    pub fn memory_store_config(&self) -> MemoryStoreConfig {
        let config = MemoryStoreConfig::new(self.max_entries)
            .with_expiry_check_interval(Duration::from_secs(self.expiry_check_interval));
        match self.ttl() {
            Some(ttl) => config.with_ttl(ttl),
            None => config,
        }
    }

    pub fn remote_store_config(&self) -> RemoteStoreConfig {
        RemoteStoreConfig {
            ttl: self.ttl(),
            namespace: self.namespace.clone(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            default_ttl: 0,
            expiry_check_interval: 60,
            server_port: 3000,
            backend: BackendKind::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            namespace: "cache".to_string(),
            max_age: 300,
        }
    }
}

fn parse_var<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

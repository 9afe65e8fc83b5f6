//! Per-route cache policies
//!
//! Policies are resolved by the routing layer and handed to the
//! [`Controller`](super::Controller) as plain values.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::cache::PathMatcher;
use crate::error::{CacheError, Result};
use crate::models::RequestSnapshot;

/// Caller-supplied cache key strategy.
pub type KeyFn = Arc<dyn Fn(&RequestSnapshot) -> String + Send + Sync>;

/// Methods that trigger invalidation unless configured otherwise.
pub const DEFAULT_TRIGGER_METHODS: [&str; 4] = ["POST", "PUT", "PATCH", "DELETE"];

// == Cache Policy ==
/// How a cacheable route is cached.
#[derive(Clone)]
pub struct CachePolicy {
    /// Lifetime of cached responses, in seconds
    pub max_age: u64,
    /// Overrides the default method/path/query key
    pub key_func: Option<KeyFn>,
}

impl CachePolicy {
    /// Fails with [`CacheError::Configuration`] when `max_age` is zero.
    pub fn new(max_age: u64) -> Result<Self> {
        if max_age == 0 {
            return Err(CacheError::Configuration(
                "max_age must be positive".to_string(),
            ));
        }
        Ok(Self {
            max_age,
            key_func: None,
        })
    }

    pub fn with_key_func<F>(mut self, key_func: F) -> Self
    where
        F: Fn(&RequestSnapshot) -> String + Send + Sync + 'static,
    {
        self.key_func = Some(Arc::new(key_func));
        self
    }
}

impl fmt::Debug for CachePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachePolicy")
            .field("max_age", &self.max_age)
            .field("key_func", &self.key_func.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

// == Invalidation Policy ==
/// Which cached paths a mutating route drops.
#[derive(Debug, Clone)]
pub struct InvalidationPolicy {
    pub paths: Vec<PathMatcher>,
    /// Upper-case methods that trigger invalidation
    pub trigger_methods: HashSet<String>,
}

impl InvalidationPolicy {
    pub fn new(paths: Vec<PathMatcher>) -> Self {
        Self {
            paths,
            trigger_methods: DEFAULT_TRIGGER_METHODS
                .iter()
                .map(|m| m.to_string())
                .collect(),
        }
    }

    /// Builds matchers from route path templates (see [`PathMatcher::from_template`]).
    pub fn from_templates<S: AsRef<str>>(templates: &[S]) -> Result<Self> {
        let paths = templates
            .iter()
            .map(|t| PathMatcher::from_template(t.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(paths))
    }

    pub fn with_trigger_methods<S: AsRef<str>>(mut self, methods: &[S]) -> Self {
        self.trigger_methods = methods
            .iter()
            .map(|m| m.as_ref().to_ascii_uppercase())
            .collect();
        self
    }

    /// Returns `true` if a request with `method` should invalidate.
    pub fn triggers(&self, method: &str) -> bool {
        self.trigger_methods.contains(&method.to_ascii_uppercase())
    }
}

//! HTTP request and response snapshots
//!
//! Immutable captures of the parts of an exchange the cache needs: enough of
//! the request to evaluate cache-control directives and match invalidation
//! patterns, and the full response (status, headers, body bytes).

use serde::{Deserialize, Serialize};

// == Headers ==
/// A case-insensitive, multi-value HTTP header list.
///
/// Preserves insertion order and duplicate names so a cached response is
/// replayed exactly as it was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers {
    inner: Vec<(String, String)>,
}

impl Headers {
    /// Creates an empty header list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header entry. Multiple values for the same name are preserved.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the first value for the given header name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns `true` if at least one entry has the given name.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns an iterator over all `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the lower-cased `Cache-Control` directives, if any.
    ///
    /// Multiple `Cache-Control` entries are merged, as HTTP allows the field
    /// to be split across lines.
    pub fn cache_control_directives(&self) -> Vec<String> {
        self.inner
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("cache-control"))
            .flat_map(|(_, v)| v.split(','))
            .map(|d| d.trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect()
    }

    /// Returns `true` if `Cache-Control` carries any of the given directives.
    ///
    /// Directive arguments (`private="set-cookie"`) are ignored when matching.
    pub fn has_cache_directive(&self, names: &[&str]) -> bool {
        self.cache_control_directives().iter().any(|directive| {
            let name = directive.split('=').next().unwrap_or_default().trim();
            names.contains(&name)
        })
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// == Request Snapshot ==
/// Captured request: method, path, raw query string and headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestSnapshot {
    /// Upper-case HTTP method
    pub method: String,
    /// Request path, without the query string
    pub path: String,
    /// Raw query string without the leading `?` (empty if none)
    #[serde(default)]
    pub query: String,
    pub headers: Headers,
}

impl RequestSnapshot {
    /// Creates a snapshot with no query string and no headers.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            path: path.into(),
            query: String::new(),
            headers: Headers::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Path plus query string, as it appeared on the request line.
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }
}

// == Response Snapshot ==
/// Captured response: status code, headers and the fully buffered body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: Headers,
    /// Raw body bytes; base64 encoded in text payloads
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// Serde adapter keeping arbitrary body bytes intact in text encodings.
mod body_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

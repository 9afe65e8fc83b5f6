//! Shared test fixtures

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use response_cache::cache::KvBackend;
use response_cache::Result;

/// Key-value backend held in process; expiry is recorded, not enforced.
#[derive(Default)]
pub struct InProcessBackend {
    data: Mutex<BTreeMap<String, (Vec<u8>, Option<u64>)>>,
}

impl InProcessBackend {
    pub fn keys(&self) -> Vec<String> {
        self.data.lock().unwrap().keys().cloned().collect()
    }

    pub fn expiry(&self, key: &str) -> Option<u64> {
        self.data.lock().unwrap().get(key).and_then(|(_, ttl)| *ttl)
    }
}

#[async_trait]
impl KvBackend for InProcessBackend {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.data.lock().unwrap().contains_key(key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.data.lock().unwrap().get(key).map(|(v, _)| v.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>, expiry_secs: Option<u64>) -> Result<()> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), (value, expiry_secs));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.data.lock().unwrap().remove(key).is_some())
    }

    // Globs produced by the store are a literal prefix followed by `*`.
    async fn scan(&self, pattern: &str) -> Result<Vec<String>> {
        let literal = pattern.strip_suffix('*').unwrap_or(pattern).replace('\\', "");
        Ok(self
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&literal))
            .collect())
    }
}

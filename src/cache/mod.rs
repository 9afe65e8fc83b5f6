//! Cache Module
//!
//! Storage side of the response cache: the [`Store`] contract, a bounded
//! in-memory implementation with TTL expiry and LRU eviction, and a remote
//! key-value adapter with its serializer.

mod clock;
mod lru;
pub mod matcher;
mod memory;
mod remote;
mod serializer;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub(crate) use lru::LruTracker;
pub use matcher::PathMatcher;
pub use memory::{
    BoundedMemoryStore, MemoryStoreConfig, MemoryStoreStats, DEFAULT_EXPIRY_CHECK_INTERVAL,
};
pub use remote::{KvBackend, RedisBackend, RemoteStore, RemoteStoreConfig};
pub use serializer::{JsonSerializer, Serializer};
pub use stats::{CacheStats, StatsRecorder};
pub use store::Store;

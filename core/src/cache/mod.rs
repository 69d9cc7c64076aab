//! # Response cache
//!
//! One stored payload per request fingerprint, served while younger than the
//! configured TTL.
//!
//! `CacheStore` is the storage medium and knows nothing about time.
//! `ResponseCache` applies the freshness rule on top of a store using the
//! injected clock. Store failures never fail a request: a failed read is a
//! miss and a failed write is dropped, both logged.

mod file;
mod memory;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::http::HttpRequest;

pub use file::{FileCache, DEFAULT_CACHE_DIR};
pub use memory::MemoryCache;

/// TTL used when caching is enabled without an explicit duration.
pub const DEFAULT_CACHE_TTL: u64 = 3600;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cache record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("could not move cache record into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// A stored response. Serialized as `{"timestamp": <epoch secs>, "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub timestamp: i64,
    pub data: Value,
}

impl CacheEntry {
    /// Fresh while `now - timestamp < ttl_secs`.
    pub fn is_fresh(&self, now: i64, ttl_secs: u64) -> bool {
        let age = now.saturating_sub(self.timestamp);
        i128::from(age) < i128::from(ttl_secs)
    }
}

/// Storage for cache entries keyed by fingerprint.
pub trait CacheStore: Send + Sync {
    /// The entry last written under `fingerprint`, fresh or not.
    fn read(&self, fingerprint: &str) -> CacheResult<Option<CacheEntry>>;

    /// Replace whatever is stored under `fingerprint`.
    fn write(&self, fingerprint: &str, entry: &CacheEntry) -> CacheResult<()>;
}

/// Hex SHA-256 over method, url, JSON body and the header sequence.
///
/// Every field is length-prefixed so adjacent fields cannot bleed into each
/// other. Header order matters.
pub fn fingerprint(request: &HttpRequest) -> String {
    fn field(hasher: &mut Sha256, bytes: &[u8]) {
        hasher.update((bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }

    let mut hasher = Sha256::new();
    field(&mut hasher, request.method.as_str().as_bytes());
    field(&mut hasher, request.url.as_str().as_bytes());
    match request.body_json() {
        Some(body) => field(&mut hasher, body.as_bytes()),
        None => field(&mut hasher, b"null"),
    }
    hasher.update((request.headers.len() as u64).to_le_bytes());
    for (name, value) in &request.headers {
        field(&mut hasher, name.as_bytes());
        field(&mut hasher, value.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// A store plus the freshness rule.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<dyn CacheStore>,
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            ttl_secs,
            clock,
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// The payload stored under `fingerprint` if it is still fresh.
    pub fn get(&self, fingerprint: &str) -> Option<Value> {
        let entry = match self.store.read(fingerprint) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(fingerprint, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        let now = self.clock.now().timestamp();
        if entry.is_fresh(now, self.ttl_secs) {
            Some(entry.data)
        } else {
            debug!(fingerprint, age = now.saturating_sub(entry.timestamp), "cache entry expired");
            None
        }
    }

    /// Store `data` under `fingerprint`, stamped with the current time.
    pub fn put(&self, fingerprint: &str, data: &Value) {
        let entry = CacheEntry {
            timestamp: self.clock.now().timestamp(),
            data: data.clone(),
        };
        if let Err(e) = self.store.write(fingerprint, &entry) {
            warn!(fingerprint, error = %e, "cache write failed");
        }
    }
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

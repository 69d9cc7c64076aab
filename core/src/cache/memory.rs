//! In-process cache store.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{CacheEntry, CacheResult, CacheStore};

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl CacheStore for MemoryCache {
    fn read(&self, fingerprint: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self.entries.read().get(fingerprint).cloned())
    }

    fn write(&self, fingerprint: &str, entry: &CacheEntry) -> CacheResult<()> {
        self.entries
            .write()
            .insert(fingerprint.to_string(), entry.clone());
        Ok(())
    }
}

//! In-memory preload cache.

use bridge_traits::{CacheEntry, PreloadCache};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

/// Preload cache backed by a `HashMap`, handing out UUID keys.
#[derive(Default)]
pub struct MemoryPreloadCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryPreloadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove(&self, key: &str) -> Option<CacheEntry> {
        self.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PreloadCache for MemoryPreloadCache {
    fn get(&self, key: &str) -> Option<CacheEntry> {
        self.lock().get(key).cloned()
    }

    fn set(&self, key: &str, entry: CacheEntry) {
        self.lock().insert(key.to_string(), entry);
    }

    fn unique_key(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }
}

impl std::fmt::Debug for MemoryPreloadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryPreloadCache")
            .field("entries", &self.len())
            .finish()
    }
}

//! Page preload cache.
//!
//! The framework registers page components in a key/value cache keyed by
//! their normalized path. When a navigation targets a page with a preload
//! hook, the adapter runs the hook ahead of the transition and leaves the
//! result in the same cache for the destination page to pick up on mount.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// A page component that can compute data before it is navigated to.
pub trait PreloadPage: Send + Sync {
    /// Pages without a preload hook are skipped by the navigation wrapper.
    fn has_preload_hook(&self) -> bool {
        true
    }

    /// Compute preload data from the navigation's query parameters.
    fn will_preload(&self, params: &Map<String, Value>) -> Value;
}

/// Values stored in the preload cache.
#[derive(Clone)]
pub enum CacheEntry {
    Data(Value),
    Page(Arc<dyn PreloadPage>),
}

impl CacheEntry {
    pub fn as_data(&self) -> Option<&Value> {
        match self {
            Self::Data(value) => Some(value),
            Self::Page(_) => None,
        }
    }

    pub fn as_page(&self) -> Option<&Arc<dyn PreloadPage>> {
        match self {
            Self::Page(page) => Some(page),
            Self::Data(_) => None,
        }
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(value) => f.debug_tuple("Data").field(value).finish(),
            Self::Page(_) => f.write_str("Page(..)"),
        }
    }
}

/// External key/value cache shared between the framework and the adapter.
pub trait PreloadCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry>;

    fn set(&self, key: &str, entry: CacheEntry);

    /// Generate a key that has not been handed out before.
    fn unique_key(&self) -> String;
}

//! Navigation preload.
//!
//! Before `navigateTo`, `redirectTo` or `switchTab` leaves the current page,
//! the destination page's preload hook runs with the navigation's query
//! parameters. The result is stored in the preload cache under a fresh key,
//! and the key rides along in the URL as `__preload_=<key>` so the
//! destination can pick the data up on mount.

use bridge_traits::{CacheEntry, PreloadCache};
use core_runtime::events::{AdapterEvent, ApiEvent, EventBus};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

/// Query parameter carrying the preload cache key.
pub const PRELOAD_QUERY_KEY: &str = "__preload_";

/// Cache key under which the destination page component is stored.
pub const PRELOAD_COMPONENT_KEY: &str = "$preloadComponent";

pub fn is_navigation_api(name: &str) -> bool {
    matches!(name, "navigateTo" | "redirectTo" | "switchTab")
}

/// Cache key a page is registered under: one leading `/` removed, query
/// dropped.
pub fn normalize_page_path(url: &str) -> &str {
    let path = url.strip_prefix('/').unwrap_or(url);
    path.split('?').next().unwrap_or(path)
}

/// Decode a query string into string-valued parameters.
pub fn parse_query(query: &str) -> Map<String, Value> {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}

/// Runs destination preload hooks for navigation calls.
#[derive(Clone)]
pub struct NavigationPreload {
    cache: Arc<dyn PreloadCache>,
    events: Option<EventBus>,
}

impl NavigationPreload {
    pub fn new(cache: Arc<dyn PreloadCache>, events: Option<EventBus>) -> Self {
        Self { cache, events }
    }

    /// Preload for the navigation described by `options`, rewriting its
    /// `url` in place.
    ///
    /// Returns the cache key the preload result was stored under, or `None`
    /// when the destination has no registered page or no preload hook.
    pub fn apply(&self, options: &mut Map<String, Value>) -> Option<String> {
        let url = options.get("url").and_then(Value::as_str)?.to_string();
        let path = normalize_page_path(&url);

        let page = match self.cache.get(path) {
            Some(CacheEntry::Page(page)) if page.has_preload_hook() => page,
            _ => return None,
        };

        let key = self.cache.unique_key();
        let (separator, params) = match url.split_once('?') {
            Some((_, query)) => ('&', parse_query(query)),
            None => ('?', Map::new()),
        };

        let data = page.will_preload(&params);
        self.cache.set(&key, CacheEntry::Data(data));
        self.cache.set(PRELOAD_COMPONENT_KEY, CacheEntry::Page(Arc::clone(&page)));

        let rewritten = format!("{}{}{}={}", url, separator, PRELOAD_QUERY_KEY, key);
        options.insert("url".to_string(), Value::String(rewritten));

        debug!(path, key = %key, "Stored navigation preload data");
        if let Some(events) = &self.events {
            let _ = events.emit(AdapterEvent::Api(ApiEvent::PreloadStored {
                path: path.to_string(),
                key: key.clone(),
            }));
        }
        Some(key)
    }
}

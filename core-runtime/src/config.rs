//! # Adapter Configuration
//!
//! Builder-based configuration for the host adapter.
//!
//! ## Overview
//!
//! [`AdapterConfig`] carries the host capabilities the adapter is wired to and
//! the tunables of the request pipeline and API normalizer. The builder
//! validates everything up front so a misconfigured host fails at startup,
//! not on its first network call.
//!
//! ## Required Dependencies
//!
//! - `HostTransport` - the host's single-request network primitive
//!   (desktop default: reqwest, with the `desktop-shims` feature)
//! - `HostApi` - the host's named API table
//!
//! ## Optional Dependencies
//!
//! - `PreloadCache` - page cache consulted by navigation preload
//!   (desktop default: in-memory map)
//! - `EventBus` - receives queue and normalizer events
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::AdapterConfig;
//! use std::sync::Arc;
//!
//! let config = AdapterConfig::builder()
//!     .transport(Arc::new(MyTransport))
//!     .host_api(Arc::new(MyHostApi))
//!     .max_concurrent(10)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::EventBus;
use bridge_traits::{HostApi, HostTransport, PreloadCache};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Default number of host requests allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Upper bound accepted for `max_concurrent`.
pub const MAX_CONCURRENT_LIMIT: usize = 64;

/// Default design width for px transforms.
pub const DEFAULT_DESIGN_WIDTH: u32 = 750;

/// Adapter configuration.
///
/// Use [`AdapterConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct AdapterConfig {
    /// Host network primitive
    pub transport: Arc<dyn HostTransport>,

    /// Host named-API table
    pub host_api: Arc<dyn HostApi>,

    /// Page cache used by navigation preload (optional)
    pub preload_cache: Option<Arc<dyn PreloadCache>>,

    /// Maximum number of concurrently dispatched host requests
    pub max_concurrent: usize,

    pub px_transform: PxTransformConfig,

    /// Framework-supplied API names, unioned with the built-in lists
    pub api_lists: ApiLists,

    pub event_bus: Option<EventBus>,
}

impl std::fmt::Debug for AdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterConfig")
            .field("transport", &"HostTransport { ... }")
            .field("host_api", &"HostApi { ... }")
            .field(
                "preload_cache",
                &self.preload_cache.as_ref().map(|_| "PreloadCache { ... }"),
            )
            .field("max_concurrent", &self.max_concurrent)
            .field("px_transform", &self.px_transform)
            .field("api_lists", &self.api_lists)
            .field("event_bus", &self.event_bus)
            .finish()
    }
}

/// Pixel-size transform settings.
///
/// `device_ratio` maps a design width to the multiplier applied to px values
/// before they are expressed in host units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PxTransformConfig {
    pub design_width: u32,
    pub device_ratio: BTreeMap<u32, f64>,
}

impl Default for PxTransformConfig {
    fn default() -> Self {
        let device_ratio = BTreeMap::from([(640, 1.17), (750, 1.0), (828, 0.905)]);
        Self {
            design_width: DEFAULT_DESIGN_WIDTH,
            device_ratio,
        }
    }
}

impl PxTransformConfig {
    /// Ratio configured for the current design width, if any.
    pub fn ratio(&self) -> Option<f64> {
        self.device_ratio.get(&self.design_width).copied()
    }

    pub fn validate(&self) -> Result<()> {
        if self.design_width == 0 {
            return Err(Error::Config("Design width must be greater than 0".to_string()));
        }

        if let Some((width, ratio)) = self
            .device_ratio
            .iter()
            .find(|(_, ratio)| !ratio.is_finite() || **ratio <= 0.0)
        {
            return Err(Error::Config(format!(
                "Device ratio for design width {} must be a positive number, got {}",
                width, ratio
            )));
        }

        Ok(())
    }
}

/// API name sets supplied by the application framework.
///
/// Merged with the adapter's built-in lists; a name only needs to appear in
/// one place to be bound.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLists {
    /// Event subscription (`on*`/`off*`) and `*Sync` APIs, forwarded as-is
    pub on_and_sync: BTreeSet<String>,
    /// Callback-less APIs, forwarded as-is
    pub no_promise: BTreeSet<String>,
    /// Callback-style APIs that get promisified
    pub other: BTreeSet<String>,
}

impl ApiLists {
    pub fn with_on_and_sync<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.on_and_sync.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_no_promise<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.no_promise.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_other<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.other.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_and_sync.is_empty() && self.no_promise.is_empty() && self.other.is_empty()
    }
}

impl AdapterConfig {
    pub fn builder() -> AdapterConfigBuilder {
        AdapterConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// This checks:
    /// - `max_concurrent` is within `1..=64`
    /// - px transform settings are well-formed
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent == 0 {
            return Err(Error::Config(
                "Max concurrent requests must be at least 1".to_string(),
            ));
        }

        if self.max_concurrent > MAX_CONCURRENT_LIMIT {
            return Err(Error::Config(format!(
                "Max concurrent requests exceeds maximum of {}",
                MAX_CONCURRENT_LIMIT
            )));
        }

        self.px_transform.validate()
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn transport_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HostTransport".to_string(),
        message: "HostTransport implementation is required to dispatch network requests. \
                 Desktop: ensure the 'desktop-shims' feature is enabled to use the default ReqwestTransport. \
                 Mini-program hosts: inject a transport bound to the host's request primitive."
            .to_string(),
    }
}

fn host_api_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "HostApi".to_string(),
        message: "HostApi implementation is required for named API dispatch. \
                 Inject a binding to the host's global API object."
            .to_string(),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_transport() -> Result<Arc<dyn HostTransport>> {
    use bridge_desktop::ReqwestTransport;

    let transport = ReqwestTransport::new()
        .map_err(|e| Error::Shim(format!("ReqwestTransport: {}", e)))?;
    let transport: Arc<dyn HostTransport> = Arc::new(transport);
    Ok(transport)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_transport() -> Result<Arc<dyn HostTransport>> {
    Err(transport_missing_error())
}

#[cfg(feature = "desktop-shims")]
fn provide_default_preload_cache() -> Option<Arc<dyn PreloadCache>> {
    use bridge_desktop::MemoryPreloadCache;

    let cache: Arc<dyn PreloadCache> = Arc::new(MemoryPreloadCache::new());
    Some(cache)
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_preload_cache() -> Option<Arc<dyn PreloadCache>> {
    None
}

/// Builder for [`AdapterConfig`].
#[derive(Default)]
pub struct AdapterConfigBuilder {
    transport: Option<Arc<dyn HostTransport>>,
    host_api: Option<Arc<dyn HostApi>>,
    preload_cache: Option<Arc<dyn PreloadCache>>,
    max_concurrent: Option<usize>,
    px_transform: Option<PxTransformConfig>,
    api_lists: ApiLists,
    event_bus: Option<EventBus>,
}

impl AdapterConfigBuilder {
    /// Sets the host transport.
    ///
    /// If not provided, `ReqwestTransport` is used when the `desktop-shims`
    /// feature is enabled.
    pub fn transport(mut self, transport: Arc<dyn HostTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the host API table (required).
    pub fn host_api(mut self, host_api: Arc<dyn HostApi>) -> Self {
        self.host_api = Some(host_api);
        self
    }

    /// Sets the preload cache consulted by `navigateTo`, `redirectTo` and
    /// `switchTab`.
    ///
    /// Without one, navigation calls are forwarded unchanged.
    pub fn preload_cache(mut self, cache: Arc<dyn PreloadCache>) -> Self {
        self.preload_cache = Some(cache);
        self
    }

    /// Sets the in-flight request limit.
    ///
    /// Default: 5
    pub fn max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = Some(max);
        self
    }

    pub fn px_transform(mut self, config: PxTransformConfig) -> Self {
        self.px_transform = Some(config);
        self
    }

    /// Adds framework-supplied API names.
    pub fn api_lists(mut self, lists: ApiLists) -> Self {
        self.api_lists = lists;
        self
    }

    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    /// Builds the final `AdapterConfig`.
    ///
    /// Returns an error if a required capability is missing or a value is
    /// out of range.
    pub fn build(self) -> Result<AdapterConfig> {
        let host_api = self.host_api.ok_or_else(host_api_missing_error)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => provide_default_transport()?,
        };

        let preload_cache = self.preload_cache.or_else(provide_default_preload_cache);

        let config = AdapterConfig {
            transport,
            host_api,
            preload_cache,
            max_concurrent: self.max_concurrent.unwrap_or(DEFAULT_MAX_CONCURRENT),
            px_transform: self.px_transform.unwrap_or_default(),
            api_lists: self.api_lists,
            event_bus: self.event_bus,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{ApiCall, FinishedTask, HostArg, HostTask, RequestDescriptor};
    use serde_json::Value;

    struct StubTransport;

    impl HostTransport for StubTransport {
        fn request(&self, descriptor: RequestDescriptor) -> Arc<dyn HostTask> {
            drop(descriptor);
            Arc::new(FinishedTask)
        }
    }

    struct StubHostApi;

    impl HostApi for StubHostApi {
        fn has_api(&self, _name: &str) -> bool {
            false
        }

        fn invoke(&self, _name: &str, _args: Vec<HostArg>) -> BridgeResult<Value> {
            Ok(Value::Null)
        }

        fn invoke_with_callbacks(
            &self,
            _name: &str,
            _call: ApiCall,
        ) -> BridgeResult<Option<Arc<dyn HostTask>>> {
            Ok(None)
        }
    }

    fn builder() -> AdapterConfigBuilder {
        AdapterConfig::builder()
            .transport(Arc::new(StubTransport))
            .host_api(Arc::new(StubHostApi))
    }

    #[test]
    fn test_builder_defaults() {
        let config = builder().build().unwrap();
        assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT);
        assert_eq!(config.px_transform.design_width, 750);
        assert_eq!(config.px_transform.ratio(), Some(1.0));
        assert!(config.api_lists.is_empty());
        assert!(config.event_bus.is_none());
    }

    #[test]
    fn test_builder_requires_host_api() {
        let result = AdapterConfig::builder()
            .transport(Arc::new(StubTransport))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => assert_eq!(capability, "HostApi"),
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_builder_requires_transport() {
        let result = AdapterConfig::builder()
            .host_api(Arc::new(StubHostApi))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, message }) => {
                assert_eq!(capability, "HostTransport");
                assert!(message.contains("desktop-shims"));
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[cfg(feature = "desktop-shims")]
    #[test]
    fn test_build_with_desktop_defaults() {
        let config = AdapterConfig::builder()
            .host_api(Arc::new(StubHostApi))
            .build()
            .unwrap();
        assert!(config.preload_cache.is_some());
    }

    #[test]
    fn test_validate_rejects_zero_max_concurrent() {
        let result = builder().max_concurrent(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_excessive_max_concurrent() {
        let result = builder().max_concurrent(MAX_CONCURRENT_LIMIT + 1).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_custom_max_concurrent() {
        let config = builder().max_concurrent(2).build().unwrap();
        assert_eq!(config.max_concurrent, 2);
    }

    #[test]
    fn test_px_default_ratios() {
        let px = PxTransformConfig::default();
        assert_eq!(px.device_ratio.get(&640), Some(&1.17));
        assert_eq!(px.device_ratio.get(&828), Some(&0.905));
    }

    #[test]
    fn test_px_rejects_non_positive_ratio() {
        let mut px = PxTransformConfig::default();
        px.device_ratio.insert(375, 0.0);
        let result = builder().px_transform(px).build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("375")));
    }

    #[test]
    fn test_unknown_design_width_is_not_a_build_error() {
        let px = PxTransformConfig {
            design_width: 1080,
            ..PxTransformConfig::default()
        };
        let config = builder().px_transform(px).build().unwrap();
        assert_eq!(config.px_transform.ratio(), None);
    }

    #[test]
    fn test_api_lists_builder() {
        let lists = ApiLists::default()
            .with_other(["getLocation", "chooseImage"])
            .with_on_and_sync(["onAppShow"])
            .with_no_promise(["createCanvasContext"]);

        assert!(lists.other.contains("chooseImage"));
        assert!(lists.on_and_sync.contains("onAppShow"));
        assert!(lists.no_promise.contains("createCanvasContext"));
        assert!(!lists.is_empty());
    }

    #[test]
    fn test_api_lists_deserialize() {
        let lists: ApiLists = serde_json::from_value(serde_json::json!({
            "onAndSync": ["getStorageSync"],
            "noPromise": [],
            "other": ["login"]
        }))
        .unwrap();
        assert!(lists.on_and_sync.contains("getStorageSync"));
        assert!(lists.other.contains("login"));
    }

    #[test]
    fn test_config_debug_hides_bridges() {
        let config = builder().build().unwrap();
        let debug = format!("{:?}", config);
        assert!(debug.contains("HostTransport { ... }"));
        assert!(debug.contains("max_concurrent: 5"));
    }
}

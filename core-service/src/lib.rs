//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges from an [`AdapterConfig`] into
//! the request pipeline (`core-request`) and the normalized API table
//! (`core-api`), and hands the framework a single [`NativeApi`] handle. Call
//! [`init_native_api`] once per app instance.
//!
//! ```ignore
//! use core_runtime::config::AdapterConfig;
//! use core_service::init_native_api;
//!
//! let config = AdapterConfig::builder().host_api(host).build()?;
//! let native = init_native_api(config)?;
//!
//! native.add_interceptor(core_request::LogInterceptor);
//! let response = native.request("https://api.example.com/items").await?;
//! let width = native.px_transform(24)?;
//! ```

pub mod error;

pub use error::{CoreError, Result};

use std::fmt::Display;
use std::sync::{Arc, PoisonError, RwLock};

use bridge_traits::{HostApi, RequestDescriptor};
use core_api::{ApiArg, ApiError, ApiReturn, NativeApis};
use core_request::{
    InterceptedRequest, Interceptor, Link, QueueStats, RequestClient, RequestQueue,
};
use core_runtime::config::{AdapterConfig, PxTransformConfig};
use core_runtime::events::{EventBus, EventStream};
use core_runtime::logging::{init_logging, LoggingConfig};
use serde_json::Value;
use tracing::info;

const GET_CURRENT_PAGES: &str = "getCurrentPages";
const GET_APP: &str = "getApp";

/// Primary façade exposed to the application framework.
pub struct NativeApi {
    host: Arc<dyn HostApi>,
    queue: RequestQueue,
    link: Link,
    apis: NativeApis,
    px: RwLock<PxTransformConfig>,
    events: Option<EventBus>,
}

/// Build the adapter surface from `config`.
///
/// The request family is routed through a [`Link`] whose terminal link
/// submits to a fresh [`RequestQueue`]; every other registered API name is
/// bound by the normalizer.
pub fn init_native_api(config: AdapterConfig) -> Result<NativeApi> {
    config.validate()?;

    let queue = RequestQueue::from_config(&config);
    let link = Link::new(Arc::new(RequestClient::new(queue.clone())));
    let apis = NativeApis::from_config(&config);

    info!(
        max_concurrent = queue.max_concurrent(),
        apis = apis.names().count(),
        "Native API initialized"
    );

    Ok(NativeApi {
        host: Arc::clone(&config.host_api),
        queue,
        link,
        apis,
        px: RwLock::new(config.px_transform),
        events: config.event_bus,
    })
}

/// Install logging, then [`init_native_api`].
pub fn bootstrap(config: AdapterConfig, logging: LoggingConfig) -> Result<NativeApi> {
    init_logging(logging)
        .map_err(|err| CoreError::InitializationFailed(format!("logging: {}", err)))?;
    init_native_api(config)
}

impl NativeApi {
    /// Send a request through the interceptor chain.
    pub fn request(&self, request: impl Into<RequestDescriptor>) -> InterceptedRequest {
        self.link.request(request)
    }

    pub fn add_interceptor(&self, interceptor: impl Interceptor + 'static) {
        self.link.add_interceptor(interceptor);
    }

    pub fn add_shared_interceptor(&self, interceptor: Arc<dyn Interceptor>) {
        self.link.add_shared(interceptor);
    }

    /// Remove every interceptor; requests still reach the host.
    pub fn clean_interceptors(&self) {
        self.link.clean_interceptors();
    }

    /// Call a named host API through its normalized binding.
    pub fn call(&self, name: &str, args: Vec<ApiArg>) -> Result<ApiReturn> {
        Ok(self.apis.call(name, args)?)
    }

    pub fn is_supported(&self, name: &str) -> bool {
        self.apis.is_supported(name)
    }

    pub fn apis(&self) -> &NativeApis {
        &self.apis
    }

    pub fn px_transform(&self, size: impl Display) -> Result<String> {
        let config = self.px.read().unwrap_or_else(PoisonError::into_inner);
        Ok(core_api::px_transform(size, &config)?)
    }

    /// Replace the px conversion settings.
    pub fn init_px_transform(&self, config: PxTransformConfig) -> Result<()> {
        config.validate()?;
        *self.px.write().unwrap_or_else(PoisonError::into_inner) = config;
        Ok(())
    }

    pub fn px_transform_config(&self) -> PxTransformConfig {
        self.px
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Host environment descriptor.
    pub fn env(&self) -> Value {
        self.host.env()
    }

    /// The host's page stack.
    pub fn get_current_pages(&self) -> Result<Value> {
        self.host_global(GET_CURRENT_PAGES)
    }

    /// The host's app instance.
    pub fn get_app(&self) -> Result<Value> {
        self.host_global(GET_APP)
    }

    fn host_global(&self, name: &str) -> Result<Value> {
        if !self.host.has_api(name) {
            return Err(CoreError::CapabilityMissing {
                capability: name.to_string(),
                message: format!("The host does not expose {}", name),
            });
        }
        self.host
            .invoke(name, Vec::new())
            .map_err(|err| CoreError::Api(ApiError::from(err)))
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }

    /// Subscribe to adapter events, if an event bus was configured.
    pub fn subscribe(&self) -> Option<EventStream> {
        self.events.as_ref().map(EventBus::subscribe)
    }
}

impl std::fmt::Debug for NativeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeApi")
            .field("queue", &self.queue.stats())
            .field("interceptors", &self.link.interceptor_count())
            .field("apis", &self.apis)
            .finish()
    }
}

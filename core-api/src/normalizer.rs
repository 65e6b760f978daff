//! # Generic API Normalizer
//!
//! Binds every registered host API name to one of three wrappers:
//!
//! - **Unsupported**: the host lacks the API. Calls log a warning and return
//!   [`ApiReturn::Unsupported`]; they never fail.
//! - **Forward**: `OnAndSync` / `NoPromise` APIs. Arguments pass straight
//!   through, except a trailing framework component, which is replaced by its
//!   native scope.
//! - **Promised**: `Other` APIs. An options object gets `success` / `fail` /
//!   `complete` wired to an [`ApiPromise`]; the caller's own callbacks run
//!   first. A string first argument skips the wrapper and is forwarded.
//!
//! Bindings are decided once, when [`NativeApis::process`] runs.

use crate::error::{ApiError, Result};
use crate::navigation::{is_navigation_api, NavigationPreload};
use crate::promise::{ApiPromise, PromiseKind, TaskCell};
use crate::registry::{ApiCategory, ApiRegistry};
use bridge_traits::{ApiCall, ApiCallback, ApiListener, HostApi, HostArg, PreloadCache};
use core_request::Settlement;
use core_runtime::config::AdapterConfig;
use core_runtime::events::{AdapterEvent, ApiEvent, EventBus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// A framework component passed to a host API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentRef {
    /// Component name, for diagnostics
    pub name: String,
    /// The host-native scope the component wraps
    pub scope: Value,
}

impl ComponentRef {
    pub fn new(name: impl Into<String>, scope: Value) -> Self {
        Self {
            name: name.into(),
            scope,
        }
    }
}

/// Options object with caller callbacks, for promisified APIs.
#[derive(Default)]
pub struct ApiOptions {
    pub params: Map<String, Value>,
    pub success: Option<ApiCallback>,
    pub fail: Option<ApiCallback>,
    pub complete: Option<ApiCallback>,
}

impl ApiOptions {
    pub fn new(params: Map<String, Value>) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(Value) + Send + 'static) -> Self {
        self.success = Some(Box::new(f));
        self
    }

    pub fn on_fail(mut self, f: impl FnOnce(Value) + Send + 'static) -> Self {
        self.fail = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(Value) + Send + 'static) -> Self {
        self.complete = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for ApiOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiOptions")
            .field("params", &self.params)
            .field("success", &self.success.is_some())
            .field("fail", &self.fail.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

/// One argument of a normalized API call.
pub enum ApiArg {
    Value(Value),
    Component(ComponentRef),
    Listener(ApiListener),
    Options(ApiOptions),
}

impl ApiArg {
    pub fn listener(f: impl Fn(Value) + Send + Sync + 'static) -> Self {
        Self::Listener(Arc::new(f))
    }

    /// Convert for a forwarded call. Callbacks on options objects have no
    /// host equivalent outside the promisified path and are dropped.
    fn into_host_arg(self, scope_component: bool) -> HostArg {
        match self {
            Self::Value(value) => HostArg::Value(value),
            Self::Component(component) if scope_component => HostArg::Scope(component.scope),
            Self::Component(component) => {
                HostArg::Value(serde_json::to_value(&component).unwrap_or(Value::Null))
            }
            Self::Listener(listener) => HostArg::Listener(listener),
            Self::Options(options) => {
                if options.success.is_some() || options.fail.is_some() || options.complete.is_some()
                {
                    debug!("Dropping callbacks on options passed to a forwarded API");
                }
                HostArg::Value(Value::Object(options.params))
            }
        }
    }
}

impl fmt::Debug for ApiArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Component(component) => f.debug_tuple("Component").field(component).finish(),
            Self::Listener(_) => f.write_str("Listener(..)"),
            Self::Options(options) => f.debug_tuple("Options").field(options).finish(),
        }
    }
}

impl From<Value> for ApiArg {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for ApiArg {
    fn from(value: &str) -> Self {
        Self::Value(Value::String(value.to_string()))
    }
}

impl From<ComponentRef> for ApiArg {
    fn from(component: ComponentRef) -> Self {
        Self::Component(component)
    }
}

impl From<ApiOptions> for ApiArg {
    fn from(options: ApiOptions) -> Self {
        Self::Options(options)
    }
}

/// Result of a normalized call.
#[derive(Debug)]
pub enum ApiReturn {
    /// The host lacks this API; nothing was called.
    Unsupported,
    /// Forwarded call's return value.
    Value(Value),
    Pending(ApiPromise),
}

impl ApiReturn {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_promise(self) -> Option<ApiPromise> {
        match self {
            Self::Pending(promise) => Some(promise),
            _ => None,
        }
    }
}

/// Wrapper chosen for an API name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiBinding {
    Unsupported,
    Forward,
    Promised,
}

/// Normalized view of the host's API table.
pub struct NativeApis {
    host: Arc<dyn HostApi>,
    bindings: BTreeMap<String, ApiBinding>,
    preload: Option<NavigationPreload>,
    events: Option<EventBus>,
}

impl NativeApis {
    /// Decide a binding for every name in `registry`.
    pub fn process(
        host: Arc<dyn HostApi>,
        registry: &ApiRegistry,
        preload_cache: Option<Arc<dyn PreloadCache>>,
        events: Option<EventBus>,
    ) -> Self {
        let bindings: BTreeMap<String, ApiBinding> = registry
            .iter()
            .map(|(name, category)| {
                let binding = if !host.has_api(name) {
                    ApiBinding::Unsupported
                } else if category == ApiCategory::Other {
                    ApiBinding::Promised
                } else {
                    ApiBinding::Forward
                };
                (name.to_string(), binding)
            })
            .collect();

        let unsupported = bindings
            .values()
            .filter(|binding| **binding == ApiBinding::Unsupported)
            .count();
        debug!(
            apis = bindings.len(),
            unsupported, "Processed host API table"
        );

        let preload = preload_cache.map(|cache| NavigationPreload::new(cache, events.clone()));
        Self {
            host,
            bindings,
            preload,
            events,
        }
    }

    pub fn from_config(config: &AdapterConfig) -> Self {
        Self::process(
            Arc::clone(&config.host_api),
            &ApiRegistry::from_lists(&config.api_lists),
            config.preload_cache.clone(),
            config.event_bus.clone(),
        )
    }

    pub fn binding(&self, name: &str) -> Option<ApiBinding> {
        self.bindings.get(name).copied()
    }

    pub fn is_supported(&self, name: &str) -> bool {
        matches!(
            self.binding(name),
            Some(ApiBinding::Forward | ApiBinding::Promised)
        )
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    pub fn host(&self) -> &Arc<dyn HostApi> {
        &self.host
    }

    /// Call API `name` through its binding.
    pub fn call(&self, name: &str, args: Vec<ApiArg>) -> Result<ApiReturn> {
        match self.binding(name) {
            None => Err(ApiError::NotRegistered(name.to_string())),
            Some(ApiBinding::Unsupported) => {
                self.report_unsupported(name);
                Ok(ApiReturn::Unsupported)
            }
            Some(ApiBinding::Forward) => self.forward(name, args),
            Some(ApiBinding::Promised) => self.promised(name, args),
        }
    }

    fn report_unsupported(&self, name: &str) {
        warn!(api = name, "{} is not supported by the host", name);
        if let Some(events) = &self.events {
            let _ = events.emit(AdapterEvent::Api(ApiEvent::Unsupported {
                name: name.to_string(),
            }));
        }
    }

    fn forward(&self, name: &str, args: Vec<ApiArg>) -> Result<ApiReturn> {
        let last = args.len().saturating_sub(1);
        let host_args = args
            .into_iter()
            .enumerate()
            .map(|(index, arg)| arg.into_host_arg(index == last))
            .collect();
        Ok(ApiReturn::Value(self.host.invoke(name, host_args)?))
    }

    fn promised(&self, name: &str, args: Vec<ApiArg>) -> Result<ApiReturn> {
        let mut args = args.into_iter();
        let first = args.next();

        let options = match first {
            Some(ApiArg::Value(Value::String(text))) if !text.is_empty() => {
                let mut host_args = vec![HostArg::Value(Value::String(text))];
                host_args.extend(args.map(|arg| arg.into_host_arg(false)));
                return Ok(ApiReturn::Value(self.host.invoke(name, host_args)?));
            }
            Some(ApiArg::Value(Value::Object(params))) => ApiOptions::new(params),
            Some(ApiArg::Options(options)) => options,
            _ => ApiOptions::default(),
        };
        let extra_args = args.map(|arg| arg.into_host_arg(false)).collect();

        let ApiOptions {
            mut params,
            success,
            fail,
            complete,
        } = options;

        if is_navigation_api(name) {
            if let Some(preload) = &self.preload {
                preload.apply(&mut params);
            }
        }

        let (settlement, receiver) = Settlement::<Value, Value>::new();
        let watch = settlement.watch();
        let on_success = settlement.clone();
        let on_fail = settlement;

        let call = ApiCall {
            options: params,
            extra_args,
            success: Some(Box::new(move |payload| {
                on_success.succeed(payload, |payload| {
                    if let Some(callback) = success {
                        callback(payload.clone());
                    }
                });
            })),
            fail: Some(Box::new(move |payload| {
                on_fail.fail(payload, |payload| {
                    if let Some(callback) = fail {
                        callback(payload.clone());
                    }
                });
            })),
            complete: Some(Box::new(move |payload| {
                if let Some(callback) = complete {
                    callback(payload);
                }
            })),
        };

        let task: TaskCell = Arc::new(Mutex::new(None));
        let started = self.host.invoke_with_callbacks(name, call)?;
        *task.lock().unwrap_or_else(PoisonError::into_inner) = started;

        Ok(ApiReturn::Pending(ApiPromise::new(
            PromiseKind::for_api(name),
            receiver,
            watch,
            task,
        )))
    }
}

impl fmt::Debug for NativeApis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeApis")
            .field("bindings", &self.bindings.len())
            .field("preload", &self.preload.is_some())
            .finish()
    }
}

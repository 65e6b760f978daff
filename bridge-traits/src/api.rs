//! Named host API surface.
//!
//! Besides the request primitive, the host exposes a large table of named
//! APIs (`getSystemInfoSync`, `showToast`, `uploadFile`, ...). The adapter does
//! not model each one; it dispatches by name through [`HostApi`] and only
//! decides *how* to wrap each call.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::transport::HostTask;

pub type ApiCallback = Box<dyn FnOnce(Value) + Send>;

/// Repeatable callback for event-style APIs (`onAppShow`, `onSocketMessage`).
pub type ApiListener = Arc<dyn Fn(Value) + Send + Sync>;

/// Argument passed to a forwarded host call.
#[derive(Clone)]
pub enum HostArg {
    Value(Value),
    /// Native scope of a framework component, substituted for the component
    /// itself before the call reaches the host.
    Scope(Value),
    Listener(ApiListener),
}

impl HostArg {
    /// JSON payload of the argument; `None` for listeners.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(value) | Self::Scope(value) => Some(value),
            Self::Listener(_) => None,
        }
    }
}

impl fmt::Debug for HostArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Self::Scope(value) => f.debug_tuple("Scope").field(value).finish(),
            Self::Listener(_) => f.write_str("Listener(..)"),
        }
    }
}

/// A callback-style host call: an options object with `success` / `fail` /
/// `complete` slots, plus any positional arguments after it.
#[derive(Default)]
pub struct ApiCall {
    pub options: Map<String, Value>,
    pub extra_args: Vec<HostArg>,
    pub success: Option<ApiCallback>,
    pub fail: Option<ApiCallback>,
    pub complete: Option<ApiCallback>,
}

impl ApiCall {
    pub fn new(options: Map<String, Value>) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Settle the call the way a host must: `success` or `fail`, then
    /// `complete`.
    pub fn finish(self, result: std::result::Result<Value, Value>) {
        let payload = match result {
            Ok(value) => {
                if let Some(cb) = self.success {
                    cb(value.clone());
                }
                value
            }
            Err(value) => {
                if let Some(cb) = self.fail {
                    cb(value.clone());
                }
                value
            }
        };
        if let Some(cb) = self.complete {
            cb(payload);
        }
    }
}

impl fmt::Debug for ApiCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCall")
            .field("options", &self.options)
            .field("extra_args", &self.extra_args)
            .field("success", &self.success.is_some())
            .field("fail", &self.fail.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

/// The host's named API table.
///
/// # Platform Support
///
/// Implemented by each mini-program host binding. Names the host does not
/// know must report `false` from [`has_api`](HostApi::has_api); the adapter
/// then installs a warning stub instead of calling through.
pub trait HostApi: Send + Sync {
    /// Whether the host exposes `name` at all.
    fn has_api(&self, name: &str) -> bool;

    /// Forward a plain call (sync APIs, event registration, or a callback API
    /// invoked with a non-object first argument).
    fn invoke(&self, name: &str, args: Vec<HostArg>) -> Result<Value>;

    /// Start a callback-style call. Returns the host task for APIs that
    /// produce one (uploads, downloads, sockets).
    fn invoke_with_callbacks(&self, name: &str, call: ApiCall)
        -> Result<Option<Arc<dyn HostTask>>>;

    /// Host environment descriptor (user data paths and similar).
    fn env(&self) -> Value {
        Value::Null
    }
}

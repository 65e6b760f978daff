//! # Host Bridge Traits
//!
//! Contracts between the adapter core and the mini-program host it runs on.
//!
//! ## Overview
//!
//! The host offers a callback-style, capability-limited surface: one network
//! primitive with no concurrency bound, a table of named APIs that may or may
//! not exist, and a console. Each trait here names one of those capabilities
//! so the core can be written against it and tested without a host.
//!
//! ## Traits
//!
//! - [`HostTransport`](transport::HostTransport) - the single-request network primitive
//! - [`HostTask`](transport::HostTask) - live handle to a dispatched request (`abort`, progress)
//! - [`HostApi`](api::HostApi) - named API table (`has_api`, forwarded and callback calls)
//! - [`PreloadCache`](preload::PreloadCache) - framework page cache used by navigation preload
//! - [`LoggerSink`](log::LoggerSink) - forward structured logs to the host console
//!
//! ## Error Handling
//!
//! Bridge calls report [`BridgeError`](error::BridgeError). Request-level
//! failures are not errors at this layer: they travel through the
//! descriptor's `fail` callback as a [`RequestFailure`](request::RequestFailure).
//!
//! ## Thread Safety
//!
//! Every trait requires `Send + Sync` and every callback is `Send`, so host
//! bindings may complete requests from any thread.

pub mod api;
pub mod error;
pub mod log;
pub mod preload;
pub mod request;
pub mod transport;

pub use error::BridgeError;

pub use api::{ApiCall, ApiCallback, ApiListener, HostApi, HostArg};
pub use log::{ConsoleLogger, LogEntry, LogLevel, LoggerSink};
pub use preload::{CacheEntry, PreloadCache, PreloadPage};
pub use request::{
    HttpMethod, RequestCallbacks, RequestDescriptor, RequestFailure, RequestOptions,
    RequestOutcome, RequestSuccess,
};
pub use transport::{FinishedTask, HostTask, HostTransport, ProgressCallback, ProgressUpdate};

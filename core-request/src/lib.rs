//! # Core Request
//!
//! The adapter's request pipeline:
//!
//! ```text
//! Link::request -> interceptors -> RequestClient -> RequestQueue -> HostTransport
//! ```
//!
//! - [`queue`]: bounded FIFO dispatcher in front of the host primitive
//! - [`pending`]: callback-to-future wrapper with abort and progress
//! - [`interceptor`]: middleware chain ending at the request client
//! - [`interceptors`]: logging and timeout interceptors
//! - [`settle`]: settle-once state machine shared with the API normalizer

pub mod error;
pub mod interceptor;
pub mod interceptors;
pub mod pending;
pub mod queue;
pub mod settle;

pub use error::{RequestError, Result};
pub use interceptor::{
    interceptor_fn, AbortHandle, Chain, FnInterceptor, InterceptedRequest, Interceptor, Link,
    TerminalLink,
};
pub use interceptors::{LogInterceptor, TimeoutInterceptor, DEFAULT_REQUEST_TIMEOUT};
pub use pending::{PendingRequest, RequestClient, RequestControl};
pub use queue::{QueueEntry, QueueStats, RequestQueue, RequestTicket};
pub use settle::{SettleWatch, Settlement};

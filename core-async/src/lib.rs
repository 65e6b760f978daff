//! Runtime shim for the mini-program adapter.
//!
//! The request pipeline is driven by host callbacks, but the futures it hands
//! back to the framework still need an executor, a oneshot channel to bridge
//! callbacks into futures, and a timer for timeout interceptors. Everything
//! comes from Tokio today; adapter crates go through this crate so the
//! executor can be swapped per host without touching them.
//!
//! # Modules
//!
//! - `runtime`: blocking entry points and runtime handles
//! - `sync`: channels used to bridge callbacks into futures
//! - `task`: task spawning
//! - `time`: sleep / timeout
//!
//! # Examples
//!
//! ```rust
//! use core_async::sync::oneshot;
//!
//! let (tx, rx) = oneshot::channel::<u16>();
//! tx.send(200).unwrap();
//! assert_eq!(core_async::runtime::block_on(rx).unwrap(), 200);
//! ```

// Re-export the async test/entry macros so downstream crates never need
// direct Tokio dependencies.
pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use futures::future::BoxFuture;
pub use task::spawn;
pub use time::{sleep, timeout, Duration, Instant};

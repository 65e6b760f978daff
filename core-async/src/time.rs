//! Timers.
//!
//! The adapter core has no timeout of its own; `timeout` is what timeout
//! interceptors race the rest of the chain against.

pub use tokio::time::{sleep, timeout, Sleep, Timeout};

pub use std::time::{Duration, Instant};

/// Error returned by [`timeout`] when the deadline passes first.
pub use tokio::time::error::Elapsed;

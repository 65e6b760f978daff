//! Channels and async locks.
//!
//! `oneshot` carries a single settlement from a host callback to the future
//! returned to the caller; `broadcast` backs the adapter event bus.

pub use tokio::sync::{broadcast, mpsc, oneshot, Mutex, MutexGuard, Notify};

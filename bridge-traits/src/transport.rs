//! Host network primitive.
//!
//! The host performs one request per call and reports back through the
//! descriptor's callbacks. It gives no concurrency bound and no cancellation
//! beyond the returned task handle; the adapter core layers both on top.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::request::RequestDescriptor;

/// Transfer progress reported by upload/download-shaped tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Percentage, 0..=100
    pub progress: u8,
    pub total_bytes_transferred: u64,
    pub total_bytes_expected: u64,
}

pub type ProgressCallback = Box<dyn Fn(ProgressUpdate) + Send + Sync>;

/// Live handle to a dispatched host request.
///
/// Calling `abort` on a task that already finished must be harmless; the host
/// still reports the outcome through the descriptor callbacks.
pub trait HostTask: Send + Sync {
    fn abort(&self);

    /// Register a progress listener. Tasks that never report progress may
    /// ignore it.
    fn on_progress_update(&self, callback: ProgressCallback) {
        let _ = callback;
    }
}

/// The host's single-request primitive.
///
/// # Contract
///
/// The host calls exactly one of the descriptor's `success` / `fail`, once,
/// followed by `complete` once. It may do so synchronously from inside
/// `request`.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::transport::{HostTask, HostTransport};
/// use bridge_traits::request::{RequestDescriptor, RequestOutcome, RequestSuccess};
///
/// struct Echo;
/// struct Done;
/// impl HostTask for Done { fn abort(&self) {} }
///
/// impl HostTransport for Echo {
///     fn request(&self, descriptor: RequestDescriptor) -> Arc<dyn HostTask> {
///         let body = serde_json::json!({ "url": descriptor.options.url });
///         descriptor.finish(RequestOutcome::Success(RequestSuccess::new(200, body)));
///         Arc::new(Done)
///     }
/// }
/// ```
pub trait HostTransport: Send + Sync {
    fn request(&self, descriptor: RequestDescriptor) -> Arc<dyn HostTask>;
}

/// Task handle for hosts that complete synchronously and have nothing to
/// cancel.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinishedTask;

impl HostTask for FinishedTask {
    fn abort(&self) {}
}

//! Futures returned by promisified host APIs.

use crate::error::ApiError;
use bridge_traits::{HostTask, ProgressUpdate};
use core_async::sync::oneshot;
use core_request::SettleWatch;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

/// Which extra behavior a promisified call exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromiseKind {
    Plain,
    /// `uploadFile` / `downloadFile`: `progress` and `abort` reach the task
    Transfer,
    /// `connectSocket`: the task is handed back with the success payload
    Socket,
}

impl PromiseKind {
    pub fn for_api(name: &str) -> Self {
        match name {
            "uploadFile" | "downloadFile" => Self::Transfer,
            "connectSocket" => Self::Socket,
            _ => Self::Plain,
        }
    }
}

/// Success value of a promisified call.
#[derive(Clone)]
pub struct ApiSuccess {
    pub payload: Value,
    /// Socket task for `connectSocket`
    pub task: Option<Arc<dyn HostTask>>,
}

impl fmt::Debug for ApiSuccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiSuccess")
            .field("payload", &self.payload)
            .field("task", &self.task.as_ref().map(|_| "HostTask { ... }"))
            .finish()
    }
}

pub(crate) type TaskCell = Arc<Mutex<Option<Arc<dyn HostTask>>>>;

/// Pending result of a promisified host call.
pub struct ApiPromise {
    kind: PromiseKind,
    receiver: oneshot::Receiver<Result<Value, Value>>,
    settled: SettleWatch<Value, Value>,
    task: TaskCell,
}

impl ApiPromise {
    pub(crate) fn new(
        kind: PromiseKind,
        receiver: oneshot::Receiver<Result<Value, Value>>,
        settled: SettleWatch<Value, Value>,
        task: TaskCell,
    ) -> Self {
        Self {
            kind,
            receiver,
            settled,
            task,
        }
    }

    pub fn kind(&self) -> PromiseKind {
        self.kind
    }

    /// Listen for upload/download progress. No-op for other APIs and once
    /// the call has settled.
    pub fn progress(&self, callback: impl Fn(ProgressUpdate) + Send + Sync + 'static) -> &Self {
        if let Some(task) = self.live_transfer_task() {
            task.on_progress_update(Box::new(callback));
        }
        self
    }

    /// Abort an upload/download. No-op for other APIs and once the call has
    /// settled.
    pub fn abort(&self) -> &Self {
        if let Some(task) = self.live_transfer_task() {
            task.abort();
        }
        self
    }

    /// Run `callback`, then abort.
    pub fn abort_with(&self, callback: impl FnOnce()) -> &Self {
        callback();
        self.abort()
    }

    fn live_transfer_task(&self) -> Option<Arc<dyn HostTask>> {
        if self.kind != PromiseKind::Transfer || self.settled.is_settled() {
            return None;
        }
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Future for ApiPromise {
    type Output = Result<ApiSuccess, ApiError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let received = match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(received) => received,
            Poll::Pending => return Poll::Pending,
        };

        Poll::Ready(match received {
            Ok(Ok(payload)) => {
                let task = match self.kind {
                    PromiseKind::Socket => self
                        .task
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone(),
                    _ => None,
                };
                Ok(ApiSuccess { payload, task })
            }
            Ok(Err(payload)) => Err(ApiError::Fail(payload)),
            Err(_) => Err(ApiError::Abandoned),
        })
    }
}

impl fmt::Debug for ApiPromise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiPromise")
            .field("kind", &self.kind)
            .field("settled", &self.settled.is_settled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::ProgressCallback;
    use core_request::Settlement;
    use mockall::mock;

    mock! {
        Task {}

        impl HostTask for Task {
            fn abort(&self);
            fn on_progress_update(&self, callback: ProgressCallback);
        }
    }

    #[test]
    fn test_kind_for_api() {
        assert_eq!(PromiseKind::for_api("uploadFile"), PromiseKind::Transfer);
        assert_eq!(PromiseKind::for_api("downloadFile"), PromiseKind::Transfer);
        assert_eq!(PromiseKind::for_api("connectSocket"), PromiseKind::Socket);
        assert_eq!(PromiseKind::for_api("showToast"), PromiseKind::Plain);
    }

    #[core_async::test]
    async fn test_fail_payload_is_exposed() {
        let (settlement, receiver) = Settlement::new();
        let promise = ApiPromise::new(
            PromiseKind::Plain,
            receiver,
            settlement.watch(),
            Arc::new(Mutex::new(None)),
        );
        settlement.fail(serde_json::json!({ "errMsg": "getLocation:fail auth deny" }), |_| {});

        let error = promise.await.unwrap_err();
        assert_eq!(error.err_msg(), Some("getLocation:fail auth deny"));
    }

    #[core_async::test]
    async fn test_lost_callbacks_resolve_abandoned() {
        let (settlement, receiver) = Settlement::new();
        let promise = ApiPromise::new(
            PromiseKind::Transfer,
            receiver,
            settlement.watch(),
            Arc::new(Mutex::new(None)),
        );
        drop(settlement);

        assert!(matches!(promise.await, Err(ApiError::Abandoned)));
    }

    #[test]
    fn test_abort_after_abandon_is_noop() {
        let (settlement, receiver) = Settlement::new();
        let mut task = MockTask::new();
        task.expect_abort().times(0);
        let task: Arc<dyn HostTask> = Arc::new(task);
        let promise = ApiPromise::new(
            PromiseKind::Transfer,
            receiver,
            settlement.watch(),
            Arc::new(Mutex::new(Some(task))),
        );
        drop(settlement);

        promise.abort();
    }
}

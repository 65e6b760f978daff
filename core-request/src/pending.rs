//! Promise-style wrapper around the bounded queue.
//!
//! [`RequestClient::request`] turns one callback-style descriptor into a
//! [`PendingRequest`] future. The caller's own `success` / `fail` /
//! `complete` callbacks are kept and run before the future resolves.

use crate::error::RequestError;
use crate::queue::{RequestQueue, RequestTicket};
use crate::settle::Settlement;
use bridge_traits::{
    ProgressUpdate, RequestCallbacks, RequestDescriptor, RequestFailure, RequestSuccess,
};
use core_async::sync::oneshot;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Submits descriptors to a [`RequestQueue`] and hands back futures.
#[derive(Clone, Debug)]
pub struct RequestClient {
    queue: RequestQueue,
}

impl RequestClient {
    pub fn new(queue: RequestQueue) -> Self {
        Self { queue }
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    /// Submit a request.
    ///
    /// Accepts a bare URL or full options; both produce the same descriptor.
    /// The request is queued immediately, whether or not the returned future
    /// is polled.
    pub fn request(&self, request: impl Into<RequestDescriptor>) -> PendingRequest {
        let RequestDescriptor { options, callbacks } = request.into();
        let RequestCallbacks {
            success,
            fail,
            complete,
        } = callbacks;

        let (settlement, receiver) = Settlement::<RequestSuccess, RequestFailure>::new();
        let on_success = settlement.clone();
        let on_fail = settlement;

        let mut descriptor = RequestDescriptor::new(options).on_success(move |response| {
            on_success.succeed(response, |response| {
                if let Some(callback) = success {
                    callback(response.clone());
                }
            });
        });
        descriptor = descriptor.on_fail(move |failure| {
            on_fail.fail(failure, |failure| {
                if let Some(callback) = fail {
                    callback(failure.clone());
                }
            });
        });
        descriptor.callbacks.complete = complete;

        let ticket = self.queue.submit(descriptor);
        PendingRequest {
            receiver,
            control: RequestControl { ticket },
        }
    }
}

/// Cancellation and progress handle detached from the future.
#[derive(Clone, Debug)]
pub struct RequestControl {
    ticket: RequestTicket,
}

impl RequestControl {
    pub fn id(&self) -> u64 {
        self.ticket.id()
    }

    /// Abort the request. No-op once it has settled.
    pub fn abort(&self) {
        self.ticket.abort();
    }

    /// Run `callback`, then abort.
    pub fn abort_with(&self, callback: impl FnOnce()) {
        callback();
        self.abort();
    }

    /// Listen for transfer progress. Registered on the host task once the
    /// request is dispatched.
    pub fn on_progress(&self, callback: impl Fn(ProgressUpdate) + Send + Sync + 'static) {
        self.ticket.on_progress_update(Box::new(callback));
    }

    pub fn is_finished(&self) -> bool {
        self.ticket.is_finished()
    }
}

/// Future for one queued request.
///
/// Resolves with the host's `success` payload, or fails with
/// [`RequestError::Fail`] carrying the `fail` payload. Resolves to
/// [`RequestError::Abandoned`] if the host drops the request without
/// settling it.
pub struct PendingRequest {
    receiver: oneshot::Receiver<Result<RequestSuccess, RequestFailure>>,
    control: RequestControl,
}

impl PendingRequest {
    pub fn id(&self) -> u64 {
        self.control.id()
    }

    pub fn control(&self) -> RequestControl {
        self.control.clone()
    }

    pub fn abort(&self) -> &Self {
        self.control.abort();
        self
    }

    pub fn abort_with(&self, callback: impl FnOnce()) -> &Self {
        self.control.abort_with(callback);
        self
    }

    pub fn on_progress(&self, callback: impl Fn(ProgressUpdate) + Send + Sync + 'static) -> &Self {
        self.control.on_progress(callback);
        self
    }
}

impl Future for PendingRequest {
    type Output = Result<RequestSuccess, RequestError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(|received| match received {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(failure)) => Err(RequestError::Fail(failure)),
            Err(_) => Err(RequestError::Abandoned),
        })
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("control", &self.control)
            .finish()
    }
}

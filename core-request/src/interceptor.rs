//! # Interceptor Chain
//!
//! Ordered request middleware in front of a fixed terminal link.
//!
//! Each [`Interceptor`] receives a [`Chain`]: the request parameters plus the
//! continuation. It may rewrite the parameters, call
//! [`proceed`](Chain::proceed) to run the rest of the chain, and inspect or
//! replace the result on the way back. Interceptors therefore run in
//! registration order on the way in and in reverse order on the way out.
//! Returning an error without proceeding short-circuits everything after.
//!
//! The chain always ends at a [`TerminalLink`], which in the adapter is the
//! [`RequestClient`] feeding the bounded queue.
//!
//! [`Link::request`] starts the chain before it returns: interceptors run up
//! to their first real suspension point, so a chain that proceeds without
//! waiting reaches the queue in call order. Inside a runtime the rest of the
//! chain is spawned, and the request completes even if the returned
//! [`InterceptedRequest`] is dropped.
//!
//! ## Usage
//!
//! ```ignore
//! use core_request::interceptor::{interceptor_fn, Link};
//!
//! let link = Link::new(Arc::new(client));
//! link.add_interceptor(interceptor_fn(|mut chain| async move {
//!     chain
//!         .request_params_mut()
//!         .header
//!         .insert("x-app".into(), "demo".into());
//!     chain.proceed().await
//! }));
//!
//! let response = link.request("https://api.example.com/user").await?;
//! ```

use crate::error::{RequestError, Result};
use crate::pending::{PendingRequest, RequestClient, RequestControl};
use async_trait::async_trait;
use bridge_traits::{RequestDescriptor, RequestOptions, RequestSuccess};
use core_async::runtime::Handle;
use core_async::task::JoinHandle;
use core_async::BoxFuture;
use futures::task::noop_waker_ref;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::task::{Context, Poll};
use tracing::warn;

/// Request middleware.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn intercept(&self, chain: Chain) -> Result<RequestSuccess>;
}

/// End of every chain: performs the actual request.
pub trait TerminalLink: Send + Sync {
    fn dispatch(&self, descriptor: RequestDescriptor) -> PendingRequest;
}

impl TerminalLink for RequestClient {
    fn dispatch(&self, descriptor: RequestDescriptor) -> PendingRequest {
        self.request(descriptor)
    }
}

/// Interceptor built from an async closure. See [`interceptor_fn`].
pub struct FnInterceptor<F> {
    f: F,
}

/// Wrap an async closure as an [`Interceptor`].
pub fn interceptor_fn<F, Fut>(f: F) -> FnInterceptor<F>
where
    F: Fn(Chain) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RequestSuccess>> + Send + 'static,
{
    FnInterceptor { f }
}

#[async_trait]
impl<F, Fut> Interceptor for FnInterceptor<F>
where
    F: Fn(Chain) -> Fut + Send + Sync,
    Fut: Future<Output = Result<RequestSuccess>> + Send + 'static,
{
    async fn intercept(&self, chain: Chain) -> Result<RequestSuccess> {
        (self.f)(chain).await
    }
}

enum AbortState {
    Idle,
    Requested,
    Registered(RequestControl),
}

/// Abort handle shared by every interceptor of one chain invocation.
///
/// Aborting before the terminal link has submitted the request is
/// remembered and applied as soon as it does.
#[derive(Clone)]
pub struct AbortHandle {
    state: Arc<Mutex<AbortState>>,
}

impl AbortHandle {
    fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(AbortState::Idle)),
        }
    }

    pub fn abort(&self) {
        let control = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match &*state {
                AbortState::Registered(control) => control.clone(),
                AbortState::Idle | AbortState::Requested => {
                    *state = AbortState::Requested;
                    return;
                }
            }
        };
        control.abort();
    }

    pub fn is_requested(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(PoisonError::into_inner),
            AbortState::Requested
        )
    }

    fn register(&self, control: RequestControl) {
        let abort_now = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let requested = matches!(*state, AbortState::Requested);
            *state = AbortState::Registered(control.clone());
            requested
        };
        if abort_now {
            control.abort();
        }
    }
}

impl fmt::Debug for AbortHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match *self.state.lock().unwrap_or_else(PoisonError::into_inner) {
            AbortState::Idle => "Idle",
            AbortState::Requested => "Requested",
            AbortState::Registered(_) => "Registered",
        };
        f.debug_struct("AbortHandle").field("state", &state).finish()
    }
}

/// Request parameters plus the rest of the chain.
pub struct Chain {
    descriptor: RequestDescriptor,
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    index: usize,
    terminal: Arc<dyn TerminalLink>,
    abort: AbortHandle,
}

impl Chain {
    pub fn request_params(&self) -> &RequestOptions {
        &self.descriptor.options
    }

    pub fn request_params_mut(&mut self) -> &mut RequestOptions {
        &mut self.descriptor.options
    }

    /// Full descriptor, including the caller's callbacks.
    pub fn descriptor_mut(&mut self) -> &mut RequestDescriptor {
        &mut self.descriptor
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Run the remaining interceptors, then the terminal link.
    pub async fn proceed(mut self) -> Result<RequestSuccess> {
        let next = self.interceptors.get(self.index).cloned();
        match next {
            Some(next) => {
                self.index += 1;
                next.intercept(self).await
            }
            None => {
                let pending = self.terminal.dispatch(self.descriptor);
                self.abort.register(pending.control());
                pending.await
            }
        }
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("url", &self.descriptor.options.url)
            .field("index", &self.index)
            .field("len", &self.interceptors.len())
            .finish()
    }
}

/// The interceptor list and its terminal link.
pub struct Link {
    terminal: Arc<dyn TerminalLink>,
    interceptors: RwLock<Vec<Arc<dyn Interceptor>>>,
}

impl Link {
    pub fn new(terminal: Arc<dyn TerminalLink>) -> Self {
        Self {
            terminal,
            interceptors: RwLock::new(Vec::new()),
        }
    }

    /// Start a request through the current interceptors.
    ///
    /// The interceptor list is snapshotted here; later `add_interceptor` or
    /// `clean_interceptors` calls do not affect this request. The chain is
    /// polled once before returning, and whatever is left of it is spawned on
    /// the current runtime. Without a runtime the remainder only runs when
    /// the returned future is polled.
    pub fn request(&self, request: impl Into<RequestDescriptor>) -> InterceptedRequest {
        let interceptors: Arc<[Arc<dyn Interceptor>]> = self
            .interceptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();

        let abort = AbortHandle::new();
        let chain = Chain {
            descriptor: request.into(),
            interceptors,
            index: 0,
            terminal: Arc::clone(&self.terminal),
            abort: abort.clone(),
        };

        InterceptedRequest {
            flight: Flight::start(Box::pin(chain.proceed())),
            abort,
        }
    }

    pub fn add_interceptor(&self, interceptor: impl Interceptor + 'static) {
        self.add_shared(Arc::new(interceptor));
    }

    pub fn add_shared(&self, interceptor: Arc<dyn Interceptor>) {
        self.interceptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(interceptor);
    }

    /// Remove every interceptor. The terminal link stays.
    pub fn clean_interceptors(&self) {
        self.interceptors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn interceptor_count(&self) -> usize {
        self.interceptors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("interceptors", &self.interceptor_count())
            .finish()
    }
}

/// Where a started chain is running.
enum Flight {
    /// Finished during the first poll
    Ready(Option<Result<RequestSuccess>>),
    Spawned(JoinHandle<Result<RequestSuccess>>),
    /// No runtime to spawn on; driven by the caller
    Local(BoxFuture<'static, Result<RequestSuccess>>),
}

impl Flight {
    fn start(mut future: BoxFuture<'static, Result<RequestSuccess>>) -> Self {
        let runtime = Handle::try_current().ok();
        // Wakers are replaced on every poll, so a no-op one is fine here.
        let mut cx = Context::from_waker(noop_waker_ref());
        let first = match &runtime {
            Some(handle) => {
                let _entered = handle.enter();
                future.as_mut().poll(&mut cx)
            }
            None => future.as_mut().poll(&mut cx),
        };

        match (first, runtime) {
            (Poll::Ready(result), _) => Self::Ready(Some(result)),
            (Poll::Pending, Some(handle)) => Self::Spawned(handle.spawn(future)),
            (Poll::Pending, None) => Self::Local(future),
        }
    }
}

/// A request running through a [`Link`].
///
/// Dropping it does not cancel the request; use [`abort`](Self::abort).
pub struct InterceptedRequest {
    flight: Flight,
    abort: AbortHandle,
}

impl InterceptedRequest {
    /// Abort the underlying request, now or as soon as it is submitted.
    pub fn abort(&self) -> &Self {
        self.abort.abort();
        self
    }

    pub fn abort_with(&self, callback: impl FnOnce()) -> &Self {
        callback();
        self.abort()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }
}

impl Future for InterceptedRequest {
    type Output = Result<RequestSuccess>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.flight {
            Flight::Ready(result) => {
                Poll::Ready(result.take().unwrap_or(Err(RequestError::Abandoned)))
            }
            Flight::Local(future) => future.as_mut().poll(cx),
            Flight::Spawned(handle) => Pin::new(handle).poll(cx).map(|joined| match joined {
                Ok(result) => result,
                Err(error) if error.is_panic() => std::panic::resume_unwind(error.into_panic()),
                Err(error) => {
                    warn!(error = %error, "Request task cancelled before settling");
                    Err(RequestError::Abandoned)
                }
            }),
        }
    }
}

impl fmt::Debug for InterceptedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptedRequest")
            .field("abort", &self.abort)
            .finish()
    }
}

//! # Bounded Request Queue
//!
//! The host's request primitive has no concurrency limit of its own, and
//! most hosts start failing requests once too many are open at once. The
//! queue admits any number of descriptors but keeps at most
//! `max_concurrent` of them dispatched to the host, admitting the rest in
//! FIFO order as earlier ones complete.
//!
//! ## Dispatch
//!
//! Each dispatched descriptor gets its `complete` callback wrapped. The
//! wrapper runs the caller's `complete`, then releases the slot, then drains
//! the next backlog entry, all within the host's completion call. The state
//! lock is never held while the host is called, so hosts that complete
//! synchronously from inside `request` re-enter the queue safely.
//!
//! Only one drain loop runs at a time. A drain started while another is
//! already admitting returns at once and leaves the freed slot to the running
//! loop, so a long backlog of synchronously completing requests is admitted
//! iteratively instead of one stack frame per entry.
//!
//! If the host drops a descriptor without ever calling `complete`, a drop
//! guard inside the wrapper still releases the slot.
//!
//! ## Cancellation
//!
//! A [`RequestTicket`] aborts its request wherever it is:
//! - still in the backlog: removed and settled with `"request:fail abort"`
//! - dequeued but not yet attached to a host task: aborted on attach
//! - dispatched: the host task is aborted
//! - finished: no-op

use bridge_traits::{
    HostTask, HostTransport, ProgressCallback, RequestDescriptor, RequestFailure, RequestOutcome,
};
use core_runtime::config::AdapterConfig;
use core_runtime::events::{AdapterEvent, EventBus, RequestEvent};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Snapshot of queue occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub in_flight: usize,
    pub backlog: usize,
    pub max_concurrent: usize,
}

/// A descriptor waiting in the backlog.
pub struct QueueEntry {
    id: u64,
    descriptor: RequestDescriptor,
    slot: Arc<TaskSlot>,
}

impl QueueEntry {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn options(&self) -> &bridge_traits::RequestOptions {
        &self.descriptor.options
    }
}

impl fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("id", &self.id)
            .field("url", &self.descriptor.options.url)
            .finish()
    }
}

enum SlotState {
    Queued,
    /// Dequeued, host call in progress
    Dispatching { abort_requested: bool },
    Dispatched(Arc<dyn HostTask>),
    Cancelled,
    Finished,
}

struct SlotInner {
    state: SlotState,
    progress: Vec<ProgressCallback>,
}

/// Where one request is in its lifecycle, and its host task once it has one.
struct TaskSlot {
    inner: Mutex<SlotInner>,
}

impl TaskSlot {
    fn new() -> Self {
        Self {
            inner: Mutex::new(SlotInner {
                state: SlotState::Queued,
                progress: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_dispatch(&self) {
        let mut inner = self.lock();
        if matches!(inner.state, SlotState::Queued) {
            inner.state = SlotState::Dispatching {
                abort_requested: false,
            };
        }
    }

    /// Store the host task returned by the transport.
    fn attach(&self, task: &Arc<dyn HostTask>) {
        let (abort, progress) = {
            let mut inner = self.lock();
            let progress = std::mem::take(&mut inner.progress);
            match inner.state {
                SlotState::Dispatching { abort_requested } => {
                    inner.state = SlotState::Dispatched(Arc::clone(task));
                    (abort_requested, progress)
                }
                // Host completed synchronously inside `request`
                _ => (false, Vec::new()),
            }
        };

        for callback in progress {
            task.on_progress_update(callback);
        }
        if abort {
            task.abort();
        }
    }

    fn finish(&self) {
        let mut inner = self.lock();
        inner.state = SlotState::Finished;
        inner.progress.clear();
    }

    fn task(&self) -> Option<Arc<dyn HostTask>> {
        match &self.lock().state {
            SlotState::Dispatched(task) => Some(Arc::clone(task)),
            _ => None,
        }
    }
}

struct QueueState {
    backlog: VecDeque<QueueEntry>,
    in_flight: usize,
    /// A drain loop is admitting entries
    draining: bool,
}

struct QueueInner {
    transport: Arc<dyn HostTransport>,
    max_concurrent: usize,
    state: Mutex<QueueState>,
    next_id: AtomicU64,
    events: Option<EventBus>,
}

/// Bounded FIFO dispatcher in front of a [`HostTransport`].
///
/// Cheap to clone; clones share the same backlog and counters.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

impl RequestQueue {
    /// `max_concurrent` below 1 is treated as 1.
    pub fn new(transport: Arc<dyn HostTransport>, max_concurrent: usize) -> Self {
        Self::build(transport, max_concurrent, None)
    }

    pub fn with_event_bus(
        transport: Arc<dyn HostTransport>,
        max_concurrent: usize,
        events: EventBus,
    ) -> Self {
        Self::build(transport, max_concurrent, Some(events))
    }

    pub fn from_config(config: &AdapterConfig) -> Self {
        Self::build(
            Arc::clone(&config.transport),
            config.max_concurrent,
            config.event_bus.clone(),
        )
    }

    fn build(
        transport: Arc<dyn HostTransport>,
        max_concurrent: usize,
        events: Option<EventBus>,
    ) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                transport,
                max_concurrent: max_concurrent.max(1),
                state: Mutex::new(QueueState {
                    backlog: VecDeque::new(),
                    in_flight: 0,
                    draining: false,
                }),
                next_id: AtomicU64::new(1),
                events,
            }),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.inner.max_concurrent
    }

    pub fn stats(&self) -> QueueStats {
        let state = self.lock();
        QueueStats {
            in_flight: state.in_flight,
            backlog: state.backlog.len(),
            max_concurrent: self.inner.max_concurrent,
        }
    }

    /// Append a descriptor to the backlog and drain.
    ///
    /// The returned ticket tracks this descriptor; its
    /// [`task`](RequestTicket::task) is already set when the drain dispatched
    /// it immediately.
    pub fn submit(&self, descriptor: RequestDescriptor) -> RequestTicket {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let slot = Arc::new(TaskSlot::new());

        let backlog = {
            let mut state = self.lock();
            state.backlog.push_back(QueueEntry {
                id,
                descriptor,
                slot: Arc::clone(&slot),
            });
            state.backlog.len()
        };
        debug!(request_id = id, backlog, "Request queued");
        self.emit(RequestEvent::Queued {
            request_id: id,
            backlog,
        });

        self.drain();

        RequestTicket {
            id,
            slot,
            queue: self.clone(),
        }
    }

    /// Dispatch backlog entries while slots are free.
    ///
    /// Returns the host task of the first descriptor dispatched, or `None`
    /// when the backlog is empty, every slot is taken, or another drain is
    /// already running. That drain admits whatever this call would have.
    pub fn drain(&self) -> Option<Arc<dyn HostTask>> {
        let mut first = None;
        let mut state = self.lock();
        if state.draining {
            return None;
        }
        state.draining = true;

        loop {
            // Checked and cleared under one lock so a slot freed elsewhere is
            // either seen here or drained by its own completion.
            let Some((entry, in_flight)) = self.admit(&mut state) else {
                state.draining = false;
                return first;
            };
            drop(state);

            debug!(request_id = entry.id, in_flight, "Dispatching request");
            self.emit(RequestEvent::Dispatched {
                request_id: entry.id,
                in_flight,
            });

            let task = self.dispatch(entry);
            first.get_or_insert(task);
            state = self.lock();
        }
    }

    fn admit(&self, state: &mut QueueState) -> Option<(QueueEntry, usize)> {
        if state.in_flight >= self.inner.max_concurrent {
            return None;
        }
        let entry = state.backlog.pop_front()?;
        entry.slot.begin_dispatch();
        state.in_flight += 1;
        Some((entry, state.in_flight))
    }

    fn dispatch(&self, entry: QueueEntry) -> Arc<dyn HostTask> {
        let QueueEntry {
            id,
            mut descriptor,
            slot,
        } = entry;

        let original = descriptor.callbacks.complete.take();
        let mut release = SlotRelease {
            queue: self.clone(),
            id,
            slot: Arc::clone(&slot),
            released: false,
        };
        descriptor.callbacks.complete = Some(Box::new(move |outcome: RequestOutcome| {
            let success = outcome.is_success();
            if let Some(complete) = original {
                complete(outcome);
            }
            release.release(success);
        }));

        let task = self.inner.transport.request(descriptor);
        slot.attach(&task);
        task
    }

    fn complete(&self, id: u64, success: bool) {
        let in_flight = {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            state.in_flight
        };
        debug!(request_id = id, success, in_flight, "Request completed");
        self.emit(RequestEvent::Completed {
            request_id: id,
            success,
            in_flight,
        });

        self.drain();
    }

    /// Abort request `id`. Returns `false` when it had already finished.
    fn cancel(&self, id: u64, slot: &TaskSlot) -> bool {
        let removed = {
            let mut state = self.lock();
            let position = state.backlog.iter().position(|entry| entry.id == id);
            position.and_then(|index| state.backlog.remove(index))
        };

        if let Some(entry) = removed {
            entry.slot.lock().state = SlotState::Cancelled;
            debug!(request_id = id, "Request cancelled before dispatch");
            self.emit(RequestEvent::Cancelled { request_id: id });
            entry
                .descriptor
                .finish(RequestOutcome::Fail(RequestFailure::aborted()));
            return true;
        }

        let task = {
            let mut inner = slot.lock();
            match &mut inner.state {
                SlotState::Dispatching { abort_requested } => {
                    *abort_requested = true;
                    return true;
                }
                SlotState::Dispatched(task) => Arc::clone(task),
                SlotState::Queued | SlotState::Cancelled | SlotState::Finished => return false,
            }
        };
        task.abort();
        true
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: RequestEvent) {
        if let Some(events) = &self.inner.events {
            let _ = events.emit(AdapterEvent::Request(event));
        }
    }
}

impl fmt::Debug for RequestQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestQueue")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Releases a dispatched request's slot exactly once, even when the host
/// never calls `complete`.
struct SlotRelease {
    queue: RequestQueue,
    id: u64,
    slot: Arc<TaskSlot>,
    released: bool,
}

impl SlotRelease {
    fn release(&mut self, success: bool) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }
        self.slot.finish();
        self.queue.complete(self.id, success);
    }
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                request_id = self.id,
                "Host dropped request without calling complete; releasing slot"
            );
            self.release(false);
        }
    }
}

/// Handle to one submitted request.
#[derive(Clone)]
pub struct RequestTicket {
    id: u64,
    slot: Arc<TaskSlot>,
    queue: RequestQueue,
}

impl RequestTicket {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The host task, once dispatched and until it finishes.
    pub fn task(&self) -> Option<Arc<dyn HostTask>> {
        self.slot.task()
    }

    pub fn is_queued(&self) -> bool {
        matches!(self.slot.lock().state, SlotState::Queued)
    }

    pub fn is_finished(&self) -> bool {
        matches!(
            self.slot.lock().state,
            SlotState::Finished | SlotState::Cancelled
        )
    }

    /// Abort the request. Returns `false` if it had already finished.
    pub fn abort(&self) -> bool {
        self.queue.cancel(self.id, &self.slot)
    }

    /// Register a progress listener, deferred until the request is
    /// dispatched if it is still queued. Ignored once finished.
    pub fn on_progress_update(&self, callback: ProgressCallback) {
        let task = {
            let mut inner = self.slot.lock();
            match &inner.state {
                SlotState::Dispatched(task) => Arc::clone(task),
                SlotState::Queued | SlotState::Dispatching { .. } => {
                    inner.progress.push(callback);
                    return;
                }
                SlotState::Cancelled | SlotState::Finished => return,
            }
        };
        task.on_progress_update(callback);
    }
}

impl fmt::Debug for RequestTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTicket")
            .field("id", &self.id)
            .field("queued", &self.is_queued())
            .field("finished", &self.is_finished())
            .finish()
    }
}

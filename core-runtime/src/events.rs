//! # Adapter Event Bus
//!
//! Broadcasts request-pipeline and API-normalizer events to whoever wants to
//! observe them (devtools panels, tests, host telemetry) without coupling the
//! queue to any particular consumer.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{AdapterEvent, EventBus, RequestEvent};
//!
//! let bus = EventBus::new(64);
//! let mut stream = bus.subscribe();
//!
//! bus.emit(AdapterEvent::Request(RequestEvent::Cancelled { request_id: 7 }))
//!     .ok();
//! assert!(matches!(
//!     stream.try_recv(),
//!     Ok(AdapterEvent::Request(RequestEvent::Cancelled { request_id: 7 }))
//! ));
//! ```
//!
//! `emit` fails when nobody is subscribed; emitters treat that as a no-op.
//! Slow subscribers see `RecvError::Lagged` and keep receiving newer events.

use core_async::sync::broadcast::{
    self,
    error::{RecvError, SendError},
    Receiver,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default buffer size for event bus
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 256;

/// Top-level event type carried by the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum AdapterEvent {
    Request(RequestEvent),
    Api(ApiEvent),
}

impl AdapterEvent {
    pub fn description(&self) -> &str {
        match self {
            AdapterEvent::Request(e) => e.description(),
            AdapterEvent::Api(e) => e.description(),
        }
    }
}

/// Lifecycle of one request inside the bounded queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RequestEvent {
    /// Accepted into the backlog
    Queued { request_id: u64, backlog: usize },
    /// Handed to the host transport
    Dispatched { request_id: u64, in_flight: usize },
    /// Host reported completion and the slot was released
    Completed {
        request_id: u64,
        success: bool,
        in_flight: usize,
    },
    /// Removed from the backlog before dispatch
    Cancelled { request_id: u64 },
}

impl RequestEvent {
    pub fn description(&self) -> &str {
        match self {
            RequestEvent::Queued { .. } => "Request queued",
            RequestEvent::Dispatched { .. } => "Request dispatched to host",
            RequestEvent::Completed { .. } => "Request completed",
            RequestEvent::Cancelled { .. } => "Request cancelled before dispatch",
        }
    }

    pub fn request_id(&self) -> u64 {
        match self {
            RequestEvent::Queued { request_id, .. }
            | RequestEvent::Dispatched { request_id, .. }
            | RequestEvent::Completed { request_id, .. }
            | RequestEvent::Cancelled { request_id } => *request_id,
        }
    }
}

/// Events from the named-API normalizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ApiEvent {
    /// A stubbed API was called on a host that lacks it
    Unsupported { name: String },
    /// Navigation preload data stored for a destination page
    PreloadStored { path: String, key: String },
}

impl ApiEvent {
    pub fn description(&self) -> &str {
        match self {
            ApiEvent::Unsupported { .. } => "Unsupported API called",
            ApiEvent::PreloadStored { .. } => "Preload data stored",
        }
    }
}

/// Central broadcast channel for adapter events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AdapterEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    ///
    /// `capacity` is the number of events buffered per subscriber before it
    /// starts lagging.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event; returns the number of subscribers reached.
    pub fn emit(&self, event: AdapterEvent) -> Result<usize, SendError<AdapterEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.sender.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

type EventFilter = Box<dyn Fn(&AdapterEvent) -> bool + Send + Sync>;

/// Subscriber side of the bus, with optional filtering.
pub struct EventStream {
    receiver: Receiver<AdapterEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<AdapterEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned from `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&AdapterEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn matches(&self, event: &AdapterEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    pub async fn recv(&mut self) -> Result<AdapterEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive. `Err(TryRecvError::Empty)` when nothing matching
    /// is buffered.
    pub fn try_recv(&mut self) -> Result<AdapterEvent, broadcast::error::TryRecvError> {
        loop {
            let event = self.receiver.try_recv()?;
            if self.matches(&event) {
                return Ok(event);
            }
        }
    }

    /// Drain every buffered event that passes the filter.
    pub fn drain_ready(&mut self) -> Vec<AdapterEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_fails() {
        let bus = EventBus::new(4);
        let event = AdapterEvent::Request(RequestEvent::Cancelled { request_id: 1 });
        assert!(bus.emit(event).is_err());
    }

    #[core_async::test]
    async fn test_subscriber_receives_event() {
        let bus = EventBus::new(4);
        let mut stream = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let event = AdapterEvent::Request(RequestEvent::Dispatched {
            request_id: 3,
            in_flight: 1,
        });
        assert_eq!(bus.emit(event.clone()).unwrap(), 1);
        assert_eq!(stream.recv().await.unwrap(), event);
    }

    #[test]
    fn test_filtered_stream_skips_other_events() {
        let bus = EventBus::new(8);
        let mut api_only = bus
            .subscribe()
            .filter(|event| matches!(event, AdapterEvent::Api(_)));

        bus.emit(AdapterEvent::Request(RequestEvent::Queued {
            request_id: 1,
            backlog: 1,
        }))
        .unwrap();
        bus.emit(AdapterEvent::Api(ApiEvent::Unsupported {
            name: "vibrateLongX".to_string(),
        }))
        .unwrap();

        let events = api_only.drain_ready();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].description(), "Unsupported API called");
    }

    #[test]
    fn test_request_id_accessor() {
        let event = RequestEvent::Completed {
            request_id: 9,
            success: false,
            in_flight: 0,
        };
        assert_eq!(event.request_id(), 9);
    }

    #[test]
    fn test_event_serialization() {
        let event = AdapterEvent::Api(ApiEvent::PreloadStored {
            path: "pages/detail/index".to_string(),
            key: "k1".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Api");
        let back: AdapterEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}

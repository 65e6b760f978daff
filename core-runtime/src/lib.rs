//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by the adapter crates:
//! - Logging and tracing infrastructure
//! - Adapter configuration and capability validation
//! - Event bus for request-queue and API-normalizer events
//!
//! ## Overview
//!
//! Domain crates (`core-request`, `core-api`) depend on this crate for the
//! configuration they are built from and the events they emit. Nothing here
//! talks to the host directly; host access goes through `bridge-traits`.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{AdapterConfig, AdapterConfigBuilder, ApiLists, PxTransformConfig};
pub use error::{Error, Result};
pub use events::{AdapterEvent, ApiEvent, EventBus, EventStream, RequestEvent};

//! # Desktop Bridge Implementations
//!
//! Stand-in host capabilities for running the adapter off-device (desktop
//! development, integration tests).
//!
//! ## Overview
//!
//! - `HostTransport` using `reqwest`, one Tokio task per request
//! - `PreloadCache` as an in-memory map with UUID keys
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{MemoryPreloadCache, ReqwestTransport};
//! use bridge_traits::{HostTransport, RequestDescriptor};
//!
//! #[core_async::main]
//! async fn main() {
//!     let transport = ReqwestTransport::new().unwrap();
//!     let cache = MemoryPreloadCache::new();
//!
//!     // Use in adapter configuration
//! }
//! ```

mod preload;
mod transport;

pub use preload::MemoryPreloadCache;
pub use transport::ReqwestTransport;

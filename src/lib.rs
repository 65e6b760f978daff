//! Workspace placeholder crate.
//!
//! Host applications depend on `miniapp-adapter` and enable the documented
//! features instead of wiring `core-service`, `core-request` and `core-api`
//! individually.

#[cfg(feature = "desktop-shims")]
pub use core_service::*;

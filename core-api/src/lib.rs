//! # Core API
//!
//! Normalizes the host's named API table into a uniform surface:
//! unsupported APIs become warning stubs, callback-style APIs return
//! futures, everything else is forwarded. Also home to navigation preload
//! and px conversion.
//!
//! `request` is deliberately absent; it goes through `core-request`.

pub mod error;
pub mod navigation;
pub mod normalizer;
pub mod promise;
pub mod px;
pub mod registry;

pub use error::{ApiError, Result};
pub use navigation::{NavigationPreload, PRELOAD_COMPONENT_KEY, PRELOAD_QUERY_KEY};
pub use normalizer::{ApiArg, ApiBinding, ApiOptions, ApiReturn, ComponentRef, NativeApis};
pub use promise::{ApiPromise, ApiSuccess, PromiseKind};
pub use px::px_transform;
pub use registry::{ApiCategory, ApiRegistry};

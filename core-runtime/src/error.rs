//! Errors raised while configuring the adapter runtime.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Rejected configuration value (concurrency bound, px ratios, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A required host bridge was not injected
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// A default desktop shim could not be constructed
    #[error("Host shim unavailable: {0}")]
    Shim(String),
}

pub type Result<T> = std::result::Result<T, Error>;

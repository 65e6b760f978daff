use bridge_traits::BridgeError;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Host error: {0}")]
    Host(#[from] BridgeError),

    /// The name is not in any API list, so nothing was bound for it.
    #[error("API not registered: {0}")]
    NotRegistered(String),

    #[error("No device ratio configured for design width {0}")]
    UnsupportedDesignWidth(u32),

    #[error("Invalid size: {0:?}")]
    InvalidSize(String),

    /// Payload the host passed to `fail`.
    #[error("API call failed: {0}")]
    Fail(Value),

    #[error("API call abandoned by host without settling")]
    Abandoned,
}

impl ApiError {
    /// `errMsg` of a host failure payload, when present.
    pub fn err_msg(&self) -> Option<&str> {
        match self {
            Self::Fail(payload) => payload.get("errMsg").and_then(Value::as_str),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] core_runtime::Error),

    #[error("Request error: {0}")]
    Request(#[from] core_request::RequestError),

    #[error("API error: {0}")]
    Api(#[from] core_api::ApiError),
}

pub type Result<T> = std::result::Result<T, CoreError>;

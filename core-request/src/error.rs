use bridge_traits::RequestFailure;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RequestError {
    /// The host reported failure through `fail`.
    #[error("{0}")]
    Fail(RequestFailure),

    #[error("Interceptor error: {0}")]
    Interceptor(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The host released the request without calling `success` or `fail`.
    #[error("Request abandoned by host without settling")]
    Abandoned,
}

impl RequestError {
    /// True when the request ended because it was aborted.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Fail(failure) if failure.is_abort())
    }

    pub fn failure(&self) -> Option<&RequestFailure> {
        match self {
            Self::Fail(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<RequestFailure> for RequestError {
    fn from(failure: RequestFailure) -> Self {
        Self::Fail(failure)
    }
}

pub type Result<T> = std::result::Result<T, RequestError>;

//! Request descriptors for the host network primitive.
//!
//! A [`RequestDescriptor`] is the record handed to
//! [`HostTransport::request`](crate::transport::HostTransport::request): the
//! plain request options plus the `success` / `fail` / `complete` callback
//! slots the host invokes. The host contract is that exactly one of
//! `success` / `fail` runs, followed by `complete`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// HTTP methods accepted by the host request primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Options,
    #[default]
    Get,
    Head,
    Post,
    Put,
    Delete,
    Trace,
    Connect,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Options => "OPTIONS",
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Trace => "TRACE",
            Self::Connect => "CONNECT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "OPTIONS" => Ok(Self::Options),
            "GET" => Ok(Self::Get),
            "HEAD" => Ok(Self::Head),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            "TRACE" => Ok(Self::Trace),
            "CONNECT" => Ok(Self::Connect),
            other => Err(BridgeError::InvalidArgument(format!(
                "unsupported HTTP method: {}",
                other
            ))),
        }
    }
}

/// Plain-data part of a request descriptor.
///
/// Field names follow the host's JSON shape (`header`, `dataType`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    pub url: String,
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub header: HashMap<String, String>,
    /// Timeout in milliseconds, as the host expects it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<String>,
}

impl RequestOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.header.insert(key.into(), value.into());
        self
    }

    pub fn data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            BridgeError::InvalidArgument(format!("JSON serialization failed: {}", e))
        })?;
        self.data = Some(value);
        self.header
            .insert("content-type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration.as_millis() as u64);
        self
    }

    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_millis)
    }
}

/// Payload handed to `success`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSuccess {
    pub data: Value,
    pub status_code: u16,
    #[serde(default)]
    pub header: HashMap<String, String>,
}

impl RequestSuccess {
    pub fn new(status_code: u16, data: Value) -> Self {
        Self {
            data,
            status_code,
            header: HashMap::new(),
        }
    }

    /// Deserialize `data` into a typed value.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.data.clone()).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status_code)
    }
}

/// Payload handed to `fail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestFailure {
    pub err_msg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub err_no: Option<i32>,
}

impl RequestFailure {
    pub const ABORT_MESSAGE: &'static str = "request:fail abort";

    pub fn new(err_msg: impl Into<String>) -> Self {
        Self {
            err_msg: err_msg.into(),
            err_no: None,
        }
    }

    /// The failure a host reports for a cancelled request.
    pub fn aborted() -> Self {
        Self::new(Self::ABORT_MESSAGE)
    }

    pub fn is_abort(&self) -> bool {
        self.err_msg == Self::ABORT_MESSAGE
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.err_no {
            Some(code) => write!(f, "{} (errno {})", self.err_msg, code),
            None => f.write_str(&self.err_msg),
        }
    }
}

/// What `complete` receives: whichever payload the request settled with.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestOutcome {
    Success(RequestSuccess),
    Fail(RequestFailure),
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

pub type SuccessCallback = Box<dyn FnOnce(RequestSuccess) + Send>;
pub type FailCallback = Box<dyn FnOnce(RequestFailure) + Send>;
pub type CompleteCallback = Box<dyn FnOnce(RequestOutcome) + Send>;

/// Lifecycle callback slots of a descriptor.
#[derive(Default)]
pub struct RequestCallbacks {
    pub success: Option<SuccessCallback>,
    pub fail: Option<FailCallback>,
    pub complete: Option<CompleteCallback>,
}

impl fmt::Debug for RequestCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestCallbacks")
            .field("success", &self.success.is_some())
            .field("fail", &self.fail.is_some())
            .field("complete", &self.complete.is_some())
            .finish()
    }
}

/// A request record with its callback slots, as submitted to the host.
#[derive(Debug, Default)]
pub struct RequestDescriptor {
    pub options: RequestOptions,
    pub callbacks: RequestCallbacks,
}

impl RequestDescriptor {
    pub fn new(options: RequestOptions) -> Self {
        Self {
            options,
            callbacks: RequestCallbacks::default(),
        }
    }

    pub fn on_success(mut self, f: impl FnOnce(RequestSuccess) + Send + 'static) -> Self {
        self.callbacks.success = Some(Box::new(f));
        self
    }

    pub fn on_fail(mut self, f: impl FnOnce(RequestFailure) + Send + 'static) -> Self {
        self.callbacks.fail = Some(Box::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl FnOnce(RequestOutcome) + Send + 'static) -> Self {
        self.callbacks.complete = Some(Box::new(f));
        self
    }

    /// Settle the descriptor the way a host must: `success` or `fail`, then
    /// `complete`. Consumes the descriptor so it cannot be settled twice.
    pub fn finish(self, outcome: RequestOutcome) {
        let RequestCallbacks {
            success,
            fail,
            complete,
        } = self.callbacks;

        match &outcome {
            RequestOutcome::Success(response) => {
                if let Some(cb) = success {
                    cb(response.clone());
                }
            }
            RequestOutcome::Fail(failure) => {
                if let Some(cb) = fail {
                    cb(failure.clone());
                }
            }
        }

        if let Some(cb) = complete {
            cb(outcome);
        }
    }
}

impl From<RequestOptions> for RequestDescriptor {
    fn from(options: RequestOptions) -> Self {
        Self::new(options)
    }
}

impl From<&str> for RequestDescriptor {
    fn from(url: &str) -> Self {
        Self::new(RequestOptions::new(url))
    }
}

impl From<String> for RequestDescriptor {
    fn from(url: String) -> Self {
        Self::new(RequestOptions::new(url))
    }
}

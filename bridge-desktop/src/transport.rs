//! Host transport implementation using Reqwest

use bridge_traits::{
    error::{BridgeError, Result},
    FinishedTask, HostTask, HostTransport, HttpMethod, ProgressCallback, ProgressUpdate,
    RequestDescriptor, RequestFailure, RequestOptions, RequestOutcome, RequestSuccess,
};
use core_async::runtime::Handle;
use core_async::task::AbortHandle;
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

const NO_RUNTIME_MESSAGE: &str = "request:fail no async runtime";
const TIMEOUT_MESSAGE: &str = "request:fail timeout";

type ProgressListener = Arc<dyn Fn(ProgressUpdate) + Send + Sync>;
type ProgressListeners = Arc<Mutex<Vec<ProgressListener>>>;
type DescriptorCell = Arc<Mutex<Option<RequestDescriptor>>>;

/// Reqwest-based stand-in for the host request primitive
///
/// Each request runs as its own task on the current Tokio runtime (or the one
/// the transport was created in). Like a real host, HTTP error statuses are
/// reported through `success`; only network-level problems reach `fail`.
#[derive(Debug)]
pub struct ReqwestTransport {
    client: Client,
    handle: Option<Handle>,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent(concat!("miniapp-adapter/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            handle: Handle::try_current().ok(),
        }
    }

    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Head => reqwest::Method::HEAD,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Trace => reqwest::Method::TRACE,
            HttpMethod::Connect => reqwest::Method::CONNECT,
        }
    }

    fn build_request(&self, options: &RequestOptions) -> reqwest::RequestBuilder {
        let mut req = self
            .client
            .request(Self::convert_method(options.method), &options.url);

        for (key, value) in &options.header {
            req = req.header(key, value);
        }

        // GET/HEAD object data goes into the query string, as hosts do
        match &options.data {
            None | Some(Value::Null) => {}
            Some(Value::Object(fields))
                if matches!(options.method, HttpMethod::Get | HttpMethod::Head) =>
            {
                let pairs: Vec<(String, String)> = fields
                    .iter()
                    .map(|(key, value)| (key.clone(), query_value(value)))
                    .collect();
                req = req.query(&pairs);
            }
            Some(Value::String(text)) => {
                req = req.body(text.clone());
            }
            Some(data) => {
                req = req.json(data);
            }
        }

        if let Some(timeout) = options.timeout_duration() {
            req = req.timeout(timeout);
        }

        req
    }

    fn runtime(&self) -> Option<Handle> {
        Handle::try_current().ok().or_else(|| self.handle.clone())
    }
}

impl HostTransport for ReqwestTransport {
    fn request(&self, descriptor: RequestDescriptor) -> Arc<dyn HostTask> {
        let Some(runtime) = self.runtime() else {
            warn!(url = %descriptor.options.url, "No async runtime for desktop request");
            descriptor.finish(RequestOutcome::Fail(RequestFailure::new(NO_RUNTIME_MESSAGE)));
            return Arc::new(FinishedTask);
        };

        let request = self.build_request(&descriptor.options);
        let data_type = descriptor.options.data_type.clone();
        debug!(
            method = %descriptor.options.method,
            url = %descriptor.options.url,
            "Starting desktop request"
        );

        let task = Arc::new(ReqwestTask {
            descriptor: Arc::new(Mutex::new(Some(descriptor))),
            abort: Mutex::new(None),
            progress: ProgressListeners::default(),
        });

        let cell = Arc::clone(&task.descriptor);
        let progress = Arc::clone(&task.progress);
        let join = runtime.spawn(async move {
            let outcome = perform(request, data_type.as_deref(), &progress).await;
            if let Some(descriptor) = take_descriptor(&cell) {
                descriptor.finish(outcome);
            }
        });
        *task.abort.lock().unwrap_or_else(PoisonError::into_inner) = Some(join.abort_handle());

        task
    }
}

struct ReqwestTask {
    descriptor: DescriptorCell,
    abort: Mutex<Option<AbortHandle>>,
    progress: ProgressListeners,
}

impl HostTask for ReqwestTask {
    fn abort(&self) {
        // Whoever takes the descriptor first settles it
        let Some(descriptor) = take_descriptor(&self.descriptor) else {
            return;
        };
        if let Some(handle) = self
            .abort
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }

        debug!(url = %descriptor.options.url, "Aborted desktop request");
        descriptor.finish(RequestOutcome::Fail(RequestFailure::aborted()));
    }

    fn on_progress_update(&self, callback: ProgressCallback) {
        self.progress
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::from(callback));
    }
}

fn take_descriptor(cell: &DescriptorCell) -> Option<RequestDescriptor> {
    cell.lock().unwrap_or_else(PoisonError::into_inner).take()
}

async fn perform(
    request: reqwest::RequestBuilder,
    data_type: Option<&str>,
    progress: &ProgressListeners,
) -> RequestOutcome {
    let mut response = match request.send().await {
        Ok(response) => response,
        Err(e) => return RequestOutcome::Fail(failure_from(&e)),
    };

    let status_code = response.status().as_u16();
    let header: HashMap<String, String> = response
        .headers()
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
        .collect();

    let expected = response.content_length().unwrap_or(0);
    let mut body = Vec::new();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                body.extend_from_slice(&chunk);
                report_progress(progress, body.len() as u64, expected);
            }
            Ok(None) => break,
            Err(e) => return RequestOutcome::Fail(failure_from(&e)),
        }
    }

    RequestOutcome::Success(RequestSuccess {
        data: decode_body(&body, data_type),
        status_code,
        header,
    })
}

fn report_progress(listeners: &ProgressListeners, transferred: u64, expected: u64) {
    // Listeners may register more listeners; call them outside the lock
    let listeners: Vec<ProgressListener> = listeners
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    if listeners.is_empty() {
        return;
    }

    let percent = if expected > 0 {
        (transferred.saturating_mul(100) / expected).min(100) as u8
    } else {
        0
    };
    let update = ProgressUpdate {
        progress: percent,
        total_bytes_transferred: transferred,
        total_bytes_expected: expected,
    };
    for listener in listeners.iter() {
        listener(update);
    }
}

fn failure_from(error: &reqwest::Error) -> RequestFailure {
    if error.is_timeout() {
        RequestFailure::new(TIMEOUT_MESSAGE)
    } else {
        warn!(error = %error, "Desktop request failed");
        RequestFailure::new(format!("request:fail {}", error))
    }
}

/// `dataType` defaults to `json`: parse when possible, otherwise hand back
/// the raw text.
fn decode_body(body: &[u8], data_type: Option<&str>) -> Value {
    let parse_json = data_type.map_or(true, |t| t.eq_ignore_ascii_case("json"));
    if parse_json && !body.is_empty() {
        if let Ok(value) = serde_json::from_slice(body) {
            return value;
        }
    }
    Value::String(String::from_utf8_lossy(body).into_owned())
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestTransport::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestTransport::convert_method(HttpMethod::Trace),
            reqwest::Method::TRACE
        );
    }

    #[test]
    fn test_decode_body() {
        assert_eq!(decode_body(br#"{"a":1}"#, None), json!({ "a": 1 }));
        assert_eq!(decode_body(br#"{"a":1}"#, Some("text")), json!(r#"{"a":1}"#));
        assert_eq!(decode_body(b"plain", Some("json")), json!("plain"));
        assert_eq!(decode_body(b"", None), json!(""));
    }

    #[test]
    fn test_query_value() {
        assert_eq!(query_value(&json!("a b")), "a b");
        assert_eq!(query_value(&json!(7)), "7");
        assert_eq!(query_value(&json!(true)), "true");
    }

    #[test]
    fn test_listener_can_register_listener() {
        let listeners = ProgressListeners::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let registry = Arc::clone(&listeners);
        let sink = Arc::clone(&seen);
        listeners.lock().unwrap().push(Arc::new(move |update: ProgressUpdate| {
            sink.lock().unwrap().push(("outer", update.progress));
            let inner_sink = Arc::clone(&sink);
            registry.lock().unwrap().push(Arc::new(move |update: ProgressUpdate| {
                inner_sink.lock().unwrap().push(("inner", update.progress));
            }));
        }));

        report_progress(&listeners, 50, 100);
        report_progress(&listeners, 100, 100);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0], ("outer", 50));
        assert!(seen.contains(&("inner", 100)));
        assert_eq!(listeners.lock().unwrap().len(), 3);
    }

    #[test]
    fn test_request_without_runtime_fails_synchronously() {
        let transport = ReqwestTransport::with_client(Client::new());
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();

        transport.request(
            RequestDescriptor::from("http://127.0.0.1:9/never")
                .on_fail(move |failure| *sink.lock().unwrap() = Some(failure)),
        );

        assert_eq!(
            seen.lock().unwrap().as_ref().map(|f| f.err_msg.as_str()),
            Some(NO_RUNTIME_MESSAGE)
        );
    }
}

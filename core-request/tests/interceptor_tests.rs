//! Interceptor chain behavior through the full pipeline.

mod common;

use async_trait::async_trait;
use bridge_traits::{HttpMethod, RequestSuccess};
use common::ManualHost;
use core_async::time::{sleep, Duration};
use core_request::{
    interceptor_fn, Chain, Interceptor, Link, LogInterceptor, RequestClient, RequestError,
    RequestQueue, Result, TimeoutInterceptor,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// Records entry and exit around `proceed`.
struct Tracing {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Interceptor for Tracing {
    async fn intercept(&self, chain: Chain) -> Result<RequestSuccess> {
        self.log.lock().unwrap().push(format!("{} in", self.name));
        let result = chain.proceed().await;
        self.log.lock().unwrap().push(format!("{} out", self.name));
        result
    }
}

fn link_with_host(max: usize) -> (Link, Arc<ManualHost>) {
    let host = ManualHost::new();
    let client = RequestClient::new(RequestQueue::new(host.clone(), max));
    (Link::new(Arc::new(client)), host)
}

/// Completes the first open request on `host` once it shows up.
async fn succeed_when_open(host: Arc<ManualHost>) {
    loop {
        if let Some(url) = host.held_urls().first().cloned() {
            host.succeed(&url);
            return;
        }
        sleep(Duration::from_millis(1)).await;
    }
}

#[core_async::test]
async fn test_interceptors_run_in_order_and_unwind_in_reverse() {
    let (link, host) = link_with_host(5);
    let log = Arc::new(Mutex::new(Vec::new()));
    link.add_interceptor(Tracing { name: "a", log: log.clone() });
    link.add_interceptor(Tracing { name: "b", log: log.clone() });

    let request = link.request("https://api.example.com/user");
    let (result, _) = futures::join!(request, succeed_when_open(host));

    assert!(result.is_ok());
    assert_eq!(*log.lock().unwrap(), vec!["a in", "b in", "b out", "a out"]);
}

#[core_async::test]
async fn test_interceptor_can_rewrite_params_and_result() {
    let (link, host) = link_with_host(5);
    link.add_interceptor(interceptor_fn(|mut chain: Chain| async move {
        let params = chain.request_params_mut();
        params.method = HttpMethod::Post;
        params.header.insert("x-app".to_string(), "demo".to_string());
        let mut response = chain.proceed().await?;
        response.data = json!({ "wrapped": response.data });
        Ok::<_, RequestError>(response)
    }));

    let request = link.request("https://api.example.com/user");
    let (result, _) = futures::join!(request, succeed_when_open(host.clone()));

    let sent = &host.dispatched_options()[0];
    assert_eq!(sent.method, HttpMethod::Post);
    assert_eq!(sent.header.get("x-app"), Some(&"demo".to_string()));
    assert_eq!(
        result.unwrap().data,
        json!({ "wrapped": { "url": "https://api.example.com/user" } })
    );
}

#[core_async::test]
async fn test_error_short_circuits_rest_of_chain() {
    let (link, host) = link_with_host(5);
    let log = Arc::new(Mutex::new(Vec::new()));
    link.add_interceptor(interceptor_fn(|_chain: Chain| async move {
        Err(RequestError::Interceptor("not signed in".to_string()))
    }));
    link.add_interceptor(Tracing { name: "after", log: log.clone() });

    let result = link.request("https://api.example.com/user").await;

    assert_eq!(
        result,
        Err(RequestError::Interceptor("not signed in".to_string()))
    );
    assert!(log.lock().unwrap().is_empty());
    assert!(host.dispatched_urls().is_empty());
}

#[core_async::test]
async fn test_interceptor_list_is_snapshotted_per_request() {
    let (link, host) = link_with_host(5);
    let log = Arc::new(Mutex::new(Vec::new()));
    link.add_interceptor(Tracing { name: "kept", log: log.clone() });

    let request = link.request("https://api.example.com/user");
    link.clean_interceptors();
    link.add_interceptor(Tracing { name: "late", log: log.clone() });
    assert_eq!(link.interceptor_count(), 1);

    let (result, _) = futures::join!(request, succeed_when_open(host));

    assert!(result.is_ok());
    assert_eq!(*log.lock().unwrap(), vec!["kept in", "kept out"]);
}

#[core_async::test]
async fn test_clean_interceptors_keeps_terminal() {
    let (link, host) = link_with_host(5);
    link.add_interceptor(interceptor_fn(|_chain: Chain| async move {
        Err(RequestError::Interceptor("blocked".to_string()))
    }));
    link.clean_interceptors();

    let request = link.request("https://api.example.com/user");
    let (result, _) = futures::join!(request, succeed_when_open(host));

    assert_eq!(result.unwrap().status_code, 200);
}

#[core_async::test]
async fn test_abort_before_dispatch_cancels_queued_request() {
    let (link, host) = link_with_host(1);
    let blocked = core_async::spawn(link.request("https://api.example.com/blocker"));
    while host.held_urls().is_empty() {
        sleep(Duration::from_millis(1)).await;
    }

    let request = link.request("https://api.example.com/second");
    request.abort();
    let result = request.await;

    assert!(matches!(&result, Err(error) if error.is_abort()));
    assert_eq!(host.dispatched_urls(), vec!["https://api.example.com/blocker"]);

    host.succeed("https://api.example.com/blocker");
    assert!(blocked.await.unwrap().is_ok());
}

#[core_async::test]
async fn test_request_is_sent_without_being_awaited() {
    let (link, host) = link_with_host(5);
    link.add_interceptor(LogInterceptor);
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = statuses.clone();

    drop(link.request(
        bridge_traits::RequestDescriptor::from("https://api.example.com/ping")
            .on_success(move |response| sink.lock().unwrap().push(response.status_code)),
    ));
    assert_eq!(host.dispatched_urls(), vec!["https://api.example.com/ping"]);

    host.succeed("https://api.example.com/ping");
    assert_eq!(*statuses.lock().unwrap(), vec![200]);
}

#[core_async::test]
async fn test_dispatch_follows_call_order() {
    let (link, host) = link_with_host(5);
    let log = Arc::new(Mutex::new(Vec::new()));
    link.add_interceptor(Tracing { name: "t", log: log.clone() });

    let first = link.request("https://a");
    let second = link.request("https://b");
    assert_eq!(host.dispatched_urls(), vec!["https://a", "https://b"]);

    host.succeed("https://b");
    host.succeed("https://a");
    assert!(second.await.is_ok());
    assert!(first.await.is_ok());
}

#[core_async::test]
async fn test_timeout_interceptor_aborts_host_request() {
    let (link, host) = link_with_host(5);
    link.add_interceptor(TimeoutInterceptor::new(Duration::from_secs(30)));

    let request = link.request(
        bridge_traits::RequestOptions::new("https://api.example.com/slow")
            .timeout(Duration::from_millis(20)),
    );
    let result = request.await;

    assert_eq!(result, Err(RequestError::Timeout(Duration::from_millis(20))));
    assert_eq!(host.aborted_urls(), vec!["https://api.example.com/slow"]);
}

#[core_async::test]
async fn test_log_interceptor_passes_result_through() {
    let (link, host) = link_with_host(5);
    link.add_interceptor(LogInterceptor);

    let request = link.request(
        bridge_traits::RequestOptions::new("https://api.example.com/user?session=abc")
            .header("Authorization", "Bearer secret"),
    );
    let (result, _) = futures::join!(request, succeed_when_open(host));

    assert_eq!(result.unwrap().status_code, 200);
}

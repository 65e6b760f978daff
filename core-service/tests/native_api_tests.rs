use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    ApiCall, FinishedTask, HostApi, HostArg, HostTask, HostTransport, RequestDescriptor,
    RequestOutcome, RequestSuccess,
};
use core_api::{ApiArg, ApiError, ApiReturn};
use core_request::{interceptor_fn, Chain, RequestError};
use core_runtime::config::{AdapterConfig, ApiLists, PxTransformConfig};
use core_runtime::events::{AdapterEvent, EventBus, RequestEvent};
use core_service::{init_native_api, CoreError, NativeApi};
use mockall::mock;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

mock! {
    Host {}

    impl HostApi for Host {
        fn has_api(&self, name: &str) -> bool;
        fn invoke(&self, name: &str, args: Vec<HostArg>) -> BridgeResult<Value>;
        fn invoke_with_callbacks(
            &self,
            name: &str,
            call: ApiCall,
        ) -> BridgeResult<Option<Arc<dyn HostTask>>>;
        fn env(&self) -> Value;
    }
}

/// Completes every request synchronously, echoing what it was sent.
struct EchoTransport;

impl HostTransport for EchoTransport {
    fn request(&self, descriptor: RequestDescriptor) -> Arc<dyn HostTask> {
        let body = json!({
            "url": descriptor.options.url,
            "method": descriptor.options.method.as_str(),
            "header": descriptor.options.header,
        });
        descriptor.finish(RequestOutcome::Success(RequestSuccess::new(200, body)));
        Arc::new(FinishedTask)
    }
}

fn host_without(missing: &'static [&'static str]) -> MockHost {
    let mut host = MockHost::new();
    host.expect_has_api()
        .returning(move |name| !missing.iter().any(|m| *m == name));
    host
}

fn native_api(host: MockHost, configure: impl FnOnce(AdapterConfig) -> AdapterConfig) -> NativeApi {
    let config = AdapterConfig::builder()
        .transport(Arc::new(EchoTransport))
        .host_api(Arc::new(host))
        .build()
        .unwrap();
    init_native_api(configure(config)).unwrap()
}

#[core_async::test]
async fn test_request_goes_through_interceptors() {
    let native = native_api(host_without(&[]), |config| config);
    native.add_interceptor(interceptor_fn(|mut chain: Chain| async move {
        chain
            .request_params_mut()
            .header
            .insert("x-token".to_string(), "t1".to_string());
        chain.proceed().await
    }));

    let response = native.request("https://api.example.com/items").await.unwrap();
    assert_eq!(response.data["url"], json!("https://api.example.com/items"));
    assert_eq!(response.data["header"]["x-token"], json!("t1"));

    native.clean_interceptors();
    let response = native.request("https://api.example.com/items").await.unwrap();
    assert_eq!(response.data["header"], json!({}));
    assert_eq!(native.queue_stats().in_flight, 0);
}

#[core_async::test]
async fn test_interceptor_error_surfaces_as_request_error() {
    let native = native_api(host_without(&[]), |config| config);
    native.add_interceptor(interceptor_fn(|_chain: Chain| async move {
        Err(RequestError::Interceptor("offline".to_string()))
    }));

    let error = native.request("https://a").await.unwrap_err();
    let error: CoreError = error.into();
    assert!(matches!(error, CoreError::Request(RequestError::Interceptor(_))));
}

#[test]
fn test_max_concurrent_comes_from_config() {
    let native = native_api(host_without(&[]), |mut config| {
        config.max_concurrent = 2;
        config
    });
    assert_eq!(native.queue_stats().max_concurrent, 2);
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = AdapterConfig::builder()
        .transport(Arc::new(EchoTransport))
        .host_api(Arc::new(host_without(&[])))
        .build()
        .unwrap();
    let config = AdapterConfig {
        max_concurrent: 0,
        ..config
    };

    assert!(matches!(init_native_api(config), Err(CoreError::Config(_))));
}

#[test]
fn test_unsupported_api_is_soft() {
    let native = native_api(host_without(&["vibrateLongX"]), |mut config| {
        config.api_lists = ApiLists::default().with_other(["vibrateLongX"]);
        config
    });

    assert!(!native.is_supported("vibrateLongX"));
    let result = native.call("vibrateLongX", vec![ApiArg::Value(json!({}))]).unwrap();
    assert!(matches!(result, ApiReturn::Unsupported));
}

#[test]
fn test_request_is_not_a_named_api() {
    let native = native_api(host_without(&[]), |config| config);

    assert!(matches!(
        native.call("request", vec!["https://a".into()]),
        Err(CoreError::Api(ApiError::NotRegistered(_)))
    ));
}

#[test]
fn test_px_transform_defaults_and_reconfigure() {
    let native = native_api(host_without(&[]), |config| config);
    assert_eq!(native.px_transform(24).unwrap(), "24rpx");
    assert_eq!(native.px_transform("10px").unwrap(), "10rpx");

    native
        .init_px_transform(PxTransformConfig {
            design_width: 375,
            device_ratio: BTreeMap::from([(375, 2.0)]),
        })
        .unwrap();
    assert_eq!(native.px_transform(24).unwrap(), "48rpx");
    assert_eq!(native.px_transform_config().design_width, 375);
}

#[test]
fn test_px_transform_unknown_design_width_fails() {
    let native = native_api(host_without(&[]), |mut config| {
        config.px_transform = PxTransformConfig {
            design_width: 1080,
            ..PxTransformConfig::default()
        };
        config
    });

    assert!(matches!(
        native.px_transform(10),
        Err(CoreError::Api(ApiError::UnsupportedDesignWidth(1080)))
    ));
}

#[test]
fn test_init_px_transform_rejects_bad_ratio() {
    let native = native_api(host_without(&[]), |config| config);
    let result = native.init_px_transform(PxTransformConfig {
        design_width: 750,
        device_ratio: BTreeMap::from([(750, -1.0)]),
    });

    assert!(matches!(result, Err(CoreError::Config(_))));
    assert_eq!(native.px_transform(24).unwrap(), "24rpx");
}

#[test]
fn test_host_globals() {
    let mut host = host_without(&["getApp"]);
    host.expect_invoke()
        .withf(|name, args| name == "getCurrentPages" && args.is_empty())
        .times(1)
        .returning(|_, _| Ok(json!([{ "route": "pages/home/index" }])));
    host.expect_env()
        .return_const(json!({ "USER_DATA_PATH": "ksfile://usr" }));

    let native = native_api(host, |config| config);

    assert_eq!(
        native.get_current_pages().unwrap(),
        json!([{ "route": "pages/home/index" }])
    );
    assert!(matches!(
        native.get_app(),
        Err(CoreError::CapabilityMissing { capability, .. }) if capability == "getApp"
    ));
    assert_eq!(native.env()["USER_DATA_PATH"], json!("ksfile://usr"));
}

#[core_async::test]
async fn test_request_events_are_published() {
    let native = native_api(host_without(&[]), |mut config| {
        config.event_bus = Some(EventBus::new(16));
        config
    });
    let mut events = native.subscribe().expect("event bus configured");

    native.request("https://a/one").await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert!(seen
        .iter()
        .any(|event| matches!(event, AdapterEvent::Request(RequestEvent::Dispatched { .. }))));
    assert!(seen.iter().any(|event| matches!(
        event,
        AdapterEvent::Request(RequestEvent::Completed { success: true, .. })
    )));
}

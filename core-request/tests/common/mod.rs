//! Manually driven host transport for request pipeline tests.

#![allow(dead_code)]

use bridge_traits::{
    HostTask, HostTransport, RequestDescriptor, RequestFailure, RequestOutcome, RequestOptions,
    RequestSuccess,
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Holds every dispatched descriptor until the test completes it.
#[derive(Default)]
pub struct ManualHost {
    held: Mutex<Vec<RequestDescriptor>>,
    dispatched: Mutex<Vec<RequestOptions>>,
    aborted: Arc<Mutex<Vec<String>>>,
    open: AtomicUsize,
    peak: AtomicUsize,
}

impl ManualHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// URLs in the order the host received them.
    pub fn dispatched_urls(&self) -> Vec<String> {
        self.dispatched
            .lock()
            .unwrap()
            .iter()
            .map(|options| options.url.clone())
            .collect()
    }

    pub fn dispatched_options(&self) -> Vec<RequestOptions> {
        self.dispatched.lock().unwrap().clone()
    }

    pub fn aborted_urls(&self) -> Vec<String> {
        self.aborted.lock().unwrap().clone()
    }

    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously open host requests seen.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn held_urls(&self) -> Vec<String> {
        self.held
            .lock()
            .unwrap()
            .iter()
            .map(|d| d.options.url.clone())
            .collect()
    }

    pub fn succeed(&self, url: &str) {
        let response = RequestSuccess::new(200, json!({ "url": url }));
        self.finish(url, RequestOutcome::Success(response));
    }

    pub fn fail(&self, url: &str, message: &str) {
        self.finish(url, RequestOutcome::Fail(RequestFailure::new(message)));
    }

    pub fn finish(&self, url: &str, outcome: RequestOutcome) {
        let descriptor = {
            let mut held = self.held.lock().unwrap();
            let index = held
                .iter()
                .position(|d| d.options.url == url)
                .unwrap_or_else(|| panic!("{} is not open on the host", url));
            held.remove(index)
        };
        self.open.fetch_sub(1, Ordering::SeqCst);
        descriptor.finish(outcome);
    }
}

impl HostTransport for ManualHost {
    fn request(&self, descriptor: RequestDescriptor) -> Arc<dyn HostTask> {
        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(open, Ordering::SeqCst);
        let url = descriptor.options.url.clone();
        self.dispatched
            .lock()
            .unwrap()
            .push(descriptor.options.clone());
        self.held.lock().unwrap().push(descriptor);

        Arc::new(ManualTask {
            url,
            aborted: Arc::clone(&self.aborted),
        })
    }
}

struct ManualTask {
    url: String,
    aborted: Arc<Mutex<Vec<String>>>,
}

impl HostTask for ManualTask {
    fn abort(&self) {
        self.aborted.lock().unwrap().push(self.url.clone());
    }
}

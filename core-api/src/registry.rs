//! Host API name registry.
//!
//! Every name the adapter binds falls in one of three categories, which
//! decide how calls to it are wrapped. The framework may contribute extra
//! names through [`ApiLists`]; they are merged with the built-in lists below.

use core_runtime::config::ApiLists;
use std::collections::BTreeMap;

/// How calls to an API are wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiCategory {
    /// `on*` / `off*` event registration and `*Sync` calls; forwarded
    OnAndSync,
    /// Callback-less calls; forwarded
    NoPromise,
    /// Callback-style calls; promisified
    Other,
}

/// Served by the interceptor pipeline, never by the normalizer.
pub const REQUEST_API: &str = "request";

const ON_AND_SYNC_APIS: &[&str] = &[
    "onSocketOpen",
    "onSocketError",
    "onSocketMessage",
    "onSocketClose",
    "onBackgroundAudioPlay",
    "onBackgroundAudioPause",
    "onBackgroundAudioStop",
    "onNetworkStatusChange",
    "onAccelerometerChange",
    "onCompassChange",
    "onMemoryWarning",
    "onAppShow",
    "onAppHide",
    "onError",
    "onPageNotFound",
    "offAppShow",
    "offAppHide",
    "offError",
    "offPageNotFound",
    "getStorageSync",
    "setStorageSync",
    "removeStorageSync",
    "clearStorageSync",
    "getStorageInfoSync",
    "getSystemInfoSync",
    "getLaunchOptionsSync",
    "getMenuButtonBoundingClientRect",
    "getUpdateManager",
    "getRecorderManager",
    "getBackgroundAudioManager",
];

const NO_PROMISE_APIS: &[&str] = &[
    "stopRecord",
    "pauseVoice",
    "stopVoice",
    "pauseBackgroundAudio",
    "stopBackgroundAudio",
    "showNavigationBarLoading",
    "hideNavigationBarLoading",
    "createAnimation",
    "createSelectorQuery",
    "createIntersectionObserver",
    "createCanvasContext",
    "createVideoContext",
    "createInnerAudioContext",
    "createCameraContext",
    "hideKeyboard",
    "stopPullDownRefresh",
    "canIUse",
];

const OTHER_APIS: &[&str] = &[
    "request",
    "uploadFile",
    "downloadFile",
    "connectSocket",
    "sendSocketMessage",
    "closeSocket",
    "chooseImage",
    "previewImage",
    "getImageInfo",
    "saveImageToPhotosAlbum",
    "chooseVideo",
    "saveVideoToPhotosAlbum",
    "startRecord",
    "playVoice",
    "getStorage",
    "setStorage",
    "removeStorage",
    "clearStorage",
    "getStorageInfo",
    "getLocation",
    "chooseLocation",
    "openLocation",
    "getSystemInfo",
    "getNetworkType",
    "startAccelerometer",
    "stopAccelerometer",
    "startCompass",
    "stopCompass",
    "makePhoneCall",
    "scanCode",
    "setClipboardData",
    "getClipboardData",
    "vibrateLong",
    "vibrateShort",
    "showToast",
    "showLoading",
    "hideToast",
    "hideLoading",
    "showModal",
    "showActionSheet",
    "setNavigationBarTitle",
    "setNavigationBarColor",
    "navigateTo",
    "redirectTo",
    "switchTab",
    "navigateBack",
    "reLaunch",
    "startPullDownRefresh",
    "pageScrollTo",
    "login",
    "checkSession",
    "getUserInfo",
    "requestPayment",
    "authorize",
    "getSetting",
    "openSetting",
];

/// Name-to-category table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiRegistry {
    entries: BTreeMap<String, ApiCategory>,
}

impl ApiRegistry {
    /// Built-in lists only.
    pub fn with_defaults() -> Self {
        Self::from_lists(&ApiLists::default())
    }

    /// Built-in lists merged with framework-supplied ones.
    ///
    /// A name listed under `Other` anywhere is promisified even if it also
    /// appears in a forwarded category. `request` is never registered.
    pub fn from_lists(lists: &ApiLists) -> Self {
        let mut registry = Self::default();

        let on_and_sync = ON_AND_SYNC_APIS
            .iter()
            .copied()
            .chain(lists.on_and_sync.iter().map(String::as_str));
        let no_promise = NO_PROMISE_APIS
            .iter()
            .copied()
            .chain(lists.no_promise.iter().map(String::as_str));
        let other = OTHER_APIS
            .iter()
            .copied()
            .chain(lists.other.iter().map(String::as_str));

        for name in on_and_sync {
            registry.insert(name, ApiCategory::OnAndSync);
        }
        for name in no_promise {
            registry.insert(name, ApiCategory::NoPromise);
        }
        for name in other {
            registry.insert(name, ApiCategory::Other);
        }
        registry
    }

    fn insert(&mut self, name: &str, category: ApiCategory) {
        if name == REQUEST_API || name.is_empty() {
            return;
        }
        match self.entries.get(name) {
            Some(ApiCategory::Other) => {}
            _ => {
                self.entries.insert(name.to_string(), category);
            }
        }
    }

    pub fn category(&self, name: &str) -> Option<ApiCategory> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ApiCategory)> {
        self.entries
            .iter()
            .map(|(name, category)| (name.as_str(), *category))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! The bridge-facing adapter interface and its shared pass-through behavior.
//!
//! [`NativeBridge`] has exactly two implementations, [`crate::IosBridge`] and
//! [`crate::AndroidBridge`]. Capabilities that behave the same on both
//! platforms are provided here; the privacy surface is platform-specific.
//!
//! Every method hands off to native code and completes when the native side
//! reports back. Cancellation is not supported: dropping a returned future
//! stops waiting for the result, but the native call has already been made.

use std::fmt;
use std::future::Future;

use lb_core::{
    BridgeError, Configuration, ConversionValue, DeepLinkData, EventBatch, PurchaseEvent,
    TrackEvent, TrackingAuthorization, UserId, ValidationError,
};

use crate::error::NativeError;
use crate::events::EventEmitter;
use crate::module::NativeModule;

/// Activity kind iOS uses for universal links.
pub const IOS_BROWSING_ACTIVITY: &str = "NSUserActivityTypeBrowsingWeb";

/// Intent action Android uses for app links.
pub const ANDROID_VIEW_ACTION: &str = "android.intent.action.VIEW";

/// The two supported platforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Ios,
    Android,
}

impl Platform {
    /// The platform this binary was built for, if it is a supported one.
    #[must_use]
    pub const fn current() -> Option<Self> {
        if cfg!(target_os = "ios") {
            Some(Self::Ios)
        } else if cfg!(target_os = "android") {
            Some(Self::Android)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
        }
    }

    /// Activity/intent kind that carries an incoming link on this platform.
    #[must_use]
    pub const fn link_activity_kind(&self) -> &'static str {
        match self {
            Self::Ios => IOS_BROWSING_ACTIVITY,
            Self::Android => ANDROID_VIEW_ACTION,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input to `handle_universal_link`: a bare URL or an OS activity descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkInput {
    Url(String),
    /// An `NSUserActivity` (iOS) or intent (Android).
    Activity { kind: String, url: Option<String> },
}

impl LinkInput {
    /// An activity of the kind the given platform uses for incoming links.
    pub fn link_activity(platform: Platform, url: impl Into<String>) -> Self {
        Self::Activity {
            kind: platform.link_activity_kind().to_string(),
            url: Some(url.into()),
        }
    }
}

impl From<&str> for LinkInput {
    fn from(url: &str) -> Self {
        Self::Url(url.to_string())
    }
}

impl From<String> for LinkInput {
    fn from(url: String) -> Self {
        Self::Url(url)
    }
}

pub(crate) fn native_error(operation: &'static str) -> impl FnOnce(NativeError) -> BridgeError {
    move |err| BridgeError::native(operation, err)
}

/// The capability set the facade drives.
pub trait NativeBridge: Send + Sync {
    type Module: NativeModule;

    fn platform(&self) -> Platform;

    fn module(&self) -> &Self::Module;

    fn attach_events(&self, emitter: EventEmitter) {
        tracing::debug!(platform = %self.platform(), "attaching native event emitter");
        self.module().attach(emitter);
    }

    fn configure(
        &self,
        config: &Configuration,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            tracing::debug!(
                platform = %self.platform(),
                environment = %config.environment(),
                auto_handle_deep_links = config.auto_handle_deep_links(),
                "configuring native SDK"
            );
            self.module()
                .configure(config)
                .await
                .map_err(native_error("configure"))
        }
    }

    fn track_event(&self, event: &TrackEvent) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            tracing::debug!(event = %event.event_name, "trackEvent");
            self.module()
                .track_event(event)
                .await
                .map_err(native_error("trackEvent"))
        }
    }

    fn track_event_batch(
        &self,
        batch: &EventBatch,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            tracing::debug!(events = batch.len(), "trackEventBatch");
            self.module()
                .track_event_batch(batch)
                .await
                .map_err(native_error("trackEventBatch"))
        }
    }

    fn track_purchase(
        &self,
        purchase: &PurchaseEvent,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            tracing::debug!(
                amount = purchase.amount(),
                currency = %purchase.currency(),
                "trackPurchase"
            );
            self.module()
                .track_purchase(purchase)
                .await
                .map_err(native_error("trackPurchase"))
        }
    }

    fn track_install(&self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            self.module()
                .track_install()
                .await
                .map_err(native_error("trackInstall"))
        }
    }

    fn track_open(&self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            self.module()
                .track_open()
                .await
                .map_err(native_error("trackOpen"))
        }
    }

    fn start_session(&self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            self.module()
                .start_session()
                .await
                .map_err(native_error("startSession"))
        }
    }

    fn end_session(&self) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            self.module()
                .end_session()
                .await
                .map_err(native_error("endSession"))
        }
    }

    fn set_user_id(&self, user_id: &UserId) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            self.module()
                .set_user_id(user_id)
                .await
                .map_err(native_error("setUserID"))
        }
    }

    fn user_id(&self) -> impl Future<Output = Result<Option<String>, BridgeError>> + Send {
        async move { self.module().user_id().await.map_err(native_error("getUserID")) }
    }

    fn visitor_id(&self) -> impl Future<Output = Result<String, BridgeError>> + Send {
        async move {
            self.module()
                .visitor_id()
                .await
                .map_err(native_error("getVisitorID"))
        }
    }

    fn reset_visitor_id(&self) -> impl Future<Output = Result<String, BridgeError>> + Send {
        async move {
            self.module()
                .reset_visitor_id()
                .await
                .map_err(native_error("resetVisitorID"))
        }
    }

    fn set_tracking_enabled(
        &self,
        enabled: bool,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            tracing::debug!(enabled, "setTrackingEnabled");
            self.module()
                .set_tracking_enabled(enabled)
                .await
                .map_err(native_error("setTrackingEnabled"))
        }
    }

    fn is_tracking_enabled(&self) -> impl Future<Output = Result<bool, BridgeError>> + Send {
        async move {
            self.module()
                .is_tracking_enabled()
                .await
                .map_err(native_error("isTrackingEnabled"))
        }
    }

    fn set_advertising_tracking_enabled(
        &self,
        enabled: bool,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send {
        async move {
            tracing::debug!(enabled, "setAdvertisingTrackingEnabled");
            self.module()
                .set_advertising_tracking_enabled(enabled)
                .await
                .map_err(native_error("setAdvertisingTrackingEnabled"))
        }
    }

    fn is_advertising_tracking_enabled(
        &self,
    ) -> impl Future<Output = Result<bool, BridgeError>> + Send {
        async move {
            self.module()
                .is_advertising_tracking_enabled()
                .await
                .map_err(native_error("isAdvertisingTrackingEnabled"))
        }
    }

    /// Resolves an incoming link. Activities of a kind other than the
    /// platform's link activity are not links and return `false` without a
    /// native call.
    fn handle_universal_link(
        &self,
        input: &LinkInput,
    ) -> impl Future<Output = Result<bool, BridgeError>> + Send {
        async move {
            let url = match input {
                LinkInput::Url(url) => url.as_str(),
                LinkInput::Activity { kind, url } => {
                    if kind != self.platform().link_activity_kind() {
                        tracing::debug!(platform = %self.platform(), kind, "ignoring non-link activity");
                        return Ok(false);
                    }
                    match url {
                        Some(url) => url.as_str(),
                        None => return Ok(false),
                    }
                }
            };
            if url.trim().is_empty() {
                return Err(ValidationError::Empty { field: "URL" }.into());
            }
            self.module()
                .handle_link(url)
                .await
                .map_err(native_error("handleUniversalLink"))
        }
    }

    fn initial_deep_link(
        &self,
    ) -> impl Future<Output = Result<Option<DeepLinkData>, BridgeError>> + Send {
        async move {
            self.module()
                .initial_link()
                .await
                .map_err(native_error("getInitialURL"))
        }
    }

    /// Prompts for tracking permission where the platform has a prompt.
    fn request_tracking_permission(
        &self,
    ) -> impl Future<Output = Result<TrackingAuthorization, BridgeError>> + Send;

    fn att_status(&self) -> impl Future<Output = Result<TrackingAuthorization, BridgeError>> + Send;

    fn idfa(&self) -> impl Future<Output = Result<Option<String>, BridgeError>> + Send;

    fn update_conversion_value(
        &self,
        value: ConversionValue,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_link_activity_kinds() {
        assert_eq!(Platform::Ios.link_activity_kind(), IOS_BROWSING_ACTIVITY);
        assert_eq!(Platform::Android.link_activity_kind(), ANDROID_VIEW_ACTION);
    }

    #[test]
    fn current_platform_is_none_on_host() {
        if cfg!(any(target_os = "ios", target_os = "android")) {
            assert!(Platform::current().is_some());
        } else {
            assert!(Platform::current().is_none());
        }
    }

    #[test]
    fn link_activity_uses_platform_kind() {
        let input = LinkInput::link_activity(Platform::Android, "https://x.com/a");
        assert_eq!(
            input,
            LinkInput::Activity {
                kind: ANDROID_VIEW_ACTION.to_string(),
                url: Some("https://x.com/a".to_string()),
            }
        );
    }
}

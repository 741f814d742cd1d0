//! The host seam: what the embedding platform code provides.
//!
//! Implementations wrap the vendor's iOS or Android SDK. Attribution
//! matching, persistence of the visitor and user identifiers, retries and
//! OS permission prompts all live behind these traits.

use std::future::Future;

use lb_core::{
    Configuration, ConversionValue, DeepLinkData, EventBatch, PurchaseEvent, TrackEvent,
    TrackingAuthorization, UserId,
};

use crate::error::NativeResult;
use crate::events::EventEmitter;

/// Capabilities shared by both platform SDKs.
pub trait NativeModule: Send + Sync {
    /// Hands the module the channel it emits deep-link and lifecycle events on.
    fn attach(&self, emitter: EventEmitter);

    /// Applies the configuration and arms URL observers when
    /// `auto_handle_deep_links` is set.
    fn configure(&self, config: &Configuration) -> impl Future<Output = NativeResult<()>> + Send;

    fn track_event(&self, event: &TrackEvent) -> impl Future<Output = NativeResult<()>> + Send;

    /// Records every event of the batch in one call.
    fn track_event_batch(
        &self,
        batch: &EventBatch,
    ) -> impl Future<Output = NativeResult<()>> + Send;

    fn track_purchase(
        &self,
        purchase: &PurchaseEvent,
    ) -> impl Future<Output = NativeResult<()>> + Send;

    fn track_install(&self) -> impl Future<Output = NativeResult<()>> + Send;

    fn track_open(&self) -> impl Future<Output = NativeResult<()>> + Send;

    fn start_session(&self) -> impl Future<Output = NativeResult<()>> + Send;

    fn end_session(&self) -> impl Future<Output = NativeResult<()>> + Send;

    fn set_user_id(&self, user_id: &UserId) -> impl Future<Output = NativeResult<()>> + Send;

    fn user_id(&self) -> impl Future<Output = NativeResult<Option<String>>> + Send;

    fn visitor_id(&self) -> impl Future<Output = NativeResult<String>> + Send;

    /// Replaces the persistent visitor identifier and returns the new one.
    fn reset_visitor_id(&self) -> impl Future<Output = NativeResult<String>> + Send;

    fn set_tracking_enabled(&self, enabled: bool) -> impl Future<Output = NativeResult<()>> + Send;

    fn is_tracking_enabled(&self) -> impl Future<Output = NativeResult<bool>> + Send;

    fn set_advertising_tracking_enabled(
        &self,
        enabled: bool,
    ) -> impl Future<Output = NativeResult<()>> + Send;

    fn is_advertising_tracking_enabled(&self) -> impl Future<Output = NativeResult<bool>> + Send;

    /// IDFA on iOS, GAID on Android. `None` when unavailable.
    fn advertising_id(&self) -> impl Future<Output = NativeResult<Option<String>>> + Send;

    /// Processes a URL. Returns whether it was recognized as a trackable
    /// deep link; recognized links are also emitted as events.
    fn handle_link(&self, url: &str) -> impl Future<Output = NativeResult<bool>> + Send;

    /// The URL the app was cold-started with, if any.
    fn initial_link(&self) -> impl Future<Output = NativeResult<Option<DeepLinkData>>> + Send;
}

/// The iOS-only privacy surface: App Tracking Transparency and SKAdNetwork.
pub trait TrackingTransparency: Send + Sync {
    /// Shows the OS prompt if the status is not yet determined.
    fn request_authorization(
        &self,
    ) -> impl Future<Output = NativeResult<TrackingAuthorization>> + Send;

    fn authorization_status(
        &self,
    ) -> impl Future<Output = NativeResult<TrackingAuthorization>> + Send;

    fn update_conversion_value(
        &self,
        value: ConversionValue,
    ) -> impl Future<Output = NativeResult<()>> + Send;
}

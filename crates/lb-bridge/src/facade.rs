//! The public entry point.

use std::sync::Arc;

use lb_core::{
    BridgeError, Configuration, ConfigureOptions, ConversionValue, DeepLinkData,
    DeepLinkDispatcher, DispatchReport, Environment, EventBatch, ListenerResult, Parameters,
    PurchaseEvent, Subscription, TrackEvent, TrackingAuthorization, UserId,
};
use lb_native::{EventReceiver, LinkInput, NativeBridge, NativeEvent, Platform, event_channel};
use tokio::sync::{Mutex, watch};

use crate::holder::ConfigurationHolder;
use crate::settings::Settings;

/// Lifecycle notifications emitted by the native layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Install,
    Open,
}

/// What the event pump did with one native event.
#[derive(Debug)]
pub enum EventOutcome {
    /// A deep link went through the dispatcher.
    DeepLink(DispatchReport),
    /// A lifecycle notification was turned into a tracking call.
    LifecycleTracked(Lifecycle),
    /// A lifecycle notification was ignored (not configured, or lifecycle
    /// tracking is off).
    LifecycleSkipped(Lifecycle),
    /// The tracking call for a lifecycle notification failed.
    LifecycleFailed(Lifecycle, BridgeError),
}

/// Deep-linking and attribution facade.
///
/// Construct one per process and share it (e.g. behind an `Arc`). All
/// operations except [`LinkBridge::configure`] and listener management fail
/// with `NotConfigured` until `configure` has succeeded. Validation errors are
/// returned before anything is handed to native code.
///
/// Getters always ask the native layer; nothing is cached here.
pub struct LinkBridge<B> {
    adapter: B,
    config: ConfigurationHolder,
    dispatcher: DeepLinkDispatcher,
    events: Mutex<EventReceiver>,
    shutdown: watch::Sender<bool>,
}

impl<B: NativeBridge> LinkBridge<B> {
    /// Wraps `adapter` and connects its native event stream.
    ///
    /// Deep links the native side emits while no listener is registered are
    /// dropped at emission and never reach a later listener.
    pub fn new(adapter: B) -> Self {
        let dispatcher = DeepLinkDispatcher::new();
        let (emitter, receiver) = event_channel();
        adapter.attach_events(emitter.gated_on(dispatcher.clone()));
        Self {
            adapter,
            config: ConfigurationHolder::new(),
            dispatcher,
            events: Mutex::new(receiver),
            shutdown: watch::Sender::new(false),
        }
    }

    pub const fn adapter(&self) -> &B {
        &self.adapter
    }

    pub fn platform(&self) -> Platform {
        self.adapter.platform()
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Configures the SDK and, when `auto_handle_deep_links` is set, arms
    /// native URL capture.
    ///
    /// Calling again replaces the configuration once the native side accepts
    /// it. Registered listeners are kept. If the native call fails, the
    /// previous configuration stays active.
    pub async fn configure(
        &self,
        sdk_key: &str,
        environment: Environment,
        options: ConfigureOptions,
    ) -> Result<(), BridgeError> {
        let config = Configuration::new(sdk_key, environment, options)?;
        self.adapter.configure(&config).await?;
        let previous = self.config.replace(config);
        tracing::info!(
            platform = %self.platform(),
            %environment,
            reconfigured = previous.is_some(),
            listeners = self.dispatcher.listener_count(),
            "linkbridge configured"
        );
        Ok(())
    }

    /// Configures from loaded [`Settings`].
    pub async fn configure_from_settings(&self, settings: &Settings) -> Result<(), BridgeError> {
        let sdk_key = settings.sdk_key.as_deref().unwrap_or_default();
        self.configure(sdk_key, settings.environment, settings.options())
            .await
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_set()
    }

    pub fn configuration(&self) -> Option<Arc<Configuration>> {
        self.config.get()
    }

    // ── Tracking ─────────────────────────────────────────────────────

    pub async fn track_event(
        &self,
        event_name: &str,
        parameters: Parameters,
    ) -> Result<(), BridgeError> {
        self.config.require()?;
        let mut event = TrackEvent::new(event_name)?;
        event.parameters = parameters;
        self.adapter.track_event(&event).await
    }

    /// Forwards all events in a single native call.
    pub async fn track_event_batch(&self, events: Vec<TrackEvent>) -> Result<(), BridgeError> {
        self.config.require()?;
        let batch = EventBatch::new(events)?;
        self.adapter.track_event_batch(&batch).await
    }

    pub async fn track_purchase(
        &self,
        amount: f64,
        currency: &str,
        sku: Option<String>,
    ) -> Result<(), BridgeError> {
        self.config.require()?;
        let purchase = PurchaseEvent::new(amount, currency, sku)?;
        self.adapter.track_purchase(&purchase).await
    }

    pub async fn track_install(&self) -> Result<(), BridgeError> {
        self.config.require()?;
        self.adapter.track_install().await
    }

    pub async fn track_open(&self) -> Result<(), BridgeError> {
        self.config.require()?;
        self.adapter.track_open().await
    }

    pub async fn start_session(&self) -> Result<(), BridgeError> {
        self.config.require()?;
        self.adapter.start_session().await
    }

    pub async fn end_session(&self) -> Result<(), BridgeError> {
        self.config.require()?;
        self.adapter.end_session().await
    }

    // ── Identity ─────────────────────────────────────────────────────

    pub async fn set_user_id(&self, user_id: &str) -> Result<(), BridgeError> {
        self.config.require()?;
        let user_id = UserId::new(user_id)?;
        self.adapter.set_user_id(&user_id).await
    }

    pub async fn user_id(&self) -> Result<Option<String>, BridgeError> {
        self.config.require()?;
        self.adapter.user_id().await
    }

    pub async fn visitor_id(&self) -> Result<String, BridgeError> {
        self.config.require()?;
        self.adapter.visitor_id().await
    }

    /// Replaces the persistent visitor identifier and returns the new one.
    /// The previous identifier cannot be retrieved afterwards.
    pub async fn reset_visitor_id(&self) -> Result<String, BridgeError> {
        self.config.require()?;
        self.adapter.reset_visitor_id().await
    }

    // ── Privacy ──────────────────────────────────────────────────────

    pub async fn set_tracking_enabled(&self, enabled: bool) -> Result<(), BridgeError> {
        self.config.require()?;
        self.adapter.set_tracking_enabled(enabled).await
    }

    pub async fn is_tracking_enabled(&self) -> Result<bool, BridgeError> {
        self.config.require()?;
        self.adapter.is_tracking_enabled().await
    }

    pub async fn set_advertising_tracking_enabled(&self, enabled: bool) -> Result<(), BridgeError> {
        self.config.require()?;
        self.adapter.set_advertising_tracking_enabled(enabled).await
    }

    pub async fn is_advertising_tracking_enabled(&self) -> Result<bool, BridgeError> {
        self.config.require()?;
        self.adapter.is_advertising_tracking_enabled().await
    }

    /// Shows the tracking prompt on iOS. Android has no prompt and always
    /// reports `Authorized`.
    pub async fn request_tracking_permission(&self) -> Result<TrackingAuthorization, BridgeError> {
        self.config.require()?;
        self.adapter.request_tracking_permission().await
    }

    pub async fn att_status(&self) -> Result<TrackingAuthorization, BridgeError> {
        self.config.require()?;
        self.adapter.att_status().await
    }

    /// The advertising identifier (IDFA on iOS, GAID on Android).
    pub async fn idfa(&self) -> Result<Option<String>, BridgeError> {
        self.config.require()?;
        self.adapter.idfa().await
    }

    /// Reports a SKAdNetwork conversion value. Values outside \[0, 63\] are
    /// rejected.
    pub async fn update_conversion_value(&self, value: i64) -> Result<(), BridgeError> {
        self.config.require()?;
        let value = ConversionValue::new(value)?;
        self.adapter.update_conversion_value(value).await
    }

    // ── Deep links ───────────────────────────────────────────────────

    /// Hands a URL or activity to the native SDK. Returns whether it was a
    /// trackable deep link; recognized links reach listeners through the
    /// event pump. Safe to call repeatedly with the same input.
    pub async fn handle_universal_link(
        &self,
        input: impl Into<LinkInput>,
    ) -> Result<bool, BridgeError> {
        self.config.require()?;
        self.adapter.handle_universal_link(&input.into()).await
    }

    /// The link the app was cold-started with.
    ///
    /// Independent of listener delivery: the same link may also arrive as a
    /// dispatched event, and both are delivered.
    pub async fn initial_deep_link(&self) -> Result<Option<DeepLinkData>, BridgeError> {
        self.config.require()?;
        self.adapter.initial_deep_link().await
    }

    /// Registers a deep-link listener. Events emitted before the first
    /// listener is registered are not replayed.
    pub fn add_deep_link_listener<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&DeepLinkData) -> ListenerResult + Send + Sync + 'static,
    {
        self.dispatcher.add_listener(callback)
    }

    pub fn remove_all_deep_link_listeners(&self) -> usize {
        self.dispatcher.remove_all_listeners()
    }

    pub fn deep_link_listener_count(&self) -> usize {
        self.dispatcher.listener_count()
    }

    // ── Event pump ───────────────────────────────────────────────────

    /// Waits for the next native event and processes it. Returns `None` once
    /// [`LinkBridge::shutdown`] has been called and the queue is empty.
    pub async fn next_event(&self) -> Option<EventOutcome> {
        let stop = self.shutdown.subscribe();
        let mut events = self.events.lock().await;
        let event = tokio::select! {
            biased;
            event = events.recv() => event?,
            () = stopped(stop) => return None,
        };
        Some(self.process(event).await)
    }

    /// Processes every event already queued, without waiting for more.
    pub async fn process_pending_events(&self) -> Vec<EventOutcome> {
        let mut events = self.events.lock().await;
        let mut outcomes = Vec::new();
        while let Ok(event) = events.try_recv() {
            outcomes.push(self.process(event).await);
        }
        outcomes
    }

    /// Processes events until [`LinkBridge::shutdown`] is called.
    ///
    /// The native module holds the emitter for as long as the bridge exists,
    /// so the loop does not end on its own; spawn it and stop it explicitly.
    pub async fn run_event_loop(&self) {
        while self.next_event().await.is_some() {}
        tracing::debug!("event loop stopped");
    }

    /// Stops [`LinkBridge::run_event_loop`] and any pending
    /// [`LinkBridge::next_event`] once already-queued events are processed.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        tracing::debug!("event loop shutdown requested");
    }

    async fn process(&self, event: NativeEvent) -> EventOutcome {
        match event {
            NativeEvent::DeepLink(data) => EventOutcome::DeepLink(self.dispatcher.dispatch(&data)),
            NativeEvent::Install => self.track_lifecycle(Lifecycle::Install).await,
            NativeEvent::Open => self.track_lifecycle(Lifecycle::Open).await,
        }
    }

    async fn track_lifecycle(&self, lifecycle: Lifecycle) -> EventOutcome {
        let enabled = self
            .config
            .get()
            .is_some_and(|config| config.track_lifecycle());
        if !enabled {
            tracing::debug!(?lifecycle, "lifecycle tracking inactive; skipping");
            return EventOutcome::LifecycleSkipped(lifecycle);
        }

        let result = match lifecycle {
            Lifecycle::Install => self.adapter.track_install().await,
            Lifecycle::Open => self.adapter.track_open().await,
        };
        match result {
            Ok(()) => EventOutcome::LifecycleTracked(lifecycle),
            Err(err) => {
                tracing::warn!(?lifecycle, error = %err, "lifecycle tracking failed");
                EventOutcome::LifecycleFailed(lifecycle, err)
            }
        }
    }
}

async fn stopped(mut stop: watch::Receiver<bool>) {
    // Errs only once the sender is dropped, and the bridge owns it.
    let _ = stop.wait_for(|stopped| *stopped).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex as StdMutex;

    use lb_core::ErrorKind;
    use lb_native::memory::NativeCall;
    use lb_native::{AndroidBridge, InMemoryNative, IosBridge, NativeModule};
    use serde_json::json;

    type Bridge = LinkBridge<IosBridge<InMemoryNative>>;

    fn ios() -> Bridge {
        LinkBridge::new(IosBridge::new(InMemoryNative::new()))
    }

    async fn configured() -> Bridge {
        let bridge = ios();
        bridge
            .configure("K1", Environment::Production, ConfigureOptions::default())
            .await
            .unwrap();
        bridge
    }

    fn params(value: serde_json::Value) -> Parameters {
        match value {
            serde_json::Value::Object(map) => map,
            _ => Parameters::new(),
        }
    }

    #[tokio::test]
    async fn configure_validates_key_before_native_call() {
        let bridge = ios();
        let err = bridge
            .configure("", Environment::Production, ConfigureOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(!bridge.is_configured());
        assert!(bridge.adapter().module().calls().is_empty());
    }

    #[tokio::test]
    async fn every_native_operation_requires_configuration() {
        let bridge = ios();
        let kinds = [
            bridge.track_event("e", Parameters::new()).await.unwrap_err().kind(),
            bridge
                .track_event_batch(vec![TrackEvent::new("e").unwrap()])
                .await
                .unwrap_err()
                .kind(),
            bridge.track_purchase(1.0, "USD", None).await.unwrap_err().kind(),
            bridge.track_install().await.unwrap_err().kind(),
            bridge.track_open().await.unwrap_err().kind(),
            bridge.start_session().await.unwrap_err().kind(),
            bridge.end_session().await.unwrap_err().kind(),
            bridge.set_user_id("u1").await.unwrap_err().kind(),
            bridge.user_id().await.unwrap_err().kind(),
            bridge.visitor_id().await.unwrap_err().kind(),
            bridge.reset_visitor_id().await.unwrap_err().kind(),
            bridge.set_tracking_enabled(true).await.unwrap_err().kind(),
            bridge.is_tracking_enabled().await.unwrap_err().kind(),
            bridge
                .set_advertising_tracking_enabled(true)
                .await
                .unwrap_err()
                .kind(),
            bridge.is_advertising_tracking_enabled().await.unwrap_err().kind(),
            bridge.request_tracking_permission().await.unwrap_err().kind(),
            bridge.att_status().await.unwrap_err().kind(),
            bridge.idfa().await.unwrap_err().kind(),
            bridge.update_conversion_value(1).await.unwrap_err().kind(),
            bridge
                .handle_universal_link("https://x.com/a")
                .await
                .unwrap_err()
                .kind(),
            bridge.initial_deep_link().await.unwrap_err().kind(),
        ];
        assert!(kinds.iter().all(|kind| *kind == ErrorKind::NotConfigured));
        assert!(bridge.adapter().module().calls().is_empty());
    }

    #[tokio::test]
    async fn not_configured_wins_over_invalid_arguments() {
        let bridge = ios();
        let err = bridge.update_conversion_value(64).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
    }

    #[tokio::test]
    async fn conversion_value_range() {
        let bridge = configured().await;
        for bad in [64, -1] {
            let err = bridge.update_conversion_value(bad).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        bridge.update_conversion_value(0).await.unwrap();
        bridge.update_conversion_value(63).await.unwrap();
        assert_eq!(
            bridge
                .adapter()
                .module()
                .conversion_value()
                .map(ConversionValue::value),
            Some(63)
        );
    }

    #[tokio::test]
    async fn track_event_forwards_parameters() {
        let bridge = configured().await;
        bridge
            .track_event("screen_view", params(json!({"screen": "home"})))
            .await
            .unwrap();

        let expected = TrackEvent::new("screen_view")
            .unwrap()
            .with_parameter("screen", "home");
        assert!(bridge
            .adapter()
            .module()
            .calls()
            .contains(&NativeCall::TrackEvent(expected)));
    }

    #[tokio::test]
    async fn empty_batch_is_invalid() {
        let bridge = configured().await;
        let err = bridge.track_event_batch(Vec::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[tokio::test]
    async fn purchase_validation() {
        let bridge = configured().await;
        assert_eq!(
            bridge
                .track_purchase(9.99, "dollars", None)
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidArgument
        );
        bridge
            .track_purchase(9.99, "usd", Some("sku-1".into()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn getters_reflect_native_state_without_caching() {
        let bridge = configured().await;
        assert!(bridge.is_tracking_enabled().await.unwrap());

        // Change native state behind the facade's back.
        bridge
            .adapter()
            .module()
            .set_tracking_enabled(false)
            .await
            .unwrap();
        assert!(!bridge.is_tracking_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn reset_visitor_id_replaces_identifier() {
        let bridge = configured().await;
        let before = bridge.visitor_id().await.unwrap();
        let returned = bridge.reset_visitor_id().await.unwrap();
        let after = bridge.visitor_id().await.unwrap();
        assert_ne!(before, after);
        assert_eq!(returned, after);
    }

    #[tokio::test]
    async fn native_failure_is_a_rejection() {
        let bridge = configured().await;
        bridge.adapter().module().set_available(false);
        let err = bridge.track_install().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NativeBridge);
        assert!(err.to_string().contains("trackInstall"));
    }

    #[tokio::test]
    async fn failed_reconfigure_keeps_previous_configuration() {
        let bridge = configured().await;
        bridge.adapter().module().set_available(false);
        let err = bridge
            .configure("K2", Environment::Staging, ConfigureOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NativeBridge);

        let config = bridge.configuration().unwrap();
        assert_eq!(config.sdk_key().as_str(), "K1");
        assert_eq!(config.environment(), Environment::Production);
    }

    #[tokio::test]
    async fn lifecycle_events_drive_tracking() {
        let bridge = configured().await;
        let module = bridge.adapter().module();
        assert!(module.emit_install());
        assert!(module.emit_open());

        let outcomes = bridge.process_pending_events().await;
        assert!(matches!(
            outcomes.as_slice(),
            [
                EventOutcome::LifecycleTracked(Lifecycle::Install),
                EventOutcome::LifecycleTracked(Lifecycle::Open)
            ]
        ));
        let calls = module.calls();
        assert!(calls.contains(&NativeCall::TrackInstall));
        assert!(calls.contains(&NativeCall::TrackOpen));
    }

    #[tokio::test]
    async fn lifecycle_tracking_can_be_disabled() {
        let bridge = ios();
        bridge
            .configure(
                "K1",
                Environment::Development,
                ConfigureOptions {
                    track_lifecycle: false,
                    ..ConfigureOptions::default()
                },
            )
            .await
            .unwrap();
        bridge.adapter().module().emit_open();

        let outcomes = bridge.process_pending_events().await;
        assert!(matches!(
            outcomes.as_slice(),
            [EventOutcome::LifecycleSkipped(Lifecycle::Open)]
        ));
        assert!(!bridge
            .adapter()
            .module()
            .calls()
            .contains(&NativeCall::TrackOpen));
    }

    #[tokio::test]
    async fn lifecycle_before_configure_is_skipped() {
        let bridge = ios();
        bridge.adapter().module().emit_install();
        let outcomes = bridge.process_pending_events().await;
        assert!(matches!(
            outcomes.as_slice(),
            [EventOutcome::LifecycleSkipped(Lifecycle::Install)]
        ));
    }

    #[tokio::test]
    async fn android_privacy_asymmetry() {
        let bridge = LinkBridge::new(AndroidBridge::new(InMemoryNative::new()));
        bridge
            .configure("K1", Environment::Production, ConfigureOptions::default())
            .await
            .unwrap();
        assert_eq!(bridge.platform(), Platform::Android);
        assert_eq!(
            bridge.request_tracking_permission().await.unwrap(),
            TrackingAuthorization::Authorized
        );
        assert_eq!(
            bridge.att_status().await.unwrap(),
            TrackingAuthorization::Authorized
        );
        bridge.update_conversion_value(10).await.unwrap();
        assert!(bridge.update_conversion_value(64).await.is_err());
    }

    #[tokio::test]
    async fn listener_receives_handled_link() {
        let bridge = configured().await;
        let seen: Arc<StdMutex<Vec<DeepLinkData>>> = Arc::default();
        let _sub = {
            let seen = Arc::clone(&seen);
            bridge.add_deep_link_listener(move |data| {
                seen.lock().unwrap().push(data.clone());
                Ok(())
            })
        };

        assert!(bridge
            .handle_universal_link("https://x.com/product?id=123")
            .await
            .unwrap());
        bridge.process_pending_events().await;

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].path.as_deref(), Some("/product"));
    }

    #[tokio::test]
    async fn empty_link_is_invalid() {
        let bridge = configured().await;
        let err = bridge.handle_universal_link("  ").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

//! An in-process native module.
//!
//! Behaves like the platform SDKs from the bridge's point of view: it keeps
//! the visitor and user identifiers, tracking toggles, the ATT status and
//! sessions, resolves links and emits them as events. Hosts without a native
//! SDK (desktop shells, CI) and the test-suites use it in place of the real
//! module. Every state-changing call is recorded in a journal.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use lb_core::{
    Configuration, ConversionValue, DeepLinkData, Environment, EventBatch, PurchaseEvent,
    TrackEvent, TrackingAuthorization, UserId,
};
use uuid::Uuid;

use crate::error::{NativeError, NativeResult};
use crate::events::{EventEmitter, NativeEvent};
use crate::module::{NativeModule, TrackingTransparency};

const MODULE_NAME: &str = "InMemoryNative";

/// A state-changing call received by the module.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    Configure {
        environment: Environment,
        auto_handle_deep_links: bool,
    },
    TrackEvent(TrackEvent),
    TrackEventBatch(Vec<TrackEvent>),
    TrackPurchase(PurchaseEvent),
    TrackInstall,
    TrackOpen,
    StartSession,
    EndSession,
    SetUserId(String),
    ResetVisitorId,
    SetTrackingEnabled(bool),
    SetAdvertisingTrackingEnabled(bool),
    RequestAuthorization,
    UpdateConversionValue(ConversionValue),
    HandleLink(String),
}

/// A finished session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionRecord {
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn duration(&self) -> TimeDelta {
        self.ended_at - self.started_at
    }
}

#[derive(Debug)]
struct State {
    available: bool,
    environment: Option<Environment>,
    armed: bool,
    user_id: Option<String>,
    visitor_id: String,
    advertising_id: String,
    tracking_enabled: bool,
    advertising_tracking_enabled: bool,
    authorization: TrackingAuthorization,
    prompt_response: TrackingAuthorization,
    conversion_value: Option<ConversionValue>,
    active_session: Option<DateTime<Utc>>,
    sessions: Vec<SessionRecord>,
    initial_link: Option<String>,
    link_domains: HashSet<String>,
    calls: Vec<NativeCall>,
}

impl Default for State {
    fn default() -> Self {
        Self {
            available: true,
            environment: None,
            armed: false,
            user_id: None,
            visitor_id: Uuid::new_v4().to_string(),
            advertising_id: Uuid::new_v4().to_string().to_uppercase(),
            tracking_enabled: true,
            advertising_tracking_enabled: true,
            authorization: TrackingAuthorization::NotDetermined,
            prompt_response: TrackingAuthorization::Authorized,
            conversion_value: None,
            active_session: None,
            sessions: Vec::new(),
            initial_link: None,
            link_domains: HashSet::new(),
            calls: Vec::new(),
        }
    }
}

/// In-process stand-in for a platform SDK.
#[derive(Debug, Default)]
pub struct InMemoryNative {
    state: Mutex<State>,
    emitter: Mutex<Option<EventEmitter>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryNative {
    pub fn new() -> Self {
        Self::default()
    }

    /// The status the simulated user picks when prompted for tracking.
    #[must_use]
    pub fn with_prompt_response(self, response: TrackingAuthorization) -> Self {
        lock(&self.state).prompt_response = response;
        self
    }

    /// Starts with an already-determined tracking authorization.
    #[must_use]
    pub fn with_authorization(self, status: TrackingAuthorization) -> Self {
        lock(&self.state).authorization = status;
        self
    }

    /// Simulates a cold start from `url`.
    #[must_use]
    pub fn with_initial_link(self, url: impl Into<String>) -> Self {
        lock(&self.state).initial_link = Some(url.into());
        self
    }

    /// Restricts recognized web links to these hosts. Custom-scheme links
    /// are always recognized.
    #[must_use]
    pub fn with_link_domains<I, S>(self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.state).link_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Makes every call fail as if the platform module were not linked.
    pub fn set_available(&self, available: bool) {
        lock(&self.state).available = available;
    }

    /// Simulates the OS delivering `url` to the running app. Only processed
    /// when deep-link capture was armed by `configure`.
    pub fn deliver_url(&self, url: &str) -> bool {
        if !lock(&self.state).armed {
            tracing::debug!(url, "automatic deep link handling is off; ignoring URL");
            return false;
        }
        self.resolve_link(url)
    }

    /// Emits an install lifecycle notification.
    pub fn emit_install(&self) -> bool {
        self.emit(NativeEvent::Install)
    }

    /// Emits an open lifecycle notification.
    pub fn emit_open(&self) -> bool {
        self.emit(NativeEvent::Open)
    }

    /// Journal of state-changing calls, oldest first.
    pub fn calls(&self) -> Vec<NativeCall> {
        lock(&self.state).calls.clone()
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.state).armed
    }

    pub fn environment(&self) -> Option<Environment> {
        lock(&self.state).environment
    }

    pub fn conversion_value(&self) -> Option<ConversionValue> {
        lock(&self.state).conversion_value
    }

    pub fn sessions(&self) -> Vec<SessionRecord> {
        lock(&self.state).sessions.clone()
    }

    pub fn active_session_started_at(&self) -> Option<DateTime<Utc>> {
        lock(&self.state).active_session
    }

    fn state(&self) -> NativeResult<MutexGuard<'_, State>> {
        let state = lock(&self.state);
        if !state.available {
            return Err(NativeError::Unavailable(MODULE_NAME));
        }
        Ok(state)
    }

    fn record(&self, call: NativeCall) -> NativeResult<()> {
        self.state()?.calls.push(call);
        Ok(())
    }

    /// Records a tracking call unless tracking is disabled, in which case the
    /// native SDK accepts and discards it.
    fn record_tracking(&self, call: NativeCall) -> NativeResult<()> {
        let mut state = self.state()?;
        if !state.tracking_enabled {
            tracing::debug!(?call, "tracking disabled; discarding");
            return Ok(());
        }
        state.calls.push(call);
        Ok(())
    }

    fn resolve_link(&self, url: &str) -> bool {
        let data = match DeepLinkData::from_url(url) {
            Ok(data) => data,
            Err(err) => {
                tracing::debug!(url, error = %err, "not a trackable link");
                return false;
            }
        };
        if !self.domain_allowed(url) {
            tracing::debug!(url, "link host is not a configured link domain");
            return false;
        }
        self.emit(NativeEvent::DeepLink(data));
        true
    }

    fn domain_allowed(&self, url: &str) -> bool {
        let state = lock(&self.state);
        if state.link_domains.is_empty() {
            return true;
        }
        let Ok(parsed) = url::Url::parse(url) else {
            return false;
        };
        if !matches!(parsed.scheme(), "http" | "https") {
            return true;
        }
        parsed
            .host_str()
            .is_some_and(|host| state.link_domains.contains(host))
    }

    fn emit(&self, event: NativeEvent) -> bool {
        let emitter = lock(&self.emitter).clone();
        match emitter {
            Some(emitter) => emitter.emit(event),
            None => {
                tracing::debug!(?event, "no event emitter attached; dropping event");
                false
            }
        }
    }
}

impl NativeModule for InMemoryNative {
    fn attach(&self, emitter: EventEmitter) {
        *lock(&self.emitter) = Some(emitter);
    }

    async fn configure(&self, config: &Configuration) -> NativeResult<()> {
        let mut state = self.state()?;
        state.environment = Some(config.environment());
        state.armed = config.auto_handle_deep_links();
        state.calls.push(NativeCall::Configure {
            environment: config.environment(),
            auto_handle_deep_links: config.auto_handle_deep_links(),
        });
        Ok(())
    }

    async fn track_event(&self, event: &TrackEvent) -> NativeResult<()> {
        self.record_tracking(NativeCall::TrackEvent(event.clone()))
    }

    async fn track_event_batch(&self, batch: &EventBatch) -> NativeResult<()> {
        self.record_tracking(NativeCall::TrackEventBatch(batch.events().to_vec()))
    }

    async fn track_purchase(&self, purchase: &PurchaseEvent) -> NativeResult<()> {
        self.record_tracking(NativeCall::TrackPurchase(purchase.clone()))
    }

    async fn track_install(&self) -> NativeResult<()> {
        self.record_tracking(NativeCall::TrackInstall)
    }

    async fn track_open(&self) -> NativeResult<()> {
        self.record_tracking(NativeCall::TrackOpen)
    }

    async fn start_session(&self) -> NativeResult<()> {
        let mut state = self.state()?;
        let now = Utc::now();
        if let Some(started_at) = state.active_session.replace(now) {
            tracing::debug!(%started_at, "session restarted; closing previous session");
            state.sessions.push(SessionRecord {
                started_at,
                ended_at: now,
            });
        }
        state.calls.push(NativeCall::StartSession);
        Ok(())
    }

    async fn end_session(&self) -> NativeResult<()> {
        let mut state = self.state()?;
        match state.active_session.take() {
            Some(started_at) => state.sessions.push(SessionRecord {
                started_at,
                ended_at: Utc::now(),
            }),
            None => tracing::debug!("endSession without an active session"),
        }
        state.calls.push(NativeCall::EndSession);
        Ok(())
    }

    async fn set_user_id(&self, user_id: &UserId) -> NativeResult<()> {
        let mut state = self.state()?;
        state.user_id = Some(user_id.to_string());
        state.calls.push(NativeCall::SetUserId(user_id.to_string()));
        Ok(())
    }

    async fn user_id(&self) -> NativeResult<Option<String>> {
        Ok(self.state()?.user_id.clone())
    }

    async fn visitor_id(&self) -> NativeResult<String> {
        Ok(self.state()?.visitor_id.clone())
    }

    async fn reset_visitor_id(&self) -> NativeResult<String> {
        let mut state = self.state()?;
        state.visitor_id = Uuid::new_v4().to_string();
        state.calls.push(NativeCall::ResetVisitorId);
        Ok(state.visitor_id.clone())
    }

    async fn set_tracking_enabled(&self, enabled: bool) -> NativeResult<()> {
        let mut state = self.state()?;
        state.tracking_enabled = enabled;
        state.calls.push(NativeCall::SetTrackingEnabled(enabled));
        Ok(())
    }

    async fn is_tracking_enabled(&self) -> NativeResult<bool> {
        Ok(self.state()?.tracking_enabled)
    }

    async fn set_advertising_tracking_enabled(&self, enabled: bool) -> NativeResult<()> {
        let mut state = self.state()?;
        state.advertising_tracking_enabled = enabled;
        state
            .calls
            .push(NativeCall::SetAdvertisingTrackingEnabled(enabled));
        Ok(())
    }

    async fn is_advertising_tracking_enabled(&self) -> NativeResult<bool> {
        Ok(self.state()?.advertising_tracking_enabled)
    }

    async fn advertising_id(&self) -> NativeResult<Option<String>> {
        let state = self.state()?;
        Ok(state
            .advertising_tracking_enabled
            .then(|| state.advertising_id.clone()))
    }

    async fn handle_link(&self, url: &str) -> NativeResult<bool> {
        self.record(NativeCall::HandleLink(url.to_string()))?;
        Ok(self.resolve_link(url))
    }

    async fn initial_link(&self) -> NativeResult<Option<DeepLinkData>> {
        let url = self.state()?.initial_link.clone();
        // A launch URL the SDK cannot parse is reported as no link.
        Ok(url.and_then(|url| DeepLinkData::from_url(&url).ok()))
    }
}

impl TrackingTransparency for InMemoryNative {
    async fn request_authorization(&self) -> NativeResult<TrackingAuthorization> {
        let mut state = self.state()?;
        if state.authorization == TrackingAuthorization::NotDetermined {
            state.authorization = state.prompt_response;
        }
        state.calls.push(NativeCall::RequestAuthorization);
        Ok(state.authorization)
    }

    async fn authorization_status(&self) -> NativeResult<TrackingAuthorization> {
        Ok(self.state()?.authorization)
    }

    async fn update_conversion_value(&self, value: ConversionValue) -> NativeResult<()> {
        let mut state = self.state()?;
        state.conversion_value = Some(value);
        state.calls.push(NativeCall::UpdateConversionValue(value));
        Ok(())
    }
}

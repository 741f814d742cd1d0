//! Events flowing from native code into the bridge.
//!
//! Native code may emit from any thread. Events are queued on an unbounded
//! channel and consumed in arrival order by a single receiver.
//!
//! An emitter gated on a [`DeepLinkDispatcher`] drops deep links emitted
//! while no listener is registered, so the channel never carries a link to a
//! listener that subscribed after the emission. Lifecycle events are always
//! queued.

use lb_core::{DeepLinkData, DeepLinkDispatcher};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::NativeResult;

/// A notification emitted by the native layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NativeEvent {
    /// An incoming deep link, already resolved by the native SDK.
    DeepLink(DeepLinkData),
    /// First launch after install.
    Install,
    /// The app was opened or brought to the foreground.
    Open,
}

/// Receiving half of the native event channel.
pub type EventReceiver = mpsc::UnboundedReceiver<NativeEvent>;

/// Sending half handed to native code.
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<NativeEvent>,
    listeners: Option<DeepLinkDispatcher>,
}

/// Creates a connected emitter/receiver pair.
pub fn event_channel() -> (EventEmitter, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventEmitter {
            tx,
            listeners: None,
        },
        rx,
    )
}

impl EventEmitter {
    /// Drops deep links emitted while `listeners` has no registration.
    #[must_use]
    pub fn gated_on(mut self, listeners: DeepLinkDispatcher) -> Self {
        self.listeners = Some(listeners);
        self
    }

    /// Queues an event. Returns `false` if the event was dropped: the bridge
    /// is gone, or a gated emitter got a deep link with no listener present.
    pub fn emit(&self, event: NativeEvent) -> bool {
        if let NativeEvent::DeepLink(data) = &event {
            if self
                .listeners
                .as_ref()
                .is_some_and(|listeners| listeners.listener_count() == 0)
            {
                tracing::debug!(url = ?data.url, "no deep link listeners registered; dropping event");
                return false;
            }
        }
        match self.tx.send(event) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(event = ?err.0, "event receiver closed; dropping native event");
                false
            }
        }
    }

    pub fn emit_deep_link(&self, data: DeepLinkData) -> bool {
        self.emit(NativeEvent::DeepLink(data))
    }

    /// Decodes and queues a JSON event, as sent by bridges that serialize
    /// events to strings (`{"type":"deep_link","url":...}`).
    pub fn emit_json(&self, payload: &str) -> NativeResult<bool> {
        let event: NativeEvent = serde_json::from_str(payload)?;
        Ok(self.emit(event))
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

//! Deep-link listener registry.
//!
//! Listeners are kept in registration order and invoked back-to-back for each
//! event. Every pass works on a snapshot of the registrations taken when the
//! pass starts:
//! - a listener removed during a pass still sees the event currently being
//!   delivered if it had not been reached yet, and nothing after that;
//! - a listener added during a pass first sees the next event.
//!
//! A failing listener (an `Err` return or a panic) is logged and reported in
//! the [`DispatchReport`]; it never stops delivery to the remaining listeners.
//!
//! Events dispatched while no listener is registered are dropped.
//!
//! # Thread Safety
//!
//! The registry is `Send + Sync` and can be shared freely. Passes are expected
//! to be driven by a single consumer (the facade's event pump), which is what
//! keeps the callback passes of two events from interleaving.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;

use crate::deep_link::DeepLinkData;
use crate::error::BridgeError;

/// Error returned by a listener callback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ListenerError(String);

impl ListenerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<&str> for ListenerError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for ListenerError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Outcome of a single listener invocation.
pub type ListenerResult = Result<(), ListenerError>;

type Callback = Arc<dyn Fn(&DeepLinkData) -> ListenerResult + Send + Sync>;

/// Identity of one registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Registration {
    id: ListenerId,
    callback: Callback,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Registration>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // Callbacks never run under the lock, so a poisoned registry is still consistent.
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Ordered registry of deep-link listeners.
///
/// Clones share the same registry.
#[derive(Clone, Default)]
pub struct DeepLinkDispatcher {
    registry: Arc<Mutex<Registry>>,
}

impl fmt::Debug for DeepLinkDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeepLinkDispatcher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl DeepLinkDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener and returns the handle that removes it.
    pub fn add_listener<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&DeepLinkData) -> ListenerResult + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry.entries.push(Registration {
            id,
            callback: Arc::new(callback),
        });
        tracing::debug!(listener = %id, total = registry.entries.len(), "deep link listener added");

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry).entries.len()
    }

    /// Removes every registration. Returns how many were removed.
    pub fn remove_all_listeners(&self) -> usize {
        let removed = std::mem::take(&mut lock(&self.registry).entries).len();
        tracing::debug!(removed, "all deep link listeners removed");
        removed
    }

    /// Delivers `data` to every listener registered when the pass starts.
    pub fn dispatch(&self, data: &DeepLinkData) -> DispatchReport {
        let snapshot: Vec<(ListenerId, Callback)> = lock(&self.registry)
            .entries
            .iter()
            .map(|entry| (entry.id, Arc::clone(&entry.callback)))
            .collect();

        let mut report = DispatchReport::default();
        if snapshot.is_empty() {
            tracing::debug!(url = ?data.url, "no deep link listeners registered; dropping event");
            return report;
        }

        for (id, callback) in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(data))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(err)) => report.record_failure(id, err.to_string()),
                Err(payload) => report.record_failure(id, panic_message(payload.as_ref())),
            }
        }

        tracing::debug!(
            url = ?data.url,
            delivered = report.delivered,
            failed = report.failures.len(),
            "deep link dispatched"
        );
        report
    }
}

fn remove(registry: &Mutex<Registry>, id: ListenerId) -> bool {
    let mut registry = lock(registry);
    let Some(position) = registry.entries.iter().position(|entry| entry.id == id) else {
        return false;
    };
    registry.entries.remove(position);
    tracing::debug!(listener = %id, remaining = registry.entries.len(), "deep link listener removed");
    true
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "listener panicked".to_string())
}

/// Handle to one listener registration.
///
/// Dropping the handle does not remove the listener; call
/// [`Subscription::unsubscribe`]. Clones refer to the same registration.
#[derive(Clone)]
#[must_use = "the listener stays registered; keep the subscription to remove it later"]
pub struct Subscription {
    id: ListenerId,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Removes this registration. Returns `false` if it was already removed.
    ///
    /// Safe to call from inside a listener callback.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| remove(&registry, self.id))
    }

    /// Whether the registration is still present.
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            lock(&registry)
                .entries
                .iter()
                .any(|entry| entry.id == self.id)
        })
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Result of one dispatch pass.
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Listeners that returned successfully.
    pub delivered: usize,
    /// One `ListenerCallback` error per failed listener, in call order.
    pub failures: Vec<BridgeError>,
}

impl DispatchReport {
    /// Total number of listeners invoked.
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }

    fn record_failure(&mut self, listener: ListenerId, message: String) {
        tracing::warn!(listener = %listener, error = %message, "deep link listener failed");
        self.failures
            .push(BridgeError::ListenerCallback { listener, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::OnceLock;

    use insta::assert_snapshot;

    type Log = Arc<Mutex<Vec<(String, Option<String>)>>>;

    fn recorder(log: &Log, name: &str) -> impl Fn(&DeepLinkData) -> ListenerResult + use<> {
        let log = Arc::clone(log);
        let name = name.to_string();
        move |data| {
            log.lock().unwrap().push((name.clone(), data.url.clone()));
            Ok(())
        }
    }

    fn link(url: &str) -> DeepLinkData {
        DeepLinkData::from_url(url).unwrap()
    }

    fn names(log: &Log) -> Vec<String> {
        log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    #[test]
    fn delivers_in_registration_order() {
        let dispatcher = DeepLinkDispatcher::new();
        let log = Log::default();
        let _a = dispatcher.add_listener(recorder(&log, "a"));
        let _b = dispatcher.add_listener(recorder(&log, "b"));
        let _c = dispatcher.add_listener(recorder(&log, "c"));

        let report = dispatcher.dispatch(&link("https://x.com/one"));

        assert_eq!(report.delivered, 3);
        assert!(report.failures.is_empty());
        assert_eq!(names(&log), ["a", "b", "c"]);
    }

    #[test]
    fn every_listener_sees_identical_payload() {
        let dispatcher = DeepLinkDispatcher::new();
        let seen: Arc<Mutex<Vec<DeepLinkData>>> = Arc::default();
        let subs: Vec<_> = (0..3)
            .map(|_| {
                let seen = Arc::clone(&seen);
                dispatcher.add_listener(move |data| {
                    seen.lock().unwrap().push(data.clone());
                    Ok(())
                })
            })
            .collect();
        assert_eq!(subs.len(), 3);

        let event = link("https://x.com/product?id=123");
        dispatcher.dispatch(&event);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|d| *d == event));
    }

    #[test]
    fn no_listeners_drops_event() {
        let dispatcher = DeepLinkDispatcher::new();
        let report = dispatcher.dispatch(&link("https://x.com/lost"));
        assert_eq!(report.attempted(), 0);

        // Nothing is replayed to a late subscriber.
        let log = Log::default();
        let _sub = dispatcher.add_listener(recorder(&log, "late"));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn unsubscribe_removes_only_that_registration() {
        let dispatcher = DeepLinkDispatcher::new();
        let log = Log::default();
        let l1 = dispatcher.add_listener(recorder(&log, "l1"));
        let _l2 = dispatcher.add_listener(recorder(&log, "l2"));

        dispatcher.dispatch(&link("https://x.com/e"));
        assert!(l1.unsubscribe());
        dispatcher.dispatch(&link("https://x.com/f"));

        let entries = log.lock().unwrap().clone();
        assert_eq!(
            entries,
            vec![
                ("l1".to_string(), Some("https://x.com/e".to_string())),
                ("l2".to_string(), Some("https://x.com/e".to_string())),
                ("l2".to_string(), Some("https://x.com/f".to_string())),
            ]
        );
    }

    #[test]
    fn duplicate_callbacks_are_distinct_registrations() {
        let dispatcher = DeepLinkDispatcher::new();
        let log = Log::default();
        let first = dispatcher.add_listener(recorder(&log, "same"));
        let second = dispatcher.add_listener(recorder(&log, "same"));
        assert_ne!(first.id(), second.id());

        assert!(first.unsubscribe());
        assert!(!first.unsubscribe());
        assert!(second.is_active());

        dispatcher.dispatch(&link("https://x.com/dup"));
        assert_eq!(names(&log), ["same"]);
    }

    #[test]
    fn failing_listener_is_isolated() {
        let dispatcher = DeepLinkDispatcher::new();
        let log = Log::default();
        let _a = dispatcher.add_listener(recorder(&log, "a"));
        let bad = dispatcher.add_listener(|_| Err(ListenerError::new("render failed")));
        let _c = dispatcher.add_listener(recorder(&log, "c"));

        let report = dispatcher.dispatch(&link("https://x.com/x"));

        assert_eq!(names(&log), ["a", "c"]);
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(
            report.failures[0].kind(),
            crate::error::ErrorKind::ListenerCallback
        );
        assert_snapshot!(
            report.failures[0].to_string(),
            @"deep link listener #2 failed: render failed"
        );
        assert_eq!(bad.id(), ListenerId(2));
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let dispatcher = DeepLinkDispatcher::new();
        let log = Log::default();
        let _boom = dispatcher.add_listener(|_| panic!("boom"));
        let _ok = dispatcher.add_listener(recorder(&log, "ok"));

        let report = dispatcher.dispatch(&link("https://x.com/p"));

        assert_eq!(names(&log), ["ok"]);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].to_string().contains("boom"));

        // The registry stays usable after a panic.
        assert_eq!(dispatcher.listener_count(), 2);
    }

    #[test]
    fn self_unsubscribe_during_dispatch() {
        let dispatcher = DeepLinkDispatcher::new();
        let log = Log::default();
        let handle: Arc<OnceLock<Subscription>> = Arc::default();

        let once = {
            let log = Arc::clone(&log);
            let handle = Arc::clone(&handle);
            dispatcher.add_listener(move |_| {
                log.lock().unwrap().push(("once".into(), None));
                if let Some(sub) = handle.get() {
                    sub.unsubscribe();
                }
                Ok(())
            })
        };
        handle.set(once).unwrap();
        let _after = dispatcher.add_listener(recorder(&log, "after"));

        dispatcher.dispatch(&link("https://x.com/1"));
        dispatcher.dispatch(&link("https://x.com/2"));

        assert_eq!(names(&log), ["once", "after", "after"]);
    }

    #[test]
    fn removal_of_later_listener_mid_pass_applies_next_pass() {
        let dispatcher = DeepLinkDispatcher::new();
        let log = Log::default();
        let victim: Arc<OnceLock<Subscription>> = Arc::default();

        let _remover = {
            let victim = Arc::clone(&victim);
            dispatcher.add_listener(move |_| {
                if let Some(sub) = victim.get() {
                    sub.unsubscribe();
                }
                Ok(())
            })
        };
        victim
            .set(dispatcher.add_listener(recorder(&log, "victim")))
            .unwrap();

        dispatcher.dispatch(&link("https://x.com/1"));
        dispatcher.dispatch(&link("https://x.com/2"));

        assert_eq!(names(&log), ["victim"]);
    }

    #[test]
    fn listener_added_during_pass_sees_next_event() {
        let dispatcher = DeepLinkDispatcher::new();
        let log = Log::default();
        let added: Arc<Mutex<Vec<Subscription>>> = Arc::default();

        let _adder = {
            let inner = dispatcher.clone();
            let log = Arc::clone(&log);
            let added = Arc::clone(&added);
            dispatcher.add_listener(move |_| {
                let mut added = added.lock().unwrap();
                if added.is_empty() {
                    added.push(inner.add_listener(recorder(&log, "late")));
                }
                Ok(())
            })
        };

        dispatcher.dispatch(&link("https://x.com/1"));
        assert!(log.lock().unwrap().is_empty());
        dispatcher.dispatch(&link("https://x.com/2"));
        assert_eq!(names(&log), ["late"]);
    }

    #[test]
    fn identical_consecutive_events_are_not_deduplicated() {
        let dispatcher = DeepLinkDispatcher::new();
        let log = Log::default();
        let _sub = dispatcher.add_listener(recorder(&log, "l"));

        let event = link("https://x.com/same");
        dispatcher.dispatch(&event);
        dispatcher.dispatch(&event);

        assert_eq!(names(&log), ["l", "l"]);
    }

    #[test]
    fn remove_all_listeners_clears_registry() {
        let dispatcher = DeepLinkDispatcher::new();
        let log = Log::default();
        let sub = dispatcher.add_listener(recorder(&log, "a"));
        let _other = dispatcher.add_listener(recorder(&log, "b"));

        assert_eq!(dispatcher.remove_all_listeners(), 2);
        assert_eq!(dispatcher.listener_count(), 0);
        assert!(!sub.is_active());
        assert!(!sub.unsubscribe());
    }

    #[test]
    fn subscription_outliving_dispatcher_is_inert() {
        let dispatcher = DeepLinkDispatcher::new();
        let sub = dispatcher.add_listener(|_| Ok(()));
        drop(dispatcher);
        assert!(!sub.is_active());
        assert!(!sub.unsubscribe());
    }
}

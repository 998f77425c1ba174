use std::collections::BTreeMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, error};

use crate::error::{EventError, EventResult};
use crate::{AFTER_PREFIX, BEFORE_PREFIX};

/// A subscriber. Receives the arguments passed to `emit`.
pub type Callback = Arc<dyn Fn(&Value) -> anyhow::Result<()> + Send + Sync>;

/// Token returned by [`EventBus::on`], consumed by [`EventBus::off`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    event: String,
    id: u64,
}

impl Subscription {
    /// The event this subscription listens to.
    pub fn event(&self) -> &str {
        &self.event
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.event, self.id)
    }
}

/// Outcome of one `emit`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitReport {
    /// Callbacks that were called.
    pub invoked: usize,
    /// Callbacks that returned an error or panicked.
    pub failed: usize,
}

/// Synchronous publish/subscribe keyed by event name.
pub struct EventBus {
    next_id: AtomicU64,
    handlers: RwLock<BTreeMap<String, Vec<(u64, Callback)>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: RwLock::new(BTreeMap::new()),
        }
    }

    /// Subscribe `callback` to `event`.
    pub fn on<F>(&self, event: &str, callback: F) -> EventResult<Subscription>
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on_callback(event, Arc::new(callback))
    }

    /// Subscribe an already shared callback to `event`.
    pub fn on_callback(&self, event: &str, callback: Callback) -> EventResult<Subscription> {
        if event.is_empty() {
            return Err(EventError::EmptyEventName);
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .map_err(|_| EventError::LockPoisoned)?
            .entry(event.to_string())
            .or_default()
            .push((id, callback));
        debug!(event, id, "subscribed");
        Ok(Subscription {
            event: event.to_string(),
            id,
        })
    }

    /// Subscribe to `before_<event>`.
    pub fn before<F>(&self, event: &str, callback: F) -> EventResult<Subscription>
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(&format!("{BEFORE_PREFIX}{event}"), callback)
    }

    /// Subscribe to `after_<event>`.
    pub fn after<F>(&self, event: &str, callback: F) -> EventResult<Subscription>
    where
        F: Fn(&Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.on(&format!("{AFTER_PREFIX}{event}"), callback)
    }

    /// Remove a subscription. Returns `true` if it was still registered.
    pub fn off(&self, subscription: &Subscription) -> bool {
        let Ok(mut handlers) = self.handlers.write() else {
            error!(%subscription, "event bus lock poisoned; cannot unsubscribe");
            return false;
        };
        let Some(list) = handlers.get_mut(&subscription.event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| *id != subscription.id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&subscription.event);
        }
        if removed {
            debug!(%subscription, "unsubscribed");
        }
        removed
    }

    /// Invoke every subscriber of `event` with `args`.
    ///
    /// Never fails: callback errors and panics are logged and counted.
    pub fn emit(&self, event: &str, args: &Value) -> EmitReport {
        let snapshot: Vec<(u64, Callback)> = match self.handlers.read() {
            Ok(handlers) => handlers.get(event).cloned().unwrap_or_default(),
            Err(_) => {
                error!(event, "event bus lock poisoned; dropping emit");
                return EmitReport::default();
            }
        };

        let mut report = EmitReport::default();
        for (id, callback) in snapshot {
            report.invoked += 1;
            match catch_unwind(AssertUnwindSafe(|| callback(args))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    report.failed += 1;
                    error!(event, id, error = ?err, "event callback failed");
                }
                Err(panic) => {
                    report.failed += 1;
                    let message = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic payload".into());
                    error!(event, id, panic = %message, "event callback panicked");
                }
            }
        }
        if report.invoked > 0 {
            debug!(event, invoked = report.invoked, failed = report.failed, "emitted");
        }
        report
    }

    /// Number of subscribers of `event`.
    pub fn subscriber_count(&self, event: &str) -> usize {
        self.handlers
            .read()
            .map(|handlers| handlers.get(event).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Names of every event with at least one subscriber.
    pub fn events(&self) -> Vec<String> {
        self.handlers
            .read()
            .map(|handlers| handlers.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.clear();
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.events())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn counter() -> (Arc<AtomicUsize>, impl Fn(&Value) -> anyhow::Result<()> + Send + Sync) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move |_: &Value| {
            inner.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    // ---- Test 1: delivery ----

    #[test]
    fn emit_invokes_subscriber_once() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        bus.on("x", cb).unwrap();
        let report = bus.emit("x", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(report, EmitReport { invoked: 1, failed: 0 });
    }

    #[test]
    fn emit_passes_arguments() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        bus.on("taskChanged", move |args| {
            *sink.lock().unwrap() = Some(args.clone());
            Ok(())
        })
        .unwrap();
        bus.emit("taskChanged", &json!({"AVALON_TASK": "rig"}));
        assert_eq!(*seen.lock().unwrap(), Some(json!({"AVALON_TASK": "rig"})));
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = EventBus::new();
        assert_eq!(bus.emit("nobody", &Value::Null), EmitReport::default());
    }

    #[test]
    fn callbacks_run_in_subscription_order() {
        let bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let order = order.clone();
            bus.on("x", move |_| {
                order.lock().unwrap().push(tag);
                Ok(())
            })
            .unwrap();
        }
        bus.emit("x", &Value::Null);
        assert_eq!(*order.lock().unwrap(), vec!["a", "b", "c"]);
    }

    // ---- Test 2: unsubscription ----

    #[test]
    fn off_stops_delivery() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        let token = bus.on("x", cb).unwrap();
        bus.emit("x", &Value::Null);
        assert!(bus.off(&token));
        assert!(!bus.off(&token));
        bus.emit("x", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(bus.subscriber_count("x"), 0);
        assert!(bus.events().is_empty());
    }

    #[test]
    fn dropping_the_callback_owner_does_not_break_emit() {
        let bus = EventBus::new();
        let token = {
            let owned = String::from("scoped");
            bus.on("x", move |_| {
                assert_eq!(owned, "scoped");
                Ok(())
            })
            .unwrap()
        };
        assert_eq!(bus.emit("x", &Value::Null).failed, 0);
        bus.off(&token);
        assert_eq!(bus.emit("x", &Value::Null).invoked, 0);
    }

    // ---- Test 3: failure isolation ----

    #[test]
    fn failing_callback_does_not_stop_siblings() {
        let bus = EventBus::new();
        bus.on("x", |_| anyhow::bail!("boom")).unwrap();
        let (count, cb) = counter();
        bus.on("x", cb).unwrap();
        let report = bus.emit("x", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(report, EmitReport { invoked: 2, failed: 1 });
    }

    #[test]
    fn panicking_callback_is_contained() {
        let bus = EventBus::new();
        bus.on("x", |_| panic!("callback exploded")).unwrap();
        let (count, cb) = counter();
        bus.on("x", cb).unwrap();
        let report = bus.emit("x", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(report.failed, 1);
    }

    // ---- Test 4: snapshot semantics ----

    #[test]
    fn subscriptions_added_mid_emit_wait_for_next_emit() {
        let bus = Arc::new(EventBus::new());
        let (count, cb) = counter();
        let cb: Callback = Arc::new(cb);
        let inner_bus = bus.clone();
        bus.on("x", move |_| {
            inner_bus.on_callback("x", cb.clone())?;
            Ok(())
        })
        .unwrap();

        bus.emit("x", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 0);
        bus.emit("x", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn before_and_after_prefix_events() {
        let bus = EventBus::new();
        let (count, cb) = counter();
        bus.before("load", cb).unwrap();
        assert_eq!(bus.subscriber_count("before_load"), 1);
        let (_, cb) = counter();
        bus.after("load", cb).unwrap();
        assert_eq!(bus.subscriber_count("after_load"), 1);
        bus.emit("before_load", &Value::Null);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_event_name_is_rejected() {
        let bus = EventBus::new();
        let (_, cb) = counter();
        assert_eq!(bus.on("", cb).unwrap_err(), EventError::EmptyEventName);
    }

    #[test]
    fn clear_removes_everything() {
        let bus = EventBus::new();
        let (_, a) = counter();
        let (_, b) = counter();
        bus.on("x", a).unwrap();
        bus.on("y", b).unwrap();
        bus.clear();
        assert!(bus.events().is_empty());
    }
}

//! # In-Process Change Notifications
//!
//! A typed publish/subscribe bus. Listeners register for one [`EventKind`] and are called
//! synchronously, in registration order, every time an event of that kind is emitted.
//!
//! A listener that panics is logged and skipped; the remaining listeners still run and the
//! write that triggered the event is unaffected.

use crate::model::{CartLine, Order, OrderStatus, Restaurant};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    OrderCreated,
    OrderStatusChanged,
    CartChanged,
    /// The full order collection was re-fetched after a remote change.
    OrdersSynced,
    /// A restaurant's menu changed, or the catalog was seeded.
    CatalogChanged,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    OrderCreated(Order),
    OrderStatusChanged {
        order: Order,
        previous: OrderStatus,
    },
    CartChanged(Vec<CartLine>),
    OrdersSynced(Vec<Order>),
    CatalogChanged(Vec<Restaurant>),
}

impl SyncEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SyncEvent::OrderCreated(_) => EventKind::OrderCreated,
            SyncEvent::OrderStatusChanged { .. } => EventKind::OrderStatusChanged,
            SyncEvent::CartChanged(_) => EventKind::CartChanged,
            SyncEvent::OrdersSynced(_) => EventKind::OrdersSynced,
            SyncEvent::CatalogChanged(_) => EventKind::CatalogChanged,
        }
    }
}

pub type Listener = Arc<dyn Fn(&SyncEvent) + Send + Sync>;

/// Handle returned by every `subscribe`-style call.
///
/// `unsubscribe` runs the cancel action at most once; later calls are no-ops.
/// Dropping the handle without calling `unsubscribe` leaves the subscription active.
pub struct Subscription {
    cancel: Mutex<Option<Box<dyn FnOnce() + Send>>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    pub fn unsubscribe(&self) {
        let cancel = match self.cancel.lock() {
            Ok(mut slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(cancel) = cancel {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        match self.cancel.lock() {
            Ok(slot) => slot.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}

struct Registration {
    id: u64,
    kind: EventKind,
    listener: Listener,
}

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<Registration>>,
}

impl Registry {
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Registration>> {
        // A listener never runs while the lock is held, so poisoning cannot leave a half-edited list
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Cloneable handle to one shared listener registry.
#[derive(Clone, Default)]
pub struct EventBus {
    registry: Arc<Registry>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for events of `kind`.
    pub fn subscribe(
        &self,
        kind: EventKind,
        callback: impl Fn(&SyncEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.lock().push(Registration {
            id,
            kind,
            listener: Arc::new(callback),
        });
        debug!(?kind, id, "Listener registered");

        let registry = Arc::downgrade(&self.registry);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.lock().retain(|r| r.id != id);
                debug!(?kind, id, "Listener removed");
            }
        })
    }

    /// Calls every listener registered for the event's kind. Returns how many ran cleanly.
    pub fn emit(&self, event: &SyncEvent) -> usize {
        let kind = event.kind();
        // Snapshot so listeners may subscribe or unsubscribe while being called
        let listeners: Vec<(u64, Listener)> = self
            .registry
            .lock()
            .iter()
            .filter(|r| r.kind == kind)
            .map(|r| (r.id, r.listener.clone()))
            .collect();

        let mut delivered = 0;
        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "unknown panic".to_string());
                    error!(?kind, listener = id, %reason, "Listener failed");
                }
            }
        }
        debug!(?kind, delivered, "Event emitted");
        delivered
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry.lock().iter().filter(|r| r.kind == kind).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cart_event() -> SyncEvent {
        SyncEvent::CartChanged(vec![])
    }

    #[test]
    fn test_listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let _subs: Vec<Subscription> = (0..3)
            .map(|n| {
                let seen = seen.clone();
                bus.subscribe(EventKind::CartChanged, move |_| seen.lock().unwrap().push(n))
            })
            .collect();

        assert_eq!(bus.emit(&cart_event()), 3);
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_only_matching_kind_is_notified() {
        let bus = EventBus::new();
        let hits = Arc::new(AtomicU64::new(0));
        let counter = hits.clone();
        let _sub = bus.subscribe(EventKind::OrderCreated, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.emit(&cart_event());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panicking_listener_does_not_block_siblings() {
        let bus = EventBus::new();
        let reached = Arc::new(AtomicU64::new(0));

        let _first = bus.subscribe(EventKind::CartChanged, |_| panic!("listener blew up"));
        let counter = reached.clone();
        let _second = bus.subscribe(EventKind::CartChanged, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.emit(&cart_event()), 1);
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_double_unsubscribe_is_a_noop() {
        let bus = EventBus::new();
        let sub = bus.subscribe(EventKind::CartChanged, |_| {});
        let _other = bus.subscribe(EventKind::CartChanged, |_| {});
        assert_eq!(bus.listener_count(EventKind::CartChanged), 2);

        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(bus.listener_count(EventKind::CartChanged), 1);
    }

    #[test]
    fn test_listener_may_unsubscribe_itself_during_emit() {
        let bus = EventBus::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let inner = slot.clone();
        let sub = bus.subscribe(EventKind::CartChanged, move |_| {
            if let Some(sub) = inner.lock().unwrap().as_ref() {
                sub.unsubscribe();
            }
        });
        *slot.lock().unwrap() = Some(sub);

        assert_eq!(bus.emit(&cart_event()), 1);
        assert_eq!(bus.listener_count(EventKind::CartChanged), 0);
    }
}

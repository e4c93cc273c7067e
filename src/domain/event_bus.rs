//! Type-keyed publish/subscribe bus.
//!
//! [`EventBus`] maps each event type to an ordered list of listeners.
//! [`EventBus::publish`] calls them synchronously, in subscription order,
//! on the caller's tick. Each listener runs in isolation: an `Err` or a
//! panic is logged with the event type and the next listener still runs.
//!
//! The bus takes `&self` everywhere and keeps its map behind a
//! [`RefCell`], so listeners holding an `Rc<EventBus>` may subscribe,
//! unsubscribe or publish while a dispatch is in progress. Dispatch
//! iterates over a snapshot taken before the first listener runs;
//! structural changes apply from the next `publish` on.

use std::any::{Any, TypeId, type_name};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

type ErasedListener = dyn Fn(&dyn Any) -> anyhow::Result<()>;

/// Token returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

struct Subscription {
    id: ListenerId,
    listener: Rc<ErasedListener>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Synchronous event bus keyed by event type.
///
/// Not `Send`: the bus belongs to the simulation thread.
#[derive(Default)]
pub struct EventBus {
    subscriptions: RefCell<HashMap<TypeId, Vec<Subscription>>>,
    next_id: Cell<u64>,
}

impl EventBus {
    /// Creates a bus with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener` to the listeners of `E`.
    ///
    /// Subscribing the same logic twice registers it twice; each call
    /// returns its own [`ListenerId`].
    pub fn subscribe<E, F>(&self, listener: F) -> ListenerId
    where
        E: 'static,
        F: Fn(&E) -> anyhow::Result<()> + 'static,
    {
        let id = ListenerId(self.next_id.get());
        self.next_id.set(self.next_id.get().wrapping_add(1));

        let erased: Rc<ErasedListener> = Rc::new(move |event: &dyn Any| {
            event.downcast_ref::<E>().map_or(Ok(()), &listener)
        });
        self.subscriptions
            .borrow_mut()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(Subscription {
                id,
                listener: erased,
            });

        tracing::debug!(event_type = type_name::<E>(), %id, "subscribed");
        id
    }

    /// Removes listener `id` from the listeners of `E`.
    ///
    /// Removing the last listener of a type drops the type entry. Returns
    /// `false` if `id` was not subscribed to `E`.
    pub fn unsubscribe<E: 'static>(&self, id: ListenerId) -> bool {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let type_id = TypeId::of::<E>();
        let Some(listeners) = subscriptions.get_mut(&type_id) else {
            return false;
        };
        let Some(position) = listeners.iter().position(|sub| sub.id == id) else {
            return false;
        };
        listeners.remove(position);
        if listeners.is_empty() {
            subscriptions.remove(&type_id);
        }
        tracing::debug!(event_type = type_name::<E>(), %id, "unsubscribed");
        true
    }

    /// Delivers `event` to every current listener of `E`, in subscription
    /// order.
    ///
    /// Listener failures never reach the caller. Returns how many
    /// listeners completed without error.
    pub fn publish<E: 'static>(&self, event: &E) -> usize {
        let snapshot: Vec<Rc<ErasedListener>> = self
            .subscriptions
            .borrow()
            .get(&TypeId::of::<E>())
            .map(|listeners| {
                listeners
                    .iter()
                    .map(|sub| Rc::clone(&sub.listener))
                    .collect()
            })
            .unwrap_or_default();

        let erased: &dyn Any = event;
        let mut delivered = 0;
        for listener in snapshot {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(erased))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    tracing::error!(event_type = type_name::<E>(), error = %err, "listener failed");
                }
                Err(payload) => {
                    tracing::error!(
                        event_type = type_name::<E>(),
                        panic = panic_message(payload.as_ref()),
                        "listener panicked"
                    );
                }
            }
        }
        delivered
    }

    /// Drops every subscription of every type.
    pub fn clear(&self) {
        let mut subscriptions = self.subscriptions.borrow_mut();
        let types = subscriptions.len();
        subscriptions.clear();
        tracing::debug!(types, "event bus cleared");
    }

    /// Number of listeners currently subscribed to `E`.
    #[must_use]
    pub fn listener_count<E: 'static>(&self) -> usize {
        self.subscriptions
            .borrow()
            .get(&TypeId::of::<E>())
            .map_or(0, Vec::len)
    }

    /// Returns `true` if at least one listener is subscribed to `E`.
    #[must_use]
    pub fn has_listeners<E: 'static>(&self) -> bool {
        self.listener_count::<E>() > 0
    }

    /// Number of event types with at least one listener.
    #[must_use]
    pub fn event_type_count(&self) -> usize {
        self.subscriptions.borrow().len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners: usize = self.subscriptions.borrow().values().map(Vec::len).sum();
        f.debug_struct("EventBus")
            .field("event_types", &self.event_type_count())
            .field("listeners", &listeners)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TypeA(u32);

    #[derive(Debug)]
    struct TypeB;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recorder(log: &Log, tag: &'static str) -> impl Fn(&TypeA) -> anyhow::Result<()> + 'static {
        let log = Rc::clone(log);
        move |event: &TypeA| {
            log.borrow_mut().push(format!("{tag}:{}", event.0));
            Ok(())
        }
    }

    #[test]
    fn publish_without_listeners_returns_zero() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(&TypeA(1)), 0);
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let bus = EventBus::new();
        let log: Log = Rc::default();
        bus.subscribe(recorder(&log, "L1"));
        bus.subscribe(recorder(&log, "L2"));

        assert_eq!(bus.publish(&TypeA(7)), 2);
        assert_eq!(*log.borrow(), vec!["L1:7".to_string(), "L2:7".to_string()]);
    }

    #[test]
    fn only_exact_type_receives() {
        let bus = EventBus::new();
        let log: Log = Rc::default();
        bus.subscribe(recorder(&log, "A"));

        assert_eq!(bus.publish(&TypeB), 0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn failing_listener_does_not_stop_dispatch() {
        let bus = EventBus::new();
        let log: Log = Rc::default();
        bus.subscribe(|_: &TypeA| anyhow::bail!("boom"));
        bus.subscribe(recorder(&log, "L2"));

        assert_eq!(bus.publish(&TypeA(1)), 1);
        assert_eq!(*log.borrow(), vec!["L2:1".to_string()]);
    }

    #[test]
    fn panicking_listener_is_isolated() {
        let bus = EventBus::new();
        let log: Log = Rc::default();
        bus.subscribe(|_: &TypeA| -> anyhow::Result<()> { panic!("listener blew up") });
        bus.subscribe(recorder(&log, "L2"));

        assert_eq!(bus.publish(&TypeA(3)), 1);
        assert_eq!(*log.borrow(), vec!["L2:3".to_string()]);
    }

    #[test]
    fn unsubscribe_removes_only_that_listener() {
        let bus = EventBus::new();
        let log: Log = Rc::default();
        let first = bus.subscribe(recorder(&log, "dup"));
        bus.subscribe(recorder(&log, "dup"));
        assert_eq!(bus.listener_count::<TypeA>(), 2);

        assert!(bus.unsubscribe::<TypeA>(first));
        assert!(!bus.unsubscribe::<TypeA>(first));
        assert_eq!(bus.publish(&TypeA(2)), 1);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn last_unsubscribe_drops_type_entry() {
        let bus = EventBus::new();
        let id = bus.subscribe(|_: &TypeA| Ok(()));
        assert_eq!(bus.event_type_count(), 1);
        assert!(bus.unsubscribe::<TypeA>(id));
        assert_eq!(bus.event_type_count(), 0);
        assert!(!bus.has_listeners::<TypeA>());
    }

    #[test]
    fn unsubscribe_with_wrong_type_is_noop() {
        let bus = EventBus::new();
        let id = bus.subscribe(|_: &TypeA| Ok(()));
        assert!(!bus.unsubscribe::<TypeB>(id));
        assert_eq!(bus.listener_count::<TypeA>(), 1);
    }

    #[test]
    fn subscribe_during_dispatch_applies_next_publish() {
        let bus = Rc::new(EventBus::new());
        let log: Log = Rc::default();

        let inner_bus = Rc::clone(&bus);
        let inner_log = Rc::clone(&log);
        bus.subscribe(move |_: &TypeA| {
            inner_bus.subscribe(recorder(&inner_log, "late"));
            Ok(())
        });

        assert_eq!(bus.publish(&TypeA(1)), 1);
        assert!(log.borrow().is_empty());
        assert_eq!(bus.listener_count::<TypeA>(), 2);

        bus.publish(&TypeA(2));
        assert_eq!(*log.borrow(), vec!["late:2".to_string()]);
    }

    #[test]
    fn self_unsubscribe_during_dispatch() {
        let bus = Rc::new(EventBus::new());
        let log: Log = Rc::default();
        let own_id: Rc<Cell<Option<ListenerId>>> = Rc::default();

        let inner_bus = Rc::clone(&bus);
        let inner_id = Rc::clone(&own_id);
        let id = bus.subscribe(move |_: &TypeA| {
            if let Some(id) = inner_id.get() {
                inner_bus.unsubscribe::<TypeA>(id);
            }
            Ok(())
        });
        own_id.set(Some(id));
        bus.subscribe(recorder(&log, "after"));

        assert_eq!(bus.publish(&TypeA(1)), 2);
        assert_eq!(*log.borrow(), vec!["after:1".to_string()]);
        assert_eq!(bus.listener_count::<TypeA>(), 1);
    }

    #[test]
    fn nested_publish_is_allowed() {
        let bus = Rc::new(EventBus::new());
        let hits = Rc::new(Cell::new(0u32));

        let inner_bus = Rc::clone(&bus);
        bus.subscribe(move |_: &TypeA| {
            inner_bus.publish(&TypeB);
            Ok(())
        });
        let inner_hits = Rc::clone(&hits);
        bus.subscribe(move |_: &TypeB| {
            inner_hits.set(inner_hits.get() + 1);
            Ok(())
        });

        bus.publish(&TypeA(0));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let bus = EventBus::new();
        bus.subscribe(|_: &TypeA| Ok(()));
        bus.subscribe(|_: &TypeB| Ok(()));
        bus.clear();
        assert_eq!(bus.event_type_count(), 0);
        assert_eq!(bus.publish(&TypeA(1)), 0);
    }
}

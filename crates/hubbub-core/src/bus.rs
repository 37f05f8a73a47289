//! The simple emitter.
//!
//! [`EventBus`] keeps an ordered list of listeners and calls each one on
//! [`emit`](EventBus::emit). It is the building block the other channels and
//! the hub are made of.
//!
//! # Delivery during emit
//!
//! `emit` iterates a snapshot of the listener list taken when it starts:
//!
//! - a listener added while an emit is running is first called by the next emit
//! - a listener removed while an emit is running is not called again, even by
//!   that same emit
//! - a listener that emits again (on any bus) runs that nested emit to
//!   completion before the outer emit moves on
//! - a panicking listener unwinds out of `emit`; later listeners do not run

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use crate::channel::{Accessor, Channel, Unsubscribe};
use crate::reactive::{batch, on_cleanup};

/// A synchronous, single-threaded event emitter.
///
/// `EventBus<()>` is a bus without payload. Clones share listeners.
///
/// A bus created while a [`Scope`](crate::reactive::Scope) runs is cleared
/// when that scope is disposed; a listener registered while a scope runs is
/// removed when that scope is disposed.
///
/// # Example
///
/// ```ignore
/// let bus = EventBus::<String>::new();
/// let unsub = bus.listen(|msg| println!("got {msg}"));
///
/// bus.emit("hello".into()); // prints "got hello"
/// unsub.unsubscribe();
/// bus.emit("again".into()); // nothing
/// ```
pub struct EventBus<T = ()> {
    inner: Rc<BusInner<T>>,
}

struct BusInner<T> {
    listeners: RefCell<Vec<Rc<ListenerEntry<T>>>>,
}

struct ListenerEntry<T> {
    active: Cell<bool>,
    callback: Box<dyn Fn(&T)>,
}

impl<T> BusInner<T> {
    fn clear(&self) {
        let listeners = std::mem::take(&mut *self.listeners.borrow_mut());
        for entry in &listeners {
            entry.active.set(false);
        }
    }
}

impl<T: 'static> EventBus<T> {
    pub fn new() -> Self {
        let inner = Rc::new(BusInner {
            listeners: RefCell::new(Vec::new()),
        });

        let weak = Rc::downgrade(&inner);
        on_cleanup(move || {
            if let Some(inner) = weak.upgrade() {
                inner.clear();
            }
        });

        Self { inner }
    }

    /// Register `listener`, returning the handle that removes it.
    pub fn listen(&self, listener: impl Fn(&T) + 'static) -> Unsubscribe {
        let entry = Rc::new(ListenerEntry {
            active: Cell::new(true),
            callback: Box::new(listener),
        });
        self.inner.listeners.borrow_mut().push(Rc::clone(&entry));

        let bus: Weak<BusInner<T>> = Rc::downgrade(&self.inner);
        let unsubscribe = Unsubscribe::new(move || {
            entry.active.set(false);
            if let Some(bus) = bus.upgrade() {
                bus.listeners
                    .borrow_mut()
                    .retain(|existing| !Rc::ptr_eq(existing, &entry));
            }
        });

        let scoped = unsubscribe.clone();
        on_cleanup(move || scoped.unsubscribe());

        unsubscribe
    }

    /// Call every listener with `payload`, in registration order.
    pub fn emit(&self, payload: T) {
        let snapshot = self.inner.listeners.borrow().clone();
        for entry in snapshot {
            if entry.active.get() {
                (entry.callback)(&payload);
            }
        }
    }

    /// Remove every listener.
    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listener_count() == 0
    }
}

impl<T: 'static> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for EventBus<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.inner.listeners.borrow().len())
            .finish()
    }
}

impl<T: 'static> Channel for EventBus<T> {
    type Payload = T;
    type Value = ();

    fn listen(&self, listener: impl Fn(&T) + 'static) -> Unsubscribe {
        EventBus::listen(self, listener)
    }

    fn emit(&self, payload: T) {
        EventBus::emit(self, payload)
    }
}

// ============================================================================
// Batched emits
// ============================================================================

/// A channel whose emits run inside [`batch`].
///
/// Effects re-triggered by several listeners of one emit run once, after the
/// emit. Everything else goes straight to the wrapped channel, which is also
/// reachable through `Deref`; `emit` is inherent, so it batches whether or not
/// [`Channel`] is in scope.
#[derive(Clone, Debug)]
pub struct Batched<C> {
    channel: C,
}

/// Wrap `channel` so that every emit is batched.
pub fn batch_emits<C: Channel>(channel: C) -> Batched<C> {
    Batched { channel }
}

impl<C: Channel> Batched<C> {
    pub fn emit(&self, payload: C::Payload) {
        batch(|| self.channel.emit(payload))
    }
}

impl<C> Deref for Batched<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.channel
    }
}

impl<C: Channel> Channel for Batched<C> {
    type Payload = C::Payload;
    type Value = C::Value;

    fn listen(&self, listener: impl Fn(&C::Payload) + 'static) -> Unsubscribe {
        self.channel.listen(listener)
    }

    fn emit(&self, payload: C::Payload) {
        Batched::emit(self, payload)
    }

    fn accessor(&self) -> Option<Accessor<C::Value>> {
        self.channel.accessor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Effect, Scope, Signal};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl Fn(&T) + 'static) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        (log, move |value: &T| sink.borrow_mut().push(value.clone()))
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = EventBus::<u32>::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = Rc::clone(&order);
            bus.listen(move |n| order.borrow_mut().push((tag, *n)));
        }
        bus.emit(7);

        assert_eq!(
            *order.borrow(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn emit_without_listeners_is_fine() {
        let bus = EventBus::<()>::new();
        bus.emit(());
        assert!(bus.is_empty());
    }

    #[test]
    fn unsubscribed_listener_stops_receiving() {
        let bus = EventBus::<u32>::new();
        let (log, listener) = recorder::<u32>();
        let unsub = bus.listen(listener);

        bus.emit(1);
        unsub.unsubscribe();
        unsub.unsubscribe();
        bus.emit(2);

        assert_eq!(*log.borrow(), vec![1]);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn listener_removed_mid_emit_is_skipped() {
        let bus = EventBus::<u32>::new();
        let (log, listener) = recorder::<u32>();
        let victim: Rc<RefCell<Option<Unsubscribe>>> = Rc::new(RefCell::new(None));

        let victim_clone = Rc::clone(&victim);
        bus.listen(move |_| {
            if let Some(unsub) = victim_clone.borrow().as_ref() {
                unsub.unsubscribe();
            }
        });
        *victim.borrow_mut() = Some(bus.listen(listener));

        bus.emit(1);
        bus.emit(2);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn listener_added_mid_emit_waits_for_next_emit() {
        let bus = EventBus::<u32>::new();
        let late = Rc::new(RefCell::new(Vec::new()));
        let added = Rc::new(Cell::new(false));

        let bus_clone = bus.clone();
        let late_clone = Rc::clone(&late);
        bus.listen(move |_| {
            if !added.replace(true) {
                let late = Rc::clone(&late_clone);
                bus_clone.listen(move |n| late.borrow_mut().push(*n));
            }
        });

        bus.emit(1);
        bus.emit(2);
        assert_eq!(*late.borrow(), vec![2]);
    }

    #[test]
    fn nested_emit_completes_first() {
        let outer = EventBus::<&'static str>::new();
        let inner = EventBus::<&'static str>::new();
        let (log, record) = recorder::<&'static str>();
        let record = Rc::new(record);

        let inner_clone = inner.clone();
        let record_outer = Rc::clone(&record);
        outer.listen(move |v| {
            inner_clone.emit("inner");
            record_outer(v);
        });
        let record_inner = Rc::clone(&record);
        inner.listen(move |v| record_inner(v));

        outer.emit("outer");
        assert_eq!(*log.borrow(), vec!["inner", "outer"]);
    }

    #[test]
    #[should_panic(expected = "listener failed")]
    fn panicking_listener_propagates() {
        let bus = EventBus::<()>::new();
        bus.listen(|_| panic!("listener failed"));
        bus.emit(());
    }

    #[test]
    fn panicking_listener_stops_later_listeners() {
        let bus = EventBus::<()>::new();
        let reached = Rc::new(Cell::new(false));
        bus.listen(|_| panic!("boom"));
        let reached_clone = Rc::clone(&reached);
        bus.listen(move |_| reached_clone.set(true));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| bus.emit(())));
        assert!(result.is_err());
        assert!(!reached.get());
    }

    #[test]
    fn clear_removes_everything() {
        let bus = EventBus::<u32>::new();
        let (log, listener) = recorder::<u32>();
        let unsub = bus.listen(listener);

        bus.clear();
        bus.emit(1);
        unsub.unsubscribe();

        assert!(log.borrow().is_empty());
    }

    #[test]
    fn scope_removes_listeners_registered_inside() {
        let bus = EventBus::<u32>::new();
        let (log, listener) = recorder::<u32>();
        let scope = Scope::new();

        scope.run(|| bus.listen(listener));
        bus.emit(1);
        scope.dispose();
        bus.emit(2);

        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn scope_clears_bus_created_inside() {
        let scope = Scope::new();
        let bus = scope.run(EventBus::<u32>::new);
        bus.listen(|_| {});
        assert_eq!(bus.listener_count(), 1);

        scope.dispose();
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn effect_listeners_survive_foreign_scope_disposal() {
        let bus = EventBus::<u32>::new();
        let trigger = Signal::new(0);
        let hits = Rc::new(Cell::new(0));

        {
            let (bus, trigger, hits) = (bus.clone(), trigger.clone(), Rc::clone(&hits));
            Effect::new(move || {
                if trigger.get() == 1 {
                    let hits = Rc::clone(&hits);
                    bus.listen(move |_| hits.set(hits.get() + 1));
                }
            });
        }

        let other = Scope::new();
        other.run(|| trigger.set(1));
        other.dispose();

        bus.emit(0);
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.listener_count(), 1);
    }

    #[test]
    fn batched_emit_runs_effects_once() {
        let bus = batch_emits(EventBus::<u32>::new());
        let first = Signal::new(0);
        let second = Signal::new(0);
        let runs = Rc::new(Cell::new(0));

        {
            let (first, second, runs) = (first.clone(), second.clone(), Rc::clone(&runs));
            Effect::new(move || {
                let _ = (first.get(), second.get());
                runs.set(runs.get() + 1);
            });
        }
        let first_clone = first.clone();
        bus.listen(move |n| first_clone.set(*n));
        let second_clone = second.clone();
        bus.listen(move |n| second_clone.set(*n * 10));

        bus.emit(2);
        assert_eq!(runs.get(), 2);
        assert_eq!((first.get(), second.get()), (2, 20));

        let unbatched: &EventBus<u32> = &bus;
        unbatched.emit(3);
        assert_eq!(runs.get(), 4);
    }

    mod without_channel_trait {
        use crate::bus::{EventBus, batch_emits};
        use crate::reactive::{Effect, Signal};
        use std::cell::Cell;
        use std::rc::Rc;

        #[test]
        fn batched_emit_still_batches() {
            let bus = batch_emits(EventBus::<i32>::new());
            let (x, y) = (Signal::new(0), Signal::new(0));
            let runs = Rc::new(Cell::new(0));
            {
                let (x, y, runs) = (x.clone(), y.clone(), Rc::clone(&runs));
                Effect::new(move || {
                    let _ = (x.get(), y.get());
                    runs.set(runs.get() + 1);
                });
            }
            let (xs, ys) = (x.clone(), y.clone());
            bus.listen(move |n| xs.set(*n));
            bus.listen(move |n| ys.set(-*n));

            bus.emit(5);
            assert_eq!((x.get(), y.get()), (5, -5));
            assert_eq!(runs.get(), 2);
        }
    }
}

//! The event hub: many named channels behind one object.
//!
//! An [`EventHub`] is built from a fixed [`ChannelSet`]. It gives
//!
//! - typed access to each channel (`hub.toasts.emit(..)` through `Deref`, or
//!   [`EventHub::channel`] by name),
//! - by-name dispatch with [`on`](EventHub::on) and [`emit`](EventHub::emit),
//! - one stream of every emission on every channel through
//!   [`listen`](EventHub::listen), each tagged with its channel name,
//! - a [`Store`] reading the current value of each stateful channel.
//!
//! # Example
//!
//! ```ignore
//! #[derive(ChannelSet)]
//! struct Channels {
//!     saved: EventBus<u32>,
//!     toasts: EventStack<String>,
//! }
//!
//! let hub = EventHub::new(Channels {
//!     saved: EventBus::new(),
//!     toasts: EventStack::new(),
//! });
//!
//! hub.listen(|event| println!("{} fired", event.name));
//! hub.saved.emit(7);
//! hub.emit("toasts", String::from("saved"))?;
//!
//! assert_eq!(hub.store().get::<Vec<String>>("toasts").unwrap().len(), 1);
//! ```

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

use tracing::{debug, trace, warn};

use crate::bus::EventBus;
use crate::channel::{AnyAccessor, AnyChannel, Channel, ChannelSet, Unsubscribe};
use crate::error::{HubError, Result};
use crate::reactive::{Scope, on_cleanup};
use crate::stack::{EventStack, StackOptions};
use crate::suggestions::closest_name;

// ============================================================================
// HubEvent
// ============================================================================

/// One emission as seen by [`EventHub::listen`].
#[derive(Clone)]
pub struct HubEvent {
    /// Name of the channel that emitted.
    pub name: &'static str,
    details: Rc<dyn Any>,
}

impl HubEvent {
    /// The emitted payload, if it is a `T`.
    pub fn details<T: 'static>(&self) -> Option<&T> {
        self.details.downcast_ref()
    }

    /// Whether this event came from `name` and carries a `T`.
    pub fn is<T: 'static>(&self, name: &str) -> bool {
        self.name == name && self.details.is::<T>()
    }
}

impl fmt::Debug for HubEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HubEvent")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Store
// ============================================================================

/// Read-through view of the hub's stateful channels.
///
/// Every [`get`](Store::get) calls the channel's accessor again; nothing is
/// cached. Channels without an accessor have no entry at all.
#[derive(Default, Clone)]
pub struct Store {
    entries: Vec<(&'static str, AnyAccessor)>,
}

impl Store {
    /// Current value of the channel `name`.
    ///
    /// `None` if there is no such stateful channel or its value is not a `V`.
    pub fn get<V: 'static>(&self, name: &str) -> Option<V> {
        let accessor = self.accessor(name)?;
        accessor().downcast::<V>().ok().map(|value| *value)
    }

    /// Current value of the channel `name`, type-erased.
    pub fn get_any(&self, name: &str) -> Option<Box<dyn Any>> {
        self.accessor(name).map(|accessor| accessor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.accessor(name).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn accessor(&self, name: &str) -> Option<&AnyAccessor> {
        self.entries
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, accessor)| accessor)
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.keys()).finish()
    }
}

// ============================================================================
// ChannelFactory
// ============================================================================

/// Handed to [`EventHub::from_factory`] to create channels.
///
/// The factory runs inside the hub's own scope, so the channels made here
/// lose their listeners when the hub is disposed.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChannelFactory {
    _private: (),
}

impl ChannelFactory {
    pub fn bus<T: 'static>(&self) -> EventBus<T> {
        EventBus::new()
    }

    pub fn stack<T: Clone + 'static>(&self) -> EventStack<T> {
        EventStack::new()
    }

    pub fn stack_with<T: Clone + 'static>(&self, options: StackOptions) -> EventStack<T> {
        EventStack::with_options(options)
    }
}

// ============================================================================
// EventHub
// ============================================================================

/// A fixed set of named channels with unified dispatch and listening.
///
/// The hub subscribes a forwarding listener on every channel as soon as it is
/// built. Those subscriptions are released by [`dispose`](EventHub::dispose),
/// when the hub is dropped, or when the [`Scope`] that was running while the
/// hub was built is disposed, whichever comes first.
pub struct EventHub<C: ChannelSet> {
    channels: C,
    entries: Vec<(&'static str, Box<dyn AnyChannel>)>,
    global: EventBus<HubEvent>,
    store: Store,
    teardown: Rc<Teardown>,
}

struct Teardown {
    forwarders: RefCell<Vec<Unsubscribe>>,
    /// Owns channels created by a factory.
    scope: Scope,
    disposed: Cell<bool>,
}

impl Teardown {
    fn run(&self) {
        if self.disposed.replace(true) {
            return;
        }
        let forwarders = std::mem::take(&mut *self.forwarders.borrow_mut());
        debug!(forwarders = forwarders.len(), "disposing event hub");
        for forwarder in forwarders {
            forwarder.unsubscribe();
        }
        self.scope.dispose();
    }
}

impl<C: ChannelSet> EventHub<C> {
    /// Build a hub over existing channels.
    pub fn new(channels: C) -> Self {
        Self::assemble(channels, Scope::new())
    }

    /// Build a hub whose channels are created by `factory`.
    ///
    /// ```ignore
    /// let hub = EventHub::from_factory(|cx| Channels {
    ///     saved: cx.bus(),
    ///     toasts: cx.stack(),
    /// });
    /// ```
    pub fn from_factory(factory: impl FnOnce(&ChannelFactory) -> C) -> Self {
        let scope = Scope::new();
        let channels = scope.run(|| factory(&ChannelFactory::default()));
        Self::assemble(channels, scope)
    }

    fn assemble(channels: C, scope: Scope) -> Self {
        let global = EventBus::<HubEvent>::new();
        let entries = channels.channels();
        let mut store = Store::default();
        let mut forwarders = Vec::with_capacity(entries.len());

        for (name, channel) in &entries {
            let name = *name;
            if let Some(accessor) = channel.accessor_any() {
                store.entries.push((name, accessor));
            }

            let global = global.clone();
            forwarders.push(channel.forward_any(Box::new(move |details: Rc<dyn Any>| {
                trace!(channel = name, "forwarding emission");
                global.emit(HubEvent { name, details });
            })));
        }

        debug!(
            channels = entries.len(),
            stateful = store.len(),
            "created event hub"
        );

        let teardown = Rc::new(Teardown {
            forwarders: RefCell::new(forwarders),
            scope,
            disposed: Cell::new(false),
        });

        let weak: Weak<Teardown> = Rc::downgrade(&teardown);
        on_cleanup(move || {
            if let Some(teardown) = weak.upgrade() {
                teardown.run();
            }
        });

        Self {
            channels,
            entries,
            global,
            store,
            teardown,
        }
    }

    /// The channel set the hub was built from.
    pub fn channels(&self) -> &C {
        &self.channels
    }

    /// Typed handle to the channel `name`.
    pub fn channel<Ch: Channel>(&self, name: &str) -> Result<Ch> {
        self.ensure_live()?;
        let (name, channel) = self.lookup(name)?;
        channel
            .as_any()
            .downcast_ref::<Ch>()
            .cloned()
            .ok_or(HubError::NotAChannelOfType {
                name,
                expected: std::any::type_name::<Ch>(),
            })
    }

    /// Listen to the channel `name`.
    ///
    /// Fails if there is no such channel or it does not carry `T` payloads.
    pub fn on<T: 'static>(
        &self,
        name: &str,
        listener: impl Fn(&T) + 'static,
    ) -> Result<Unsubscribe> {
        self.ensure_live()?;
        let (name, channel) = self.lookup(name)?;
        check_payload::<T>(name, channel)?;

        trace!(channel = name, "listener registered");
        Ok(channel.listen_any(Box::new(move |payload: &dyn Any| {
            if let Some(payload) = payload.downcast_ref::<T>() {
                listener(payload);
            }
        })))
    }

    /// Emit `payload` on the channel `name`.
    ///
    /// Fails if there is no such channel or it does not carry `T` payloads.
    pub fn emit<T: 'static>(&self, name: &str, payload: T) -> Result<()> {
        self.ensure_live()?;
        let (name, channel) = self.lookup(name)?;
        check_payload::<T>(name, channel)?;

        channel
            .emit_any(Box::new(payload))
            .map_err(|_| payload_mismatch::<T>(name, channel))
    }

    /// Listen to every channel at once.
    pub fn listen(&self, listener: impl Fn(&HubEvent) + 'static) -> Unsubscribe {
        self.global.listen(listener)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Channel names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|existing| existing == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Release every forwarding subscription, exactly once.
    ///
    /// Channels stay usable, but their emissions no longer reach
    /// [`listen`](EventHub::listen). Channels made by a factory also lose
    /// their listeners. By-name operations fail with [`HubError::Disposed`]
    /// afterwards.
    pub fn dispose(&self) {
        self.teardown.run();
    }

    pub fn is_disposed(&self) -> bool {
        self.teardown.disposed.get()
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_disposed() {
            warn!("by-name operation on a disposed event hub");
            return Err(HubError::Disposed);
        }
        Ok(())
    }

    fn lookup(&self, name: &str) -> Result<(&'static str, &dyn AnyChannel)> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(existing, channel)| (*existing, channel.as_ref()))
            .ok_or_else(|| {
                let suggestion = closest_name(name, self.names());
                warn!(channel = name, ?suggestion, "unknown channel");
                HubError::UnknownChannel {
                    name: name.to_owned(),
                    suggestion,
                }
            })
    }
}

fn check_payload<T: 'static>(name: &'static str, channel: &dyn AnyChannel) -> Result<()> {
    if channel.payload_type() == TypeId::of::<T>() {
        Ok(())
    } else {
        let err = payload_mismatch::<T>(name, channel);
        warn!(channel = name, %err, "payload type mismatch");
        Err(err)
    }
}

fn payload_mismatch<T>(name: &'static str, channel: &dyn AnyChannel) -> HubError {
    HubError::PayloadMismatch {
        name,
        expected: channel.payload_type_name(),
        found: std::any::type_name::<T>(),
    }
}

impl<C: ChannelSet> Deref for EventHub<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.channels
    }
}

impl<C: ChannelSet> Drop for EventHub<C> {
    fn drop(&mut self) {
        self.teardown.run();
    }
}

impl<C: ChannelSet> fmt::Debug for EventHub<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("channels", &self.names().collect::<Vec<_>>())
            .field("store", &self.store)
            .field("listeners", &self.global.listener_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

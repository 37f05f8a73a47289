//! The channel contract shared by every emitter, and its type-erased form.
//!
//! A [`Channel`] is anything that can be listened to and emitted on, and that
//! may expose its current value through an [`Accessor`]. Channels are cheap
//! handles: clones share one listener registry.
//!
//! [`AnyChannel`] erases the payload type so channels of different types can
//! live side by side in a [`ChannelSet`], which is what an
//! [`EventHub`](crate::hub::EventHub) is built from.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Reads a stateful channel's current value.
pub type Accessor<T> = Rc<dyn Fn() -> T>;

/// Type-erased accessor, as stored by the hub's [`Store`](crate::hub::Store).
pub type AnyAccessor = Rc<dyn Fn() -> Box<dyn Any>>;

/// Something that can be listened to and emitted on.
pub trait Channel: Clone + 'static {
    /// What [`emit`](Channel::emit) takes and listeners receive. `()` for
    /// channels without a payload.
    type Payload: 'static;

    /// What the accessor returns. `()` for stateless channels.
    type Value: 'static;

    /// Register `listener`. Listeners run in registration order.
    fn listen(&self, listener: impl Fn(&Self::Payload) + 'static) -> Unsubscribe;

    /// Synchronously call every registered listener with `payload`.
    fn emit(&self, payload: Self::Payload);

    /// The channel's value accessor, if it keeps state.
    fn accessor(&self) -> Option<Accessor<Self::Value>> {
        None
    }
}

// ============================================================================
// Unsubscribe
// ============================================================================

/// Handle returned by every listen operation.
///
/// Calling [`unsubscribe`](Unsubscribe::unsubscribe) removes the listener; later
/// calls do nothing. Dropping the handle leaves the listener registered. Clones
/// refer to the same registration.
#[derive(Clone)]
pub struct Unsubscribe {
    release: Rc<RefCell<Option<Box<dyn FnOnce()>>>>,
}

impl Unsubscribe {
    pub fn new(release: impl FnOnce() + 'static) -> Self {
        Self {
            release: Rc::new(RefCell::new(Some(Box::new(release)))),
        }
    }

    /// A handle with nothing to release.
    pub fn noop() -> Self {
        Self {
            release: Rc::new(RefCell::new(None)),
        }
    }

    pub fn unsubscribe(&self) {
        let release = self.release.borrow_mut().take();
        if let Some(release) = release {
            release();
        }
    }

    /// Whether [`unsubscribe`](Unsubscribe::unsubscribe) has not been called yet.
    pub fn is_active(&self) -> bool {
        self.release.borrow().is_some()
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("active", &self.is_active())
            .finish()
    }
}

// ============================================================================
// Type erasure
// ============================================================================

/// Object-safe view of a [`Channel`] whose payload is `Clone`.
///
/// Implemented for every such channel; there is no reason to implement it by
/// hand.
pub trait AnyChannel {
    /// Listen with a callback receiving the payload as `&dyn Any`.
    fn listen_any(&self, listener: Box<dyn Fn(&dyn Any)>) -> Unsubscribe;

    /// Listen with a callback receiving a shared copy of each payload.
    fn forward_any(&self, sink: Box<dyn Fn(Rc<dyn Any>)>) -> Unsubscribe;

    /// Emit a boxed payload. Hands the box back if it holds the wrong type.
    fn emit_any(&self, payload: Box<dyn Any>) -> Result<(), Box<dyn Any>>;

    fn accessor_any(&self) -> Option<AnyAccessor>;

    fn payload_type(&self) -> TypeId;

    fn payload_type_name(&self) -> &'static str;

    /// The concrete channel handle, for downcasting back to it.
    fn as_any(&self) -> &dyn Any;

    fn clone_box(&self) -> Box<dyn AnyChannel>;
}

impl<C> AnyChannel for C
where
    C: Channel,
    C::Payload: Clone,
{
    fn listen_any(&self, listener: Box<dyn Fn(&dyn Any)>) -> Unsubscribe {
        self.listen(move |payload: &C::Payload| listener(payload))
    }

    fn forward_any(&self, sink: Box<dyn Fn(Rc<dyn Any>)>) -> Unsubscribe {
        self.listen(move |payload: &C::Payload| sink(Rc::new(payload.clone())))
    }

    fn emit_any(&self, payload: Box<dyn Any>) -> Result<(), Box<dyn Any>> {
        let payload = payload.downcast::<C::Payload>()?;
        self.emit(*payload);
        Ok(())
    }

    fn accessor_any(&self) -> Option<AnyAccessor> {
        let accessor = self.accessor()?;
        Some(Rc::new(move || Box::new(accessor()) as Box<dyn Any>))
    }

    fn payload_type(&self) -> TypeId {
        TypeId::of::<C::Payload>()
    }

    fn payload_type_name(&self) -> &'static str {
        std::any::type_name::<C::Payload>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn clone_box(&self) -> Box<dyn AnyChannel> {
        Box::new(self.clone())
    }
}

/// Erase a channel handle. Used by `#[derive(ChannelSet)]`.
pub fn erase<C>(channel: &C) -> Box<dyn AnyChannel>
where
    C: Channel,
    C::Payload: Clone,
{
    Box::new(channel.clone())
}

// ============================================================================
// Channel sets
// ============================================================================

/// A fixed collection of named channels.
///
/// Usually derived on a struct whose named fields are channels:
///
/// ```ignore
/// #[derive(ChannelSet)]
/// struct Channels {
///     saved: EventBus<DocumentId>,
///     #[channel(rename = "toast")]
///     toasts: EventStack<Toast>,
/// }
/// ```
///
/// [`ChannelMap`] is the runtime-keyed alternative.
pub trait ChannelSet: 'static {
    /// Erased handles to every channel, in declaration order.
    fn channels(&self) -> Vec<(&'static str, Box<dyn AnyChannel>)>;
}

/// Channels keyed by name at run time.
///
/// Inserting an existing name replaces that channel in place, keeping its
/// position.
#[derive(Default)]
pub struct ChannelMap {
    entries: Vec<(&'static str, Box<dyn AnyChannel>)>,
}

impl ChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](ChannelMap::insert).
    pub fn with<C>(mut self, name: &'static str, channel: C) -> Self
    where
        C: Channel,
        C::Payload: Clone,
    {
        self.insert(name, channel);
        self
    }

    pub fn insert<C>(&mut self, name: &'static str, channel: C)
    where
        C: Channel,
        C::Payload: Clone,
    {
        let channel: Box<dyn AnyChannel> = Box::new(channel);
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = channel,
            None => self.entries.push((name, channel)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(existing, _)| *existing == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ChannelSet for ChannelMap {
    fn channels(&self) -> Vec<(&'static str, Box<dyn AnyChannel>)> {
        self.entries
            .iter()
            .map(|(name, channel)| (*name, channel.clone_box()))
            .collect()
    }
}

impl fmt::Debug for ChannelMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|(name, channel)| (name, channel.payload_type_name())),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::EventBus;
    use crate::stack::EventStack;
    use std::cell::{Cell, RefCell};

    #[test]
    fn unsubscribe_is_idempotent() {
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        let handle = Unsubscribe::new(move || calls_clone.set(calls_clone.get() + 1));
        let twin = handle.clone();

        assert!(handle.is_active());
        handle.unsubscribe();
        handle.unsubscribe();
        twin.unsubscribe();

        assert_eq!(calls.get(), 1);
        assert!(!twin.is_active());
        assert!(!Unsubscribe::noop().is_active());
    }

    #[test]
    fn emit_any_rejects_wrong_payload() {
        let bus = EventBus::<u8>::new();
        let erased = erase(&bus);

        assert!(erased.emit_any(Box::new(7u8)).is_ok());
        let rejected = erased.emit_any(Box::new("seven")).unwrap_err();
        assert_eq!(rejected.downcast_ref::<&str>(), Some(&"seven"));
        assert_eq!(erased.payload_type(), TypeId::of::<u8>());
    }

    #[test]
    fn forward_any_shares_a_copy_of_each_payload() {
        let bus = EventBus::<String>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_clone = Rc::clone(&seen);
        erase(&bus).forward_any(Box::new(move |payload: Rc<dyn Any>| {
            let text = payload.downcast_ref::<String>().cloned();
            seen_clone.borrow_mut().push(text);
        }));

        bus.emit("hello".to_owned());
        assert_eq!(*seen.borrow(), vec![Some("hello".to_owned())]);
    }

    #[test]
    fn accessor_any_only_for_stateful_channels() {
        let bus = EventBus::<u8>::new();
        let stack = EventStack::<u8>::new();
        stack.emit(3);

        assert!(erase(&bus).accessor_any().is_none());
        let accessor = erase(&stack).accessor_any().expect("stack has a value");
        assert_eq!(accessor().downcast_ref::<Vec<u8>>(), Some(&vec![3]));
    }

    #[test]
    fn channel_map_replaces_in_place() {
        let map = ChannelMap::new()
            .with("a", EventBus::<u8>::new())
            .with("b", EventBus::<()>::new())
            .with("a", EventStack::<u8>::new());

        assert_eq!(map.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(map.len(), 2);
        assert!(map.contains("b"));

        let channels = map.channels();
        assert!(channels[0].1.accessor_any().is_some());
    }
}

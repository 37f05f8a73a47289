//! A channel that remembers what was emitted.

use std::fmt;
use std::rc::Rc;

use crate::bus::EventBus;
use crate::channel::{Accessor, Channel, Unsubscribe};
use crate::reactive::Signal;

/// Options for [`EventStack::with_options`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StackOptions {
    /// Maximum number of entries kept. The oldest entries are dropped first.
    /// `None` keeps everything.
    pub length: Option<usize>,
}

/// An event bus that also keeps every emitted value on a reactive stack.
///
/// [`emit`](EventStack::emit) pushes the value (oldest first) and then calls
/// the listeners with it. [`value`](EventStack::value) reads the stack
/// through a [`Signal`], so effects reading it re-run on every change.
///
/// ```ignore
/// let toasts = EventStack::<Toast>::with_options(StackOptions { length: Some(3) });
/// toasts.listen(|toast| show(toast));
/// toasts.emit(Toast::info("saved"));
///
/// assert_eq!(toasts.len(), 1);
/// ```
pub struct EventStack<T> {
    stack: Signal<Vec<T>>,
    bus: EventBus<T>,
    options: StackOptions,
}

impl<T: Clone + 'static> EventStack<T> {
    pub fn new() -> Self {
        Self::with_options(StackOptions::default())
    }

    pub fn with_options(options: StackOptions) -> Self {
        Self {
            stack: Signal::new(Vec::new()),
            bus: EventBus::new(),
            options,
        }
    }

    /// Push `value` onto the stack, then notify listeners.
    pub fn emit(&self, value: T) {
        let limit = self.options.length;
        self.stack.update(|stack| {
            stack.push(value.clone());
            if let Some(limit) = limit
                && stack.len() > limit
            {
                let excess = stack.len() - limit;
                stack.drain(..excess);
            }
        });
        self.bus.emit(value);
    }

    pub fn listen(&self, listener: impl Fn(&T) + 'static) -> Unsubscribe {
        self.bus.listen(listener)
    }

    /// Remove every listener. The stack itself is left alone.
    pub fn clear(&self) {
        self.bus.clear();
    }

    /// The current stack, oldest first.
    pub fn value(&self) -> Vec<T> {
        self.stack.get()
    }

    /// Replace the whole stack without notifying listeners.
    pub fn set_value(&self, stack: Vec<T>) {
        self.stack.set(stack);
    }

    pub fn len(&self) -> usize {
        self.stack.with(Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn listener_count(&self) -> usize {
        self.bus.listener_count()
    }

    pub fn options(&self) -> StackOptions {
        self.options
    }
}

impl<T: Clone + PartialEq + 'static> EventStack<T> {
    /// Remove every entry equal to `value`. Returns whether anything was removed.
    pub fn remove(&self, value: &T) -> bool {
        let present = self.stack.with_untracked(|stack| stack.contains(value));
        if present {
            self.stack.update(|stack| stack.retain(|entry| entry != value));
        }
        present
    }
}

impl<T: Clone + 'static> Default for EventStack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Clone for EventStack<T> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
            bus: self.bus.clone(),
            options: self.options,
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for EventStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStack")
            .field("stack", &self.stack)
            .field("listeners", &self.bus.listener_count())
            .field("options", &self.options)
            .finish()
    }
}

impl<T: Clone + 'static> Channel for EventStack<T> {
    type Payload = T;
    type Value = Vec<T>;

    fn listen(&self, listener: impl Fn(&T) + 'static) -> Unsubscribe {
        EventStack::listen(self, listener)
    }

    fn emit(&self, value: T) {
        EventStack::emit(self, value)
    }

    fn accessor(&self) -> Option<Accessor<Vec<T>>> {
        let stack = self.stack.clone();
        Some(Rc::new(move || stack.get()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Effect;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct Toast {
        text: &'static str,
    }

    fn toast(text: &'static str) -> Toast {
        Toast { text }
    }

    #[test]
    fn emit_pushes_then_notifies() {
        let stack = EventStack::<Toast>::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let stack_clone = stack.clone();
        let seen_clone = Rc::clone(&seen);
        stack.listen(move |t| seen_clone.borrow_mut().push((t.text, stack_clone.len())));

        stack.emit(toast("a"));
        stack.emit(toast("b"));

        assert_eq!(*seen.borrow(), vec![("a", 1), ("b", 2)]);
        assert_eq!(stack.value(), vec![toast("a"), toast("b")]);
    }

    #[test]
    fn length_limit_drops_oldest() {
        let stack = EventStack::with_options(StackOptions { length: Some(2) });
        for n in 1..=4 {
            stack.emit(n);
        }
        assert_eq!(stack.value(), vec![3, 4]);
    }

    #[test]
    fn remove_drops_matching_entries() {
        let stack = EventStack::<u8>::new();
        for n in [1, 2, 1, 3] {
            stack.emit(n);
        }

        assert!(stack.remove(&1));
        assert!(!stack.remove(&9));
        assert_eq!(stack.value(), vec![2, 3]);
    }

    #[test]
    fn set_value_replaces_silently() {
        let stack = EventStack::<u8>::new();
        let calls = Rc::new(Cell::new(0));
        let calls_clone = Rc::clone(&calls);
        stack.listen(move |_| calls_clone.set(calls_clone.get() + 1));

        stack.set_value(vec![5, 6]);
        assert_eq!(stack.value(), vec![5, 6]);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn clear_keeps_stack() {
        let stack = EventStack::<u8>::new();
        stack.listen(|_| {});
        stack.emit(1);

        stack.clear();
        assert_eq!(stack.listener_count(), 0);
        assert_eq!(stack.value(), vec![1]);
    }

    #[test]
    fn effects_track_the_stack() {
        let stack = EventStack::<u8>::new();
        let lengths = Rc::new(RefCell::new(Vec::new()));

        let stack_clone = stack.clone();
        let lengths_clone = Rc::clone(&lengths);
        Effect::new(move || lengths_clone.borrow_mut().push(stack_clone.len()));

        stack.emit(1);
        stack.remove(&1);

        assert_eq!(*lengths.borrow(), vec![0, 1, 0]);
    }

    #[test]
    fn accessor_reads_live_value() {
        let stack = EventStack::<u8>::new();
        let accessor = stack.accessor().expect("stacks are stateful");

        assert!(accessor().is_empty());
        stack.emit(4);
        assert_eq!(accessor(), vec![4]);
    }
}

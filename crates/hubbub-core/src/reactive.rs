//! Reactive primitives the emitters are built against: signals, effects and scopes.
//!
//! This is deliberately small. It provides what the channels need from a
//! reactive runtime and nothing more:
//!
//! - **Signal**: a value container that re-runs dependent effects when written
//! - **Effect**: a side-effect that re-runs when the signals it read change
//! - **Scope**: an ownership unit; everything registered with [`on_cleanup`]
//!   while a scope is running is released when the scope is disposed
//!
//! # Example
//!
//! ```ignore
//! use hubbub_core::reactive::*;
//!
//! let scope = Scope::new();
//! let count = Signal::new(0);
//!
//! scope.run(|| {
//!     let count = count.clone();
//!     Effect::new(move || println!("count = {}", count.get()));
//! });
//!
//! count.set(1); // prints "count = 1"
//! scope.dispose();
//! count.set(2); // effect is gone, nothing printed
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

// ============================================================================
// Runtime Context
// ============================================================================

thread_local! {
    static RUNTIME: RefCell<Runtime> = RefCell::new(Runtime::new());
}

struct Runtime {
    /// Observers currently executing, innermost last.
    observers: Vec<ObserverId>,

    /// Observers waiting to re-run.
    pending: Vec<ObserverId>,

    /// Nesting depth of [`batch`] calls. Effects flush when it returns to zero.
    batch_depth: usize,

    next_id: usize,
}

impl Runtime {
    fn new() -> Self {
        Self {
            observers: Vec::new(),
            pending: Vec::new(),
            batch_depth: 0,
            next_id: 0,
        }
    }

    fn next_id(&mut self) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        id
    }

    fn schedule(&mut self, observers: impl IntoIterator<Item = ObserverId>) {
        for observer in observers {
            if !self.pending.contains(&observer) {
                self.pending.push(observer);
            }
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
struct ObserverId(usize);

// ============================================================================
// Signal
// ============================================================================

/// A reactive value.
///
/// Reading a signal with [`get`](Signal::get) or [`with`](Signal::with) inside an
/// effect subscribes that effect; writing with [`set`](Signal::set) or
/// [`update`](Signal::update) re-runs every subscriber.
///
/// Clones share the same value.
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

struct SignalInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<HashSet<ObserverId>>,
}

impl<T> Signal<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                subscribers: RefCell::new(HashSet::new()),
            }),
        }
    }

    fn track(&self) {
        let current = RUNTIME.with(|rt| rt.borrow().observers.last().copied());
        if let Some(observer) = current {
            self.inner.subscribers.borrow_mut().insert(observer);
        }
    }

    fn notify(&self) {
        let subscribers: Vec<_> = self.inner.subscribers.borrow().iter().copied().collect();
        let flush = RUNTIME.with(|rt| {
            let mut rt = rt.borrow_mut();
            rt.schedule(subscribers);
            rt.batch_depth == 0
        });
        if flush {
            flush_effects();
        }
    }

    /// Borrow the current value, subscribing the running effect (if any).
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Borrow the current value without subscribing anything.
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value;
        self.notify();
    }

    /// Mutate the value in place and notify subscribers.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let result = f(&mut self.inner.value.borrow_mut());
        self.notify();
        result
    }
}

impl<T: Clone> Signal<T> {
    /// Clone out the current value, subscribing the running effect (if any).
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Signal<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

// ============================================================================
// Effect
// ============================================================================

thread_local! {
    static EFFECTS: RefCell<Vec<Option<Rc<EffectInner>>>> = const { RefCell::new(Vec::new()) };
}

/// A side-effect that re-runs whenever a signal it read changes.
///
/// An effect created while a [`Scope`] is running is disposed together with
/// that scope. Every run executes with that scope current (or with no scope,
/// for effects created outside one), whichever scope triggered the re-run.
#[derive(Clone, Copy, Debug)]
pub struct Effect {
    id: ObserverId,
}

struct EffectInner {
    f: RefCell<Box<dyn FnMut()>>,
    disposed: Cell<bool>,
    /// Scope current at creation; `None` for effects created outside any scope.
    owner: Option<Weak<ScopeInner>>,
}

impl Effect {
    /// Create an effect and run it once immediately.
    pub fn new<F: FnMut() + 'static>(f: F) -> Self {
        let id = RUNTIME.with(|rt| rt.borrow_mut().next_id());
        let owner = current_scope().map(|scope| Rc::downgrade(&scope));
        let inner = Rc::new(EffectInner {
            f: RefCell::new(Box::new(f)),
            disposed: Cell::new(false),
            owner,
        });

        EFFECTS.with(|effects| {
            let mut effects = effects.borrow_mut();
            if id.0 >= effects.len() {
                effects.resize(id.0 + 1, None);
            }
            effects[id.0] = Some(inner);
        });

        let effect = Effect { id };
        on_cleanup(move || effect.dispose());
        run_effect(id);
        effect
    }

    /// Stop the effect permanently and release its closure.
    pub fn dispose(&self) {
        let inner = EFFECTS.with(|effects| {
            effects
                .borrow_mut()
                .get_mut(self.id.0)
                .and_then(Option::take)
        });
        if let Some(inner) = inner {
            inner.disposed.set(true);
        }
    }

    pub fn is_disposed(&self) -> bool {
        EFFECTS.with(|effects| {
            effects
                .borrow()
                .get(self.id.0)
                .and_then(Option::as_ref)
                .is_none_or(|inner| inner.disposed.get())
        })
    }
}

fn run_effect(id: ObserverId) {
    let Some(inner) = EFFECTS.with(|effects| effects.borrow().get(id.0).and_then(Clone::clone))
    else {
        return;
    };
    if inner.disposed.get() {
        return;
    }
    // An effect that writes a signal it reads lands here re-entrantly; the
    // outer run already observes the new value.
    let Ok(mut f) = inner.f.try_borrow_mut() else {
        return;
    };

    let owner = inner.owner.as_ref().and_then(Weak::upgrade);
    SCOPES.with(|scopes| scopes.borrow_mut().push(owner));
    let _scope = ScopeGuard;

    RUNTIME.with(|rt| rt.borrow_mut().observers.push(id));
    let _observer = ObserverGuard;
    f();
}

/// Pops the current observer even if the effect body panics.
struct ObserverGuard;

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        RUNTIME.with(|rt| {
            rt.borrow_mut().observers.pop();
        });
    }
}

fn flush_effects() {
    while let Some(id) = RUNTIME.with(|rt| {
        let mut rt = rt.borrow_mut();
        if rt.pending.is_empty() {
            None
        } else {
            Some(rt.pending.remove(0))
        }
    }) {
        run_effect(id);
    }
}

// ============================================================================
// Batching
// ============================================================================

/// Run `f` with effect re-runs postponed until it returns.
///
/// Batches nest; effects flush once when the outermost batch completes.
///
/// ```ignore
/// batch(|| {
///     first.set(1);
///     second.set(2);
/// }); // dependent effects run once here
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    RUNTIME.with(|rt| rt.borrow_mut().batch_depth += 1);
    let result = {
        let _guard = BatchGuard;
        f()
    };
    let flush = RUNTIME.with(|rt| rt.borrow().batch_depth == 0);
    if flush {
        flush_effects();
    }
    result
}

struct BatchGuard;

impl Drop for BatchGuard {
    fn drop(&mut self) {
        RUNTIME.with(|rt| rt.borrow_mut().batch_depth -= 1);
    }
}

/// Run `f` without subscribing the current effect to anything it reads.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let observer = RUNTIME.with(|rt| rt.borrow_mut().observers.pop());
    let result = f();
    if let Some(observer) = observer {
        RUNTIME.with(|rt| rt.borrow_mut().observers.push(observer));
    }
    result
}

// ============================================================================
// Scope
// ============================================================================

type Cleanup = Box<dyn FnOnce()>;

thread_local! {
    /// Current scopes, innermost last. `None` entries hide the scopes below
    /// them while an effect without an owner runs.
    static SCOPES: RefCell<Vec<Option<Rc<ScopeInner>>>> = const { RefCell::new(Vec::new()) };
}

/// An ownership unit for reactive resources.
///
/// While [`run`](Scope::run) executes, the scope is the *current* scope:
/// effects, channel listeners and anything passed to [`on_cleanup`] register
/// with it. [`dispose`](Scope::dispose) runs the registered cleanups once, most
/// recent first. Dropping a scope disposes it.
///
/// ```ignore
/// let scope = Scope::new();
/// let bus = EventBus::<u32>::new();
///
/// scope.run(|| {
///     bus.listen(|n| println!("{n}"));
/// });
///
/// bus.emit(1); // prints
/// scope.dispose();
/// bus.emit(2); // listener was removed
/// ```
pub struct Scope {
    inner: Rc<ScopeInner>,
}

#[derive(Default)]
struct ScopeInner {
    cleanups: RefCell<Vec<Cleanup>>,
    disposed: Cell<bool>,
}

impl ScopeInner {
    fn push(&self, cleanup: Cleanup) {
        if self.disposed.get() {
            cleanup();
        } else {
            self.cleanups.borrow_mut().push(cleanup);
        }
    }
}

impl Scope {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ScopeInner::default()),
        }
    }

    /// Run `f` with this scope as the current scope.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        SCOPES.with(|scopes| scopes.borrow_mut().push(Some(Rc::clone(&self.inner))));
        let _guard = ScopeGuard;
        f()
    }

    /// Register a cleanup with this scope directly.
    ///
    /// On an already disposed scope the cleanup runs immediately.
    pub fn on_cleanup(&self, cleanup: impl FnOnce() + 'static) {
        self.inner.push(Box::new(cleanup));
    }

    /// Run every registered cleanup exactly once, most recent first.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let cleanups = std::mem::take(&mut *self.inner.cleanups.borrow_mut());
        for cleanup in cleanups.into_iter().rev() {
            cleanup();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Number of cleanups waiting for disposal.
    pub fn pending_cleanups(&self) -> usize {
        self.inner.cleanups.borrow().len()
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("pending_cleanups", &self.pending_cleanups())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

struct ScopeGuard;

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        SCOPES.with(|scopes| {
            scopes.borrow_mut().pop();
        });
    }
}

/// Register `cleanup` with the current scope.
///
/// Returns `false` (and drops `cleanup` without running it) when no scope is
/// running, in which case the caller stays responsible for the resource.
pub fn on_cleanup(cleanup: impl FnOnce() + 'static) -> bool {
    match current_scope() {
        Some(scope) => {
            scope.push(Box::new(cleanup));
            true
        }
        None => false,
    }
}

/// Whether a [`Scope`] is currently running on this thread.
pub fn in_scope() -> bool {
    current_scope().is_some()
}

fn current_scope() -> Option<Rc<ScopeInner>> {
    SCOPES.with(|scopes| scopes.borrow().last().cloned().flatten())
}

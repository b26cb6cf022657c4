//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (effect, watch,
//!    derived signal), the signal registers that context as a subscriber.
//!    Registration is keyed by subscriber ID, so repeated reads register once.
//!
//! 2. When a write changes the value (see [`SameValue`]), every subscriber
//!    is pushed into the batch queue. Nothing runs inline: the queue is
//!    flushed in the next microtask, once, however many writes happened.
//!
//! 3. Equal writes are dropped without notifying anybody.
//!
//! # Nested values
//!
//! Containers are made reactive by holding signals: a list of records is a
//! `Signal<Vec<Record>>` where every record field is its own `Signal`
//! (see [`reactive_record!`](crate::reactive_record)). Replacing the list
//! replaces the records it owns; editing a field leaves the list alone.
//! Reads of derived facts such as the list length go through the outer
//! signal only, so a field edit does not wake readers of the list.

use std::fmt::Debug;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};

use super::batch;
use super::context::ReactiveContext;
use super::equality::{HasIdentity, Identity, SameValue};
use super::subscriber::{Subscriber, SubscriberId};

/// Type-erased view of a signal used for unsubscription.
pub(crate) trait Source: Send + Sync {
    fn unsubscribe(&self, subscriber_id: SubscriberId);
}

struct SignalInner<T> {
    identity: Identity,
    value: RwLock<T>,
    /// Insertion-ordered so notifications follow first-read order.
    subscribers: Mutex<IndexMap<SubscriberId, Arc<Subscriber>>>,
}

impl<T: Send + Sync> Source for SignalInner<T> {
    fn unsubscribe(&self, subscriber_id: SubscriberId) {
        self.subscribers.lock().shift_remove(&subscriber_id);
    }
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal clones the handle; all clones share value and
/// subscribers.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (subscribers run in the next microtask)
/// count.set(5);
/// count.update(|n| n + 1);
/// ```
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: SameValue + Send + Sync + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(SignalInner {
                identity: Identity::next(),
                value: RwLock::new(value),
                subscribers: Mutex::new(IndexMap::new()),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.identity.raw()
    }

    /// Register the running computation, if any, as a subscriber.
    fn track(&self) {
        if let Some(subscriber) = ReactiveContext::current_subscriber() {
            self.inner
                .subscribers
                .lock()
                .entry(subscriber.id())
                .or_insert(subscriber);

            let source: Weak<dyn Source> = Arc::downgrade(&self.inner) as Weak<dyn Source>;
            ReactiveContext::track_dependency(self.id(), source);
        }
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.track();
        self.inner.value.read().clone()
    }

    /// Borrow the current value, registering a dependency like [`get`](Self::get).
    ///
    /// The value stays read-locked while `f` runs: calling [`set`](Self::set)
    /// or [`update`](Self::update) on this signal from inside `f` deadlocks.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.read())
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.read().clone()
    }

    /// Borrow the current value without tracking dependencies.
    ///
    /// Holds the read lock like [`with`](Self::with).
    pub fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.read())
    }

    /// Store a new value and queue every subscriber.
    ///
    /// Returns `false`, and notifies nobody, when `value` is the same value
    /// as the current one.
    pub fn set(&self, value: T) -> bool {
        {
            let mut guard = self.inner.value.write();
            if guard.same_value(&value) {
                return false;
            }
            *guard = value;
        }

        self.notify_subscribers();
        true
    }

    /// Update the value using a function of the current value.
    ///
    /// A panic in `f` reaches the caller and leaves the signal untouched.
    pub fn update<F>(&self, f: F) -> bool
    where
        T: Clone,
        F: FnOnce(&T) -> T,
    {
        let current = self.get_untracked();
        self.set(f(&current))
    }

    /// Update the value using a fallible function.
    ///
    /// On error the signal is left unchanged and the error is returned as is.
    pub fn try_update<E, F>(&self, f: F) -> Result<bool, E>
    where
        T: Clone,
        F: FnOnce(&T) -> Result<T, E>,
    {
        let current = self.get_untracked();
        let next = f(&current)?;
        Ok(self.set(next))
    }

    /// Register a subscriber explicitly, outside any tracked evaluation.
    pub fn subscribe(&self, subscriber: &Arc<Subscriber>) {
        self.inner
            .subscribers
            .lock()
            .entry(subscriber.id())
            .or_insert_with(|| Arc::clone(subscriber));
    }

    /// Remove a subscriber.
    ///
    /// Safe to call while a flush is running; a run that is already queued
    /// still happens.
    pub fn unsubscribe(&self, subscriber_id: SubscriberId) {
        self.inner.unsubscribe(subscriber_id);
    }

    /// Queue every subscriber for the next flush.
    fn notify_subscribers(&self) {
        let subscribers: Vec<Arc<Subscriber>> =
            self.inner.subscribers.lock().values().cloned().collect();
        for subscriber in subscribers {
            batch::enqueue(subscriber);
        }
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.lock().len()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> HasIdentity for Signal<T> {
    fn identity(&self) -> Identity {
        self.inner.identity
    }
}

impl<T> SameValue for Signal<T> {
    fn same_value(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Debug for Signal<T>
where
    T: SameValue + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.id())
            .field("value", &*self.inner.value.read())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

/// Wrap every element of `items` into its own signal.
///
/// The element signals are the identities the list reconciler keys on.
pub fn signal_list<T, I>(items: I) -> Signal<Vec<Signal<T>>>
where
    T: SameValue + Send + Sync + 'static,
    I: IntoIterator<Item = T>,
{
    Signal::new(items.into_iter().map(Signal::new).collect())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

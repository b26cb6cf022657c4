//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! the computation on top of the stack is registered as a subscriber.
//!
//! # Implementation
//!
//! We use a thread-local stack rather than a single "current subscriber"
//! slot. Entering a context pushes the subscriber, dropping the guard pops
//! it, so the slot is restored even when the computation panics. A watch
//! binding created while a list reconciler is rendering therefore captures
//! its own reads, and the reconciler gets its slot back afterwards.
//!
//! A subscriber that is already on the stack must not be entered again;
//! [`ReactiveContext::is_running`] lets callers refuse such a run.
//!
//! [`ReactiveContext::untracked`] pushes an entry with no subscriber. Reads
//! made under it register nothing, even when a tracked evaluation is
//! running further down the stack.

use std::cell::RefCell;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;

use super::signal::Source;
use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
struct ContextEntry {
    /// The computation being evaluated; `None` suspends tracking.
    subscriber: Option<Arc<Subscriber>>,
    /// Signals read during this evaluation, keyed by signal ID.
    sources: IndexMap<u64, Weak<dyn Source>>,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: Option<SubscriberId>,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// While this context is active, any signals that are read will
    /// register the subscriber as a dependent.
    pub fn enter(subscriber: Arc<Subscriber>) -> Self {
        let subscriber_id = subscriber.id();
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber: Some(subscriber),
                sources: IndexMap::new(),
            });
        });

        Self {
            subscriber_id: Some(subscriber_id),
        }
    }

    /// Run `f` with tracking suspended.
    ///
    /// Signals read inside `f` do not become dependencies of the computation
    /// that is currently running.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber: None,
                sources: IndexMap::new(),
            });
        });
        let _guard = Self {
            subscriber_id: None,
        };
        f()
    }

    /// Check if a tracked evaluation is collecting reads right now.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|entry| entry.subscriber.is_some())
        })
    }

    /// Check whether the given subscriber is anywhere on the stack.
    pub fn is_running(subscriber_id: SubscriberId) -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .filter_map(|entry| entry.subscriber.as_ref())
                .any(|subscriber| subscriber.id() == subscriber_id)
        })
    }

    /// Get the subscriber on top of the stack, if any.
    pub fn current_subscriber() -> Option<Arc<Subscriber>> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(|entry| entry.subscriber.clone())
        })
    }

    /// Record that the current computation read the given signal.
    pub(crate) fn track_dependency(signal_id: u64, source: Weak<dyn Source>) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack
                .borrow_mut()
                .last_mut()
                .filter(|entry| entry.subscriber.is_some())
            {
                entry.sources.entry(signal_id).or_insert(source);
            }
        });
    }

    /// Take the sources collected by this context so far.
    pub(crate) fn take_sources(&self) -> IndexMap<u64, Weak<dyn Source>> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .last_mut()
                .filter(|entry| {
                    entry.subscriber.as_ref().map(|s| s.id()) == self.subscriber_id
                })
                .map(|entry| std::mem::take(&mut entry.sources))
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        CONTEXT_STACK.with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber.as_ref().map(|subscriber| subscriber.id()),
                    self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id,
                    entry.subscriber.as_ref().map(|subscriber| subscriber.id())
                );
            }
        });
    }
}

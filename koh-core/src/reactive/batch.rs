//! Batch Queue
//!
//! Signal writes never run subscribers inline. Every notified subscriber is
//! added to a per-thread queue, deduplicated by ID and kept in insertion
//! order, and the first enqueue of a turn schedules one flush as a
//! microtask. All writes of the turn therefore coalesce into that flush.
//!
//! # Chained flushes
//!
//! The flush takes the queue before running anything. Writes made by the
//! subscribers it runs (a derived signal rewriting itself, a handler
//! writing state) land in a fresh queue and schedule the next flush, which
//! runs after the current one completes.
//!
//! A write cycle keeps scheduling flushes forever. The chain length is
//! counted and the batch is dropped once it passes
//! [`RuntimeConfig::max_flush_depth`](crate::config::RuntimeConfig).
//!
//! # Failures
//!
//! A panicking subscriber aborts the rest of its flush: the taken queue is
//! dropped with the unwinding stack. The queue itself was already reset,
//! so the next write schedules a new flush as usual.

use std::cell::RefCell;
use std::sync::Arc;

use indexmap::IndexMap;

use super::runtime::Runtime;
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::{KohError, Result};

thread_local! {
    static BATCH: RefCell<BatchQueue> = RefCell::new(BatchQueue::default());
}

#[derive(Default)]
struct BatchQueue {
    pending: IndexMap<SubscriberId, Arc<Subscriber>>,
    scheduled: bool,
    flushing: bool,
    /// Number of flushes scheduled back to back from inside a flush.
    chain_depth: usize,
}

/// Resets the `flushing` flag even when a subscriber panics.
struct FlushGuard;

impl Drop for FlushGuard {
    fn drop(&mut self) {
        BATCH.with(|batch| batch.borrow_mut().flushing = false);
    }
}

/// Queue a subscriber for the next flush.
///
/// A subscriber already waiting in the queue keeps its position.
pub(crate) fn enqueue(subscriber: Arc<Subscriber>) {
    let schedule = BATCH.with(|batch| {
        let mut batch = batch.borrow_mut();
        batch.pending.entry(subscriber.id()).or_insert(subscriber);

        if batch.scheduled {
            return false;
        }
        batch.scheduled = true;
        batch.chain_depth = if batch.flushing {
            batch.chain_depth + 1
        } else {
            0
        };
        true
    });

    if schedule {
        Runtime::queue_microtask(|| flush().map(|_| ()));
    }
}

/// Run every queued subscriber once, in queue order.
///
/// Returns how many subscribers ran. Called from the microtask scheduled by
/// the first enqueue of a turn.
pub fn flush() -> Result<usize> {
    let limit = Runtime::config().max_flush_depth;

    let pending = BATCH.with(|batch| {
        let mut batch = batch.borrow_mut();
        batch.scheduled = false;

        if batch.chain_depth >= limit {
            batch.pending.clear();
            batch.chain_depth = 0;
            return Err(KohError::FlushDepthExceeded { limit });
        }

        batch.flushing = true;
        Ok(std::mem::take(&mut batch.pending))
    });

    let pending = match pending {
        Ok(pending) => pending,
        Err(err) => {
            tracing::error!(limit, "dropping batch: flush chain too deep");
            return Err(err);
        }
    };

    let _guard = FlushGuard;
    let count = pending.len();
    tracing::trace!(subscribers = count, "flushing batch");

    for subscriber in pending.into_values() {
        subscriber.notify();
    }

    Ok(count)
}

/// Number of subscribers waiting for the next flush.
pub fn pending_count() -> usize {
    BATCH.with(|batch| batch.borrow().pending.len())
}

/// Whether a flush is scheduled and has not started yet.
pub fn is_scheduled() -> bool {
    BATCH.with(|batch| batch.borrow().scheduled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn enqueue_deduplicates_and_schedules_once() {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        let subscriber = Arc::new(Subscriber::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));

        enqueue(subscriber.clone());
        enqueue(subscriber.clone());
        enqueue(subscriber);

        assert!(is_scheduled());
        assert_eq!(pending_count(), 1);
        assert_eq!(Runtime::pending_microtasks(), 1);

        Runtime::run_microtasks().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!is_scheduled());
        assert_eq!(pending_count(), 0);
    }

    #[test]
    fn flush_runs_in_insertion_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let subscribers: Vec<_> = (0..3)
            .map(|i| {
                let order = order.clone();
                Arc::new(Subscriber::new(move || order.lock().push(i)))
            })
            .collect();

        enqueue(subscribers[2].clone());
        enqueue(subscribers[0].clone());
        enqueue(subscribers[1].clone());
        enqueue(subscribers[2].clone());

        Runtime::run_microtasks().unwrap();
        assert_eq!(*order.lock(), vec![2, 0, 1]);
    }

    #[test]
    fn enqueue_during_flush_schedules_a_later_flush() {
        let second_ran = Arc::new(AtomicI32::new(0));
        let second_clone = second_ran.clone();
        let second = Arc::new(Subscriber::new(move || {
            second_clone.fetch_add(1, Ordering::SeqCst);
        }));

        let first = Arc::new(Subscriber::new(move || {
            enqueue(second.clone());
        }));
        enqueue(first);

        // Two flushes: the second is scheduled by the first.
        assert_eq!(Runtime::run_microtasks().unwrap(), 2);
        assert_eq!(second_ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn self_scheduling_subscriber_trips_the_depth_limit() {
        let slot: Arc<Mutex<Option<Arc<Subscriber>>>> = Arc::new(Mutex::new(None));
        let slot_clone = slot.clone();
        let looping = Arc::new(Subscriber::new(move || {
            if let Some(me) = slot_clone.lock().clone() {
                enqueue(me);
            }
        }));
        *slot.lock() = Some(looping.clone());

        enqueue(looping);
        let err = Runtime::run_microtasks().unwrap_err();
        assert_eq!(err, KohError::FlushDepthExceeded { limit: 100 });
        assert_eq!(pending_count(), 0);

        // Break the cycle so the subscriber can be dropped.
        slot.lock().take();
    }
}

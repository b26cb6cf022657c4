//! Reactive Runtime
//!
//! The runtime owns the per-thread pieces that outlive a single signal: the
//! microtask queue and the configuration.
//!
//! # Turns and microtasks
//!
//! Everything the reactive layer defers runs as a microtask: batch flushes,
//! mutation observer deliveries and the lifecycle checks that tell a moved
//! component apart from a removed one. A "turn" is whatever synchronous code
//! runs before the embedder calls [`Runtime::run_microtasks`]; nothing
//! deferred ever runs before that call.
//!
//! ```rust,ignore
//! count.set(1);
//! count.set(2);                  // coalesced with the first write
//! Runtime::run_microtasks()?;    // subscribers run once here
//! ```
//!
//! Tasks queued while draining run in the same drain, after everything that
//! was queued before them.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::sync::Arc;

use super::context::ReactiveContext;
use super::subscriber::Subscriber;
use crate::config::RuntimeConfig;
use crate::error::{KohError, Result};

type Microtask = Box<dyn FnOnce() -> Result<()>>;

thread_local! {
    static MICROTASKS: RefCell<VecDeque<Microtask>> = RefCell::new(VecDeque::new());
    static DRAINING: Cell<bool> = const { Cell::new(false) };
    static CONFIG: RefCell<RuntimeConfig> = RefCell::new(RuntimeConfig::default());
}

/// Clears the draining flag when a drain ends, even by panic.
struct DrainGuard;

impl Drop for DrainGuard {
    fn drop(&mut self) {
        DRAINING.with(|draining| draining.set(false));
    }
}

/// The per-thread reactive runtime.
pub struct Runtime;

impl Runtime {
    /// Install a configuration for the current thread.
    pub fn configure(config: RuntimeConfig) {
        CONFIG.with(|slot| *slot.borrow_mut() = config);
    }

    /// A copy of the current thread's configuration.
    pub fn config() -> RuntimeConfig {
        CONFIG.with(|slot| slot.borrow().clone())
    }

    /// Defer `task` until after the current turn.
    pub fn queue_microtask<F>(task: F)
    where
        F: FnOnce() -> Result<()> + 'static,
    {
        MICROTASKS.with(|queue| queue.borrow_mut().push_back(Box::new(task)));
    }

    /// Number of microtasks waiting to run.
    pub fn pending_microtasks() -> usize {
        MICROTASKS.with(|queue| queue.borrow().len())
    }

    /// Run queued microtasks until the queue is empty.
    ///
    /// Returns the number of tasks run. A call made from inside a running
    /// task returns `Ok(0)`; the outer drain picks up whatever is queued.
    ///
    /// The first failing task stops the drain and its error is returned;
    /// tasks behind it stay queued. Exceeding
    /// [`RuntimeConfig::max_microtasks_per_drain`] clears the queue.
    pub fn run_microtasks() -> Result<usize> {
        if DRAINING.with(|draining| draining.replace(true)) {
            return Ok(0);
        }
        let _guard = DrainGuard;

        let limit = Self::config().max_microtasks_per_drain;
        let mut ran = 0;

        while let Some(task) = MICROTASKS.with(|queue| queue.borrow_mut().pop_front()) {
            if ran >= limit {
                MICROTASKS.with(|queue| queue.borrow_mut().clear());
                tracing::error!(limit, "microtask drain limit exceeded, queue cleared");
                return Err(KohError::MicrotaskLimitExceeded { limit });
            }
            ran += 1;
            task()?;
        }

        tracing::trace!(tasks = ran, "microtasks drained");
        Ok(ran)
    }

    /// Get the subscriber currently being tracked, if any.
    pub fn current_subscriber() -> Option<Arc<Subscriber>> {
        ReactiveContext::current_subscriber()
    }

    /// Whether signal reads right now would become dependencies.
    pub fn is_tracking() -> bool {
        ReactiveContext::is_active()
    }
}

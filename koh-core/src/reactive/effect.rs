//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately inside its own
//!    reactive context. Every signal read during that run, not only the one
//!    a watch binding was created for, becomes a dependency.
//!
//! 2. When any dependency changes, the effect's subscriber is queued and the
//!    effect re-runs in the next flush. Re-runs are tracked as well, so
//!    signals first read on a later run are picked up.
//!
//! 3. [`Effect::dispose`] unsubscribes from every signal the effect has ever
//!    read. A run that was already queued becomes a no-op.
//!
//! # Watch bindings
//!
//! [`watch`] pairs a signal with a `handler(target, value)` and produces a
//! [`Watch`] binder. Binding it to a target creates one effect fixed to that
//! target; the component layer keys the returned effect's teardown on the
//! target node.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::context::ReactiveContext;
use super::equality::SameValue;
use super::signal::{Signal, Source};
use super::subscriber::{Subscriber, SubscriberId};
use crate::error::{KohError, Result};

/// Counter for generating unique effect IDs.
static EFFECT_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a new unique effect ID.
fn next_effect_id() -> u64 {
    EFFECT_ID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

struct EffectInner {
    id: u64,
    /// Set once at construction. Weak because the subscriber owns the effect.
    subscriber: OnceLock<Weak<Subscriber>>,
    run: Box<dyn Fn() + Send + Sync>,
    /// Every signal read by any run, keyed by signal ID.
    sources: Mutex<IndexMap<u64, Weak<dyn Source>>>,
    disposed: AtomicBool,
    run_count: AtomicUsize,
}

impl EffectInner {
    /// Entry point for flushes.
    fn rerun(&self) {
        let Some(subscriber) = self.subscriber.get().and_then(Weak::upgrade) else {
            return;
        };
        if let Err(err) = self.execute(&subscriber) {
            tracing::error!(effect = self.id, %err, "effect run failed");
        }
    }

    fn execute(&self, subscriber: &Arc<Subscriber>) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.track(subscriber, || (self.run)())
    }

    fn track<R>(&self, subscriber: &Arc<Subscriber>, f: impl FnOnce() -> R) -> Result<R> {
        if ReactiveContext::is_running(subscriber.id()) {
            tracing::error!(effect = self.id, "refusing re-entrant effect run");
            return Err(KohError::ReentrantEvaluation(subscriber.id()));
        }

        Ok(self.run_tracked(subscriber, f))
    }

    fn run_tracked<R>(&self, subscriber: &Arc<Subscriber>, f: impl FnOnce() -> R) -> R {
        let ctx = ReactiveContext::enter(Arc::clone(subscriber));
        let result = f();
        let read = ctx.take_sources();
        drop(ctx);

        let mut sources = self.sources.lock();
        if self.disposed.load(Ordering::SeqCst) {
            // Disposed during this run: dispose already drained the old
            // sources, so drop what this run read as well.
            drop(sources);
            for source in read.into_values().filter_map(|s| s.upgrade()) {
                source.unsubscribe(subscriber.id());
            }
        } else {
            sources.extend(read);
        }
        self.run_count.fetch_add(1, Ordering::SeqCst);
        result
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// Every signal the effect reads holds on to it, so dropping the handle does
/// not stop it; [`dispose`](Self::dispose) does.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(0);
///
/// let effect = Effect::new(cloned!(count => move || {
///     println!("Count is: {}", count.get());
/// }));
///
/// count.set(5);
/// Runtime::run_microtasks()?; // Prints: "Count is: 5"
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Arc<EffectInner>,
    subscriber: Arc<Subscriber>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let effect = Self::new_lazy(run);
        effect.track_fresh(|| (effect.inner.run)());
        effect
    }

    /// Create a new effect without running it.
    ///
    /// It has no dependencies until it is executed or used with
    /// [`track`](Self::track).
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let inner = Arc::new(EffectInner {
            id: next_effect_id(),
            subscriber: OnceLock::new(),
            run: Box::new(run),
            sources: Mutex::new(IndexMap::new()),
            disposed: AtomicBool::new(false),
            run_count: AtomicUsize::new(0),
        });

        let subscriber = Arc::new(Subscriber::new({
            let inner = Arc::clone(&inner);
            move || inner.rerun()
        }));
        let _ = inner.subscriber.set(Arc::downgrade(&subscriber));

        Self { inner, subscriber }
    }

    /// Get the effect's unique ID.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.subscriber.id()
    }

    /// Run the effect function now, tracking what it reads.
    ///
    /// Fails with [`KohError::ReentrantEvaluation`] when called from inside
    /// this effect's own run.
    pub fn execute(&self) -> Result<()> {
        self.inner.execute(&self.subscriber)
    }

    /// Run `f` as this effect: signals it reads become dependencies and
    /// later changes re-run the effect function.
    pub fn track<R>(&self, f: impl FnOnce() -> R) -> Result<R> {
        self.inner.track(&self.subscriber, f)
    }

    /// [`track`](Self::track) for an effect that has never run, which
    /// cannot be on the tracking stack yet.
    pub(crate) fn track_fresh<R>(&self, f: impl FnOnce() -> R) -> R {
        debug_assert_eq!(self.run_count(), 0);
        self.inner.run_tracked(&self.subscriber, f)
    }

    /// Queue the effect for the next flush.
    pub fn schedule(&self) {
        if !self.is_disposed() {
            super::batch::enqueue(Arc::clone(&self.subscriber));
        }
    }

    /// Dispose of the effect.
    ///
    /// Unsubscribes from every signal it read. After disposal, the effect
    /// will not run again.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let id = self.subscriber_id();
        let sources: Vec<_> = self.inner.sources.lock().drain(..).collect();
        for source in sources.into_iter().filter_map(|(_, s)| s.upgrade()) {
            source.unsubscribe(id);
        }
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Get the number of distinct signals the effect has read.
    pub fn dependency_count(&self) -> usize {
        self.inner.sources.lock().len()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Watch
// ----------------------------------------------------------------------------

/// A signal paired with a handler, waiting for a target.
///
/// Cloning is cheap; each [`bind`](Self::bind) creates an independent
/// effect.
pub struct Watch<S, T> {
    signal: Signal<S>,
    handler: Arc<dyn Fn(&T, S) + Send + Sync>,
}

/// Create a watch binder over `signal`.
///
/// ```rust,ignore
/// let label = watch(&name, |el: &Node, name: String| el.set_text_content(name));
/// let effect = label.bind(&span);
/// ```
pub fn watch<S, T, F>(signal: &Signal<S>, handler: F) -> Watch<S, T>
where
    S: SameValue + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    F: Fn(&T, S) + Send + Sync + 'static,
{
    Watch {
        signal: signal.clone(),
        handler: Arc::new(handler),
    }
}

impl<S, T> Watch<S, T>
where
    S: SameValue + Clone + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Run the handler against `target` now, and again whenever anything it
    /// read changes.
    ///
    /// Dispose the returned effect to stop it.
    pub fn bind(&self, target: &T) -> Effect {
        let signal = self.signal.clone();
        let handler = Arc::clone(&self.handler);
        let target = target.clone();
        Effect::new(move || handler(&target, signal.get()))
    }
}

impl<S, T> Clone for Watch<S, T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

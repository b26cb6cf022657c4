//! Derived Signals
//!
//! A derived signal is an ordinary [`Signal`] whose value is produced by a
//! function of other signals and kept current by an internal effect.
//!
//! # How Derived Signals Work
//!
//! 1. [`compute`] runs the function once, inside the internal effect's
//!    reactive context, and stores the result in a new signal.
//!
//! 2. When a signal the function read changes, the effect re-runs in the
//!    next flush and writes the new result into the derived signal. That
//!    write follows the usual same-value rule, so subscribers of the derived
//!    signal are queued only when the result actually changed, and they run
//!    in the flush after.
//!
//! Derived signals are eager (push-based): the function re-runs once per
//! upstream batch whether or not anybody reads the result.
//!
//! Two derived signals that write each other form a cycle that never
//! settles; the batch queue cuts such chains off at
//! [`RuntimeConfig::max_flush_depth`](crate::config::RuntimeConfig).

use std::fmt::Debug;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};

use super::effect::Effect;
use super::equality::SameValue;
use super::signal::Signal;

/// A signal kept up to date from other signals.
///
/// Derefs to its [`Signal`], so it is read like any other signal.
pub struct Derived<T> {
    signal: Signal<T>,
    effect: Effect,
}

/// Create a derived signal from `f`.
///
/// ```rust,ignore
/// let total = compute(cloned!(items => move || {
///     items.get().iter().map(|item| item.price.get() * item.amount.get() as f64).sum::<f64>()
/// }));
/// ```
pub fn compute<T, F>(f: F) -> Derived<T>
where
    T: SameValue + Send + Sync + 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let slot: Arc<OnceLock<Signal<T>>> = Arc::new(OnceLock::new());

    let effect = Effect::new_lazy({
        let f = Arc::clone(&f);
        let slot = Arc::clone(&slot);
        move || {
            let value = f();
            if let Some(signal) = slot.get() {
                signal.set(value);
            }
        }
    });

    let signal = Signal::new(effect.track_fresh(|| f()));
    let _ = slot.set(signal.clone());

    Derived { signal, effect }
}

impl<T> Derived<T>
where
    T: SameValue + Send + Sync + 'static,
{
    /// The underlying signal.
    pub fn signal(&self) -> &Signal<T> {
        &self.signal
    }

    /// The effect recomputing the value.
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// Stop recomputing. The signal keeps its last value.
    pub fn dispose(&self) {
        self.effect.dispose();
    }
}

impl<T> Deref for Derived<T> {
    type Target = Signal<T>;

    fn deref(&self) -> &Signal<T> {
        &self.signal
    }
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
            effect: self.effect.clone(),
        }
    }
}

impl<T> Debug for Derived<T>
where
    T: SameValue + Send + Sync + Debug + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Derived")
            .field("signal", &self.signal)
            .field("effect", &self.effect)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Runtime;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn derived_computes_on_creation() {
        let base = Signal::new(10);
        let base_clone = base.clone();
        let doubled = compute(move || base_clone.get() * 2);

        assert_eq!(doubled.get(), 20);
        assert_eq!(base.subscriber_count(), 1);
    }

    #[test]
    fn derived_reruns_once_per_upstream_batch() {
        let calls = Arc::new(AtomicI32::new(0));
        let a = Signal::new(1);
        let b = Signal::new(2);

        let (a2, b2, calls2) = (a.clone(), b.clone(), calls.clone());
        let sum = compute(move || {
            calls2.fetch_add(1, Ordering::SeqCst);
            a2.get() + b2.get()
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        a.set(10);
        b.set(20);
        a.set(100);
        assert_eq!(sum.get(), 3);

        Runtime::run_microtasks().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sum.get(), 120);
    }

    #[test]
    fn unchanged_result_does_not_notify() {
        let value = Signal::new(3);
        let value_clone = value.clone();
        let is_odd = compute(move || value_clone.get() % 2 == 1);

        let downstream_runs = Arc::new(AtomicI32::new(0));
        let (is_odd2, runs2) = (is_odd.signal().clone(), downstream_runs.clone());
        let _effect = Effect::new(move || {
            is_odd2.get();
            runs2.fetch_add(1, Ordering::SeqCst);
        });

        value.set(5);
        Runtime::run_microtasks().unwrap();
        assert_eq!(downstream_runs.load(Ordering::SeqCst), 1);

        value.set(6);
        Runtime::run_microtasks().unwrap();
        assert_eq!(downstream_runs.load(Ordering::SeqCst), 2);
        assert!(!is_odd.get());
    }

    #[test]
    fn derived_signals_chain() {
        let base = Signal::new(5);
        let base_clone = base.clone();
        let doubled = compute(move || base_clone.get() * 2);

        let doubled_signal = doubled.signal().clone();
        let plus_ten = compute(move || doubled_signal.get() + 10);

        assert_eq!(plus_ten.get(), 20);

        base.set(10);
        Runtime::run_microtasks().unwrap();

        assert_eq!(doubled.get(), 20);
        assert_eq!(plus_ten.get(), 30);
    }

    #[test]
    fn disposed_derived_keeps_last_value() {
        let base = Signal::new(1);
        let base_clone = base.clone();
        let tripled = compute(move || base_clone.get() * 3);

        tripled.dispose();
        base.set(2);
        Runtime::run_microtasks().unwrap();

        assert_eq!(tripled.get(), 3);
        assert_eq!(base.subscriber_count(), 0);
    }
}

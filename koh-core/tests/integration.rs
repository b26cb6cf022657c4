//! Integration Tests for the Reactive System
//!
//! These tests verify that signals, effects, watch bindings and derived
//! signals work together across turns.

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use koh_core::reactive::{compute, watch, Effect, ReactiveContext, Runtime, Signal};
use koh_core::{cloned, reactive_record, KohError, Node, RuntimeConfig};

/// Reading outside any tracked evaluation never subscribes.
#[test]
fn untracked_reads_do_not_subscribe() {
    let signal = Signal::new(1);
    assert!(!ReactiveContext::is_active());

    signal.get();
    signal.with(|v| *v + 1);
    assert_eq!(signal.subscriber_count(), 0);
}

/// Many writes in one turn run each handler exactly once, after the turn.
#[test]
fn writes_in_one_turn_coalesce() {
    let signal = Signal::new(0);
    let runs = Arc::new(AtomicI32::new(0));
    let seen = Arc::new(AtomicI32::new(-1));

    let _effect = Effect::new(cloned!(signal, runs, seen => move || {
        seen.store(signal.get(), Ordering::SeqCst);
        runs.fetch_add(1, Ordering::SeqCst);
    }));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    for value in 1..=10 {
        signal.set(value);
    }
    // Never before the turn ends.
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(seen.load(Ordering::SeqCst), 0);

    Runtime::run_microtasks().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    assert_eq!(seen.load(Ordering::SeqCst), 10);
}

/// Same-value writes (NaN included) notify nobody.
#[test]
fn same_value_writes_are_silent() {
    let signal = Signal::new(f64::NAN);
    let runs = Arc::new(AtomicI32::new(0));
    let _effect = Effect::new(cloned!(signal, runs => move || {
        signal.get();
        runs.fetch_add(1, Ordering::SeqCst);
    }));

    assert!(!signal.set(f64::NAN));
    Runtime::run_microtasks().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    assert!(signal.set(1.5));
    assert!(!signal.set(1.5));
    Runtime::run_microtasks().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// A derived signal reruns once per upstream batch and notifies only on
/// change.
#[test]
fn derived_signal_pushes_changes_downstream() {
    let price = Signal::new(10.0);
    let amount = Signal::new(2u32);
    let computations = Arc::new(AtomicI32::new(0));

    let total = compute(cloned!(price, amount, computations => move || {
        computations.fetch_add(1, Ordering::SeqCst);
        price.get() * amount.get() as f64
    }));

    let observed = Arc::new(AtomicI32::new(0));
    let _effect = Effect::new(cloned!(total, observed => move || {
        total.get();
        observed.fetch_add(1, Ordering::SeqCst);
    }));

    price.set(20.0);
    amount.set(1);
    Runtime::run_microtasks().unwrap();
    assert_eq!(computations.load(Ordering::SeqCst), 2);
    assert_eq!(total.get(), 20.0);
    // 20 * 1 == 10 * 2: unchanged result, no downstream run.
    assert_eq!(observed.load(Ordering::SeqCst), 1);

    amount.set(3);
    Runtime::run_microtasks().unwrap();
    assert_eq!(total.get(), 60.0);
    assert_eq!(observed.load(Ordering::SeqCst), 2);
}

/// A watch binding tracks every signal its handler reads and always runs
/// against the same target.
#[test]
fn watch_binding_updates_its_target() {
    let name = Signal::new("Pants".to_string());
    let currency = Signal::new("EUR".to_string());

    let label = watch(
        &name,
        cloned!(currency => move |el: &Node, name: String| {
            el.set_text_content(format!("{name} ({})", currency.get()));
        }),
    );
    let span = Node::element("span");
    let effect = label.bind(&span);
    assert_eq!(span.text_content(), "Pants (EUR)");

    currency.set("USD".to_string());
    Runtime::run_microtasks().unwrap();
    assert_eq!(span.text_content(), "Pants (USD)");

    effect.dispose();
    name.set("Jeans".to_string());
    Runtime::run_microtasks().unwrap();
    assert_eq!(span.text_content(), "Pants (USD)");
    assert_eq!(name.subscriber_count(), 0);
}

reactive_record! {
    #[derive(Debug)]
    pub struct Product {
        pub name: String,
        pub price: f64,
    }
}

/// Field edits notify readers of that field only; the list is untouched.
#[test]
fn record_fields_are_independently_reactive() {
    let product = Product::new("Shiftback jeans".to_string(), 129.99);
    let list = Signal::new(vec![product.clone()]);

    let list_runs = Arc::new(AtomicI32::new(0));
    let price_runs = Arc::new(AtomicI32::new(0));
    let _list_effect = Effect::new(cloned!(list, list_runs => move || {
        list.with(|items| items.len());
        list_runs.fetch_add(1, Ordering::SeqCst);
    }));
    let _price_effect = Effect::new(cloned!(product, price_runs => move || {
        product.price.get();
        price_runs.fetch_add(1, Ordering::SeqCst);
    }));

    product.price.set(99.0);
    Runtime::run_microtasks().unwrap();
    assert_eq!(price_runs.load(Ordering::SeqCst), 2);
    assert_eq!(list_runs.load(Ordering::SeqCst), 1);

    product.name.set("Slim jeans".to_string());
    Runtime::run_microtasks().unwrap();
    assert_eq!(price_runs.load(Ordering::SeqCst), 2);
}

/// Effects that write each other's inputs are stopped by the flush depth
/// limit instead of looping forever.
#[test]
fn write_cycles_hit_the_depth_limit() {
    Runtime::configure(RuntimeConfig {
        max_flush_depth: 10,
        ..RuntimeConfig::default()
    });

    let a = Signal::new(0);
    let b = Signal::new(0);
    let _forward = Effect::new(cloned!(a, b => move || {
        b.set(a.get() + 1);
    }));
    let _backward = Effect::new(cloned!(a, b => move || {
        a.set(b.get() + 1);
    }));

    let err = Runtime::run_microtasks().unwrap_err();
    assert_eq!(err, KohError::FlushDepthExceeded { limit: 10 });

    // The graph stays usable.
    Runtime::configure(RuntimeConfig::default());
    let c = Signal::new(0);
    let seen = Arc::new(AtomicI32::new(0));
    let _effect = Effect::new(cloned!(c, seen => move || {
        seen.store(c.get(), Ordering::SeqCst);
    }));
    c.set(7);
    Runtime::run_microtasks().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 7);
}

/// A panicking subscriber reaches whoever drained the queue; later writes
/// still flush.
#[test]
fn panicking_subscriber_does_not_wedge_the_queue() {
    let trigger = Signal::new(0);
    let _effect = Effect::new(cloned!(trigger => move || {
        if trigger.get() == 1 {
            panic!("handler failed");
        }
    }));

    trigger.set(1);
    let result = std::panic::catch_unwind(|| Runtime::run_microtasks());
    assert!(result.is_err());

    let other = Signal::new(0);
    let runs = Arc::new(AtomicI32::new(0));
    let _other_effect = Effect::new(cloned!(other, runs => move || {
        other.get();
        runs.fetch_add(1, Ordering::SeqCst);
    }));
    other.set(1);
    Runtime::run_microtasks().unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

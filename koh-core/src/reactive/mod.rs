//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, effects,
//! watch bindings and derived signals. These primitives form the foundation
//! of Koh's fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (an effect, a watch binding or a derived
//! signal), the signal registers that context as a subscriber. When the
//! signal's value changes, all subscribers are queued.
//!
//! ## Batching
//!
//! Queued subscribers run in one flush after the current turn, each at most
//! once and in the order they were first queued. See [`Runtime`] for what a
//! turn is.
//!
//! ## Effects and derived signals
//!
//! An Effect re-runs a side-effecting function whenever something it read
//! changes. A derived signal ([`compute`]) is a signal written by such an
//! effect.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking stack to detect
//! dependencies automatically. When a signal is read, we check if there is
//! an active tracking context and, if so, register the dependency.

mod batch;
mod context;
mod derived;
mod effect;
mod equality;
mod runtime;
mod signal;
mod subscriber;

pub use batch::{flush, is_scheduled, pending_count};
pub use context::ReactiveContext;
pub use derived::{compute, Derived};
pub use effect::{watch, Effect, Watch};
pub use equality::{HasIdentity, Identity, SameValue};
pub use runtime::Runtime;
pub use signal::{signal_list, Signal};
pub use subscriber::{Subscriber, SubscriberId};

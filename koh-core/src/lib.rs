//! Koh Core
//!
//! This crate provides the runtime for Koh, a tiny fine-grained reactive
//! component model. It implements:
//!
//! - Reactive primitives (signals, effects, watch bindings, derived signals)
//!   with batched, deduplicated notification
//! - Reactive records and lists whose fields and elements are signals
//! - A keyed list reconciler that keeps one output node per item identity
//! - A component lifecycle that tells a moved component apart from a
//!   removed one before releasing anything
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: signals, dependency tracking, the batch queue and the
//!   per-thread microtask runtime
//! - `host`: an in-memory document with lifecycle hooks and mutation
//!   observers
//! - `component`: element builders, components, list reconciliation and
//!   mounting
//! - `config` / `error`: runtime limits and the error type
//!
//! # Example
//!
//! ```rust,ignore
//! use koh_core::reactive::{compute, Effect, Runtime, Signal};
//!
//! // Create a signal
//! let count = Signal::new(0);
//!
//! // Create a derived signal
//! let doubled = compute(cloned!(count => move || count.get() * 2));
//!
//! // Create an effect
//! let _log = Effect::new(cloned!(doubled => move || {
//!     println!("Doubled: {}", doubled.get());
//! }));
//!
//! // Writes are batched until the end of the turn
//! count.set(5);
//! Runtime::run_microtasks()?;
//! // The derived signal updates, then the effect prints "Doubled: 10"
//! ```

#[macro_use]
mod macros;

pub mod component;
pub mod config;
pub mod error;
pub mod host;
pub mod reactive;

pub use component::{koh, mount, parse_module, Child, Component, ComponentFactory};
pub use config::RuntimeConfig;
pub use error::{KohError, Result};
pub use host::{Document, Node};
pub use reactive::{compute, watch, Derived, Effect, Runtime, Signal};

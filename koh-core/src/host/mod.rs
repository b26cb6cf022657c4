//! Host Tree
//!
//! A small in-memory document the component layer renders into: nodes with
//! attributes, text and listeners, lifecycle hooks for connection changes,
//! and batched mutation observers.

mod document;
mod node;
mod observer;

pub use document::Document;
pub use node::{LifecycleHooks, Node, NodeId, NodeKind, WeakNode};
pub use observer::{MutationObserver, MutationRecord};

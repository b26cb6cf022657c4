//! Component Lifecycle
//!
//! A component instance lives on a `koh-component` host element and moves
//! through these states:
//!
//! ```text
//! Uninitialized --connect--> Connected --disconnect--> Disconnected
//!                                ^                          |
//!                                +--------reconnect---------+
//! ```
//!
//! The host cannot move a node without removing it first, so a reorder looks
//! exactly like a removal followed by an insertion. Both kinds of teardown
//! therefore wait one microtask before acting:
//!
//! - **Component teardown.** On disconnect a check is queued. If the element
//!   is back in the document when it runs, nothing happens. Otherwise the
//!   observer stops, every registered teardown runs once, the registry is
//!   cleared and the instance becomes uninitialized so a later connect runs
//!   setup again.
//! - **Node teardown.** Mutation records are collected as they arrive
//!   (phase one). One microtask later (phase two) each removed node that is
//!   no longer inside the component element releases the teardowns
//!   registered for it and its descendants. Nodes that were put back, as
//!   the list reconciler does when reordering, keep theirs.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::host::{LifecycleHooks, MutationObserver, MutationRecord, Node, NodeId, WeakNode};
use crate::reactive::{ReactiveContext, Runtime};

use super::Component;

pub(super) type Teardown = Box<dyn FnOnce() + Send>;
pub(super) type Setup = Box<dyn Fn(&Component) + Send + Sync>;

/// Where a component instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Connected,
    Disconnected,
}

struct Lifecycle {
    state: LifecycleState,
    initialized: bool,
    /// Teardowns owned by the component as a whole.
    unsubscribes: Vec<Teardown>,
    /// Teardowns owned by individual nodes in the component's subtree.
    cleanups: IndexMap<NodeId, Vec<Teardown>>,
    observer: Option<MutationObserver>,
}

pub(crate) struct ComponentInner {
    element: WeakNode,
    setup: Setup,
    lifecycle: Mutex<Lifecycle>,
}

impl ComponentInner {
    pub(super) fn new(element: WeakNode, setup: Setup) -> Self {
        Self {
            element,
            setup,
            lifecycle: Mutex::new(Lifecycle {
                state: LifecycleState::Uninitialized,
                initialized: false,
                unsubscribes: Vec::new(),
                cleanups: IndexMap::new(),
                observer: None,
            }),
        }
    }

    pub(super) fn element(&self) -> Option<Node> {
        self.element.upgrade()
    }

    pub(super) fn state(&self) -> LifecycleState {
        self.lifecycle.lock().state
    }

    pub(super) fn is_initialized(&self) -> bool {
        self.lifecycle.lock().initialized
    }

    /// Teardowns currently held, component-wide and per node.
    pub(super) fn registered_teardowns(&self) -> usize {
        let lifecycle = self.lifecycle.lock();
        lifecycle.unsubscribes.len() + lifecycle.cleanups.values().map(Vec::len).sum::<usize>()
    }

    pub(super) fn add_unsubscribe(&self, teardown: Teardown) {
        self.lifecycle.lock().unsubscribes.push(teardown);
    }

    pub(super) fn register_cleanup(&self, node: NodeId, teardown: Teardown) {
        self.lifecycle
            .lock()
            .cleanups
            .entry(node)
            .or_default()
            .push(teardown);
    }

    fn connect(self: &Arc<Self>, element: &Node) {
        {
            let mut lifecycle = self.lifecycle.lock();
            lifecycle.state = LifecycleState::Connected;
            if lifecycle.initialized {
                return;
            }
            lifecycle.initialized = true;
        }

        tracing::debug!(element = element.id().raw(), "component setup");
        // Connecting can happen inside another evaluation, such as a list
        // rerun rendering a new row. Setup reads belong to neither.
        let component = Component {
            inner: Arc::clone(self),
        };
        ReactiveContext::untracked(|| (self.setup)(&component));

        let weak = Arc::downgrade(self);
        let observer = MutationObserver::new(move |records| {
            if let Some(inner) = weak.upgrade() {
                inner.collect_removals(records);
            }
        });
        observer.observe(element);
        self.lifecycle.lock().observer = Some(observer);
    }

    fn disconnect(self: &Arc<Self>) {
        self.lifecycle.lock().state = LifecycleState::Disconnected;

        let inner = Arc::clone(self);
        Runtime::queue_microtask(move || {
            inner.teardown_if_removed();
            Ok(())
        });
    }

    fn teardown_if_removed(&self) {
        let element = self.element();
        if element.as_ref().is_some_and(Node::is_connected) {
            tracing::debug!("component moved, teardown skipped");
            return;
        }

        let (observer, unsubscribes, cleanups) = {
            let mut lifecycle = self.lifecycle.lock();
            if !lifecycle.initialized {
                return;
            }
            lifecycle.initialized = false;
            (
                lifecycle.observer.take(),
                std::mem::take(&mut lifecycle.unsubscribes),
                std::mem::take(&mut lifecycle.cleanups),
            )
        };

        if let Some(observer) = observer {
            observer.disconnect();
        }

        let mut released = 0;
        for teardown in unsubscribes {
            teardown();
            released += 1;
        }
        for teardown in cleanups.into_values().flatten() {
            teardown();
            released += 1;
        }

        // Setup rebuilds the content on the next connect.
        if let Some(element) = element {
            for child in element.children() {
                child.remove();
            }
        }

        tracing::debug!(released, "component torn down");
    }

    /// Phase one: note removed nodes, then check them after this turn.
    fn collect_removals(self: &Arc<Self>, records: Vec<MutationRecord>) {
        let removed: Vec<Node> = records
            .into_iter()
            .flat_map(|record| record.removed_nodes)
            .collect();
        if removed.is_empty() {
            return;
        }

        let inner = Arc::clone(self);
        Runtime::queue_microtask(move || {
            inner.release_removed(&removed);
            Ok(())
        });
    }

    /// Phase two: release teardowns of nodes that stayed out.
    fn release_removed(&self, removed: &[Node]) {
        let Some(element) = self.element() else {
            return;
        };

        let teardowns: Vec<Teardown> = {
            let mut lifecycle = self.lifecycle.lock();
            removed
                .iter()
                .filter(|node| !element.contains(node))
                .flat_map(|node| std::iter::once(node.clone()).chain(node.descendants()))
                .filter_map(|node| lifecycle.cleanups.shift_remove(&node.id()))
                .flatten()
                .collect()
        };

        if !teardowns.is_empty() {
            tracing::debug!(count = teardowns.len(), "releasing removed nodes");
        }
        for teardown in teardowns {
            teardown();
        }
    }
}

/// Lifecycle hooks installed on the component element.
pub(super) struct ComponentHooks {
    pub(super) inner: Arc<ComponentInner>,
}

impl LifecycleHooks for ComponentHooks {
    fn connected(&self, node: &Node) {
        self.inner.connect(node);
    }

    fn disconnected(&self, _node: &Node) {
        self.inner.disconnect();
    }
}

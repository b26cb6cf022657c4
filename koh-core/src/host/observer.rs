//! Mutation Observers
//!
//! An observer watches the subtrees of the nodes it was asked to observe.
//! Every child list change below one of them produces a [`MutationRecord`];
//! records are buffered and handed to the callback in a single batch from a
//! microtask, so all changes made during one turn arrive together.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use smallvec::SmallVec;

use super::node::{Node, WeakNode};
use crate::reactive::Runtime;

/// One child list change.
#[derive(Clone)]
pub struct MutationRecord {
    /// The node whose children changed.
    pub target: Node,
    pub added_nodes: SmallVec<[Node; 1]>,
    pub removed_nodes: SmallVec<[Node; 1]>,
}

impl fmt::Debug for MutationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationRecord")
            .field("target", &self.target.id())
            .field(
                "added_nodes",
                &self.added_nodes.iter().map(Node::id).collect::<Vec<_>>(),
            )
            .field(
                "removed_nodes",
                &self.removed_nodes.iter().map(Node::id).collect::<Vec<_>>(),
            )
            .finish()
    }
}

type Callback = Box<dyn Fn(Vec<MutationRecord>) + Send + Sync>;

pub(crate) struct ObserverInner {
    id: u64,
    callback: Callback,
    records: Mutex<Vec<MutationRecord>>,
    scheduled: AtomicBool,
    targets: Mutex<Vec<WeakNode>>,
}

impl ObserverInner {
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    fn enqueue(self: &Arc<Self>, record: MutationRecord) {
        self.records.lock().push(record);
        if !self.scheduled.swap(true, Ordering::SeqCst) {
            let weak = Arc::downgrade(self);
            Runtime::queue_microtask(move || {
                if let Some(observer) = weak.upgrade() {
                    observer.deliver();
                }
                Ok(())
            });
        }
    }

    fn deliver(&self) {
        self.scheduled.store(false, Ordering::SeqCst);
        let records = std::mem::take(&mut *self.records.lock());
        if !records.is_empty() {
            tracing::trace!(observer = self.id, records = records.len(), "delivering mutations");
            (self.callback)(records);
        }
    }
}

/// Watches node subtrees for child list changes.
#[derive(Clone)]
pub struct MutationObserver {
    inner: Arc<ObserverInner>,
}

impl MutationObserver {
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(Vec<MutationRecord>) + Send + Sync + 'static,
    {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self {
            inner: Arc::new(ObserverInner {
                id: COUNTER.fetch_add(1, Ordering::Relaxed),
                callback: Box::new(callback),
                records: Mutex::new(Vec::new()),
                scheduled: AtomicBool::new(false),
                targets: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Start watching `node` and everything below it.
    pub fn observe(&self, node: &Node) {
        let mut targets = self.inner.targets.lock();
        if targets
            .iter()
            .any(|t| t.upgrade().is_some_and(|t| t == *node))
        {
            return;
        }
        targets.push(node.downgrade());
        drop(targets);
        node.add_observer(Arc::downgrade(&self.inner));
    }

    /// Stop watching every node and drop undelivered records.
    pub fn disconnect(&self) {
        let targets = std::mem::take(&mut *self.inner.targets.lock());
        for target in targets.iter().filter_map(WeakNode::upgrade) {
            target.remove_observer(self.inner.id);
        }
        self.inner.records.lock().clear();
    }

    /// Take the undelivered records, leaving none for the callback.
    pub fn take_records(&self) -> Vec<MutationRecord> {
        std::mem::take(&mut *self.inner.records.lock())
    }
}

impl fmt::Debug for MutationObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutationObserver")
            .field("id", &self.inner.id)
            .field("pending", &self.inner.records.lock().len())
            .finish()
    }
}

/// Record a child list change on `target` for every observer watching it.
pub(crate) fn record(
    target: &Node,
    added_nodes: SmallVec<[Node; 1]>,
    removed_nodes: SmallVec<[Node; 1]>,
) {
    let mut observers: IndexMap<u64, Arc<ObserverInner>> = IndexMap::new();
    let mut current = Some(target.clone());
    while let Some(node) = current {
        for observer in node.observers().iter().filter_map(Weak::upgrade) {
            observers.entry(observer.id).or_insert(observer);
        }
        current = node.parent();
    }

    for observer in observers.values() {
        observer.enqueue(MutationRecord {
            target: target.clone(),
            added_nodes: added_nodes.clone(),
            removed_nodes: removed_nodes.clone(),
        });
    }
}

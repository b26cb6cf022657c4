//! Keyed List Reconciliation
//!
//! Maps list items to the nodes rendered for them, keyed by item
//! [`Identity`]. Each update:
//!
//! 1. Detaches the node of every item no longer in the list, and forgets it.
//! 2. Walks the new list in order. Unknown items are rendered; known items
//!    have their existing node appended again, which moves it to the end.
//!
//! After the walk the parent holds the nodes in list order. This costs one
//! append per surviving item whether or not it moved, instead of computing a
//! minimal set of moves. Nodes are never reused across identities: an item
//! that is replaced (rather than edited through its field signals) gets a
//! new node.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::host::Node;
use crate::reactive::{HasIdentity, Identity};

/// What one reconcile pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Items rendered for the first time.
    pub created: usize,
    /// Nodes detached because their item left the list.
    pub removed: usize,
    /// Existing nodes appended again.
    pub moved: usize,
}

/// Identity to node mapping for one list binding.
#[derive(Debug, Default)]
pub struct Reconciler {
    nodes: IndexMap<Identity, Node>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node currently rendered for `identity`.
    pub fn node(&self, identity: Identity) -> Option<&Node> {
        self.nodes.get(&identity)
    }

    /// Bring `parent`'s list nodes in line with `items`.
    ///
    /// `render` is called for unknown items with the item and its index and
    /// must return the node it attached under `parent`.
    pub fn reconcile<T, R>(&mut self, parent: &Node, items: &[T], mut render: R) -> ReconcileStats
    where
        T: HasIdentity,
        R: FnMut(&T, usize) -> Node,
    {
        let mut stats = ReconcileStats::default();

        let present: HashSet<Identity> = items.iter().map(HasIdentity::identity).collect();
        let gone: Vec<Identity> = self
            .nodes
            .keys()
            .filter(|identity| !present.contains(identity))
            .copied()
            .collect();
        for identity in gone {
            if let Some(node) = self.nodes.shift_remove(&identity) {
                node.remove();
                stats.removed += 1;
            }
        }

        for (index, item) in items.iter().enumerate() {
            let identity = item.identity();
            match self.nodes.get(&identity) {
                Some(node) => {
                    if let Err(err) = parent.append_child(node) {
                        tracing::warn!(%err, "failed to reposition list node");
                    }
                    stats.moved += 1;
                }
                None => {
                    let node = render(item, index);
                    self.nodes.insert(identity, node);
                    stats.created += 1;
                }
            }
        }

        tracing::trace!(
            created = stats.created,
            removed = stats.removed,
            moved = stats.moved,
            "reconciled list"
        );
        stats
    }
}

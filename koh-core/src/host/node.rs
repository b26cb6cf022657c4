//! Host Nodes
//!
//! An in-memory node tree standing in for the platform DOM. It provides
//! exactly what the component layer relies on:
//!
//! - appending a node that already has a parent moves it (remove, then
//!   insert), which is how the list reconciler reorders
//! - connected/disconnected notifications for nodes carrying
//!   [`LifecycleHooks`], fired synchronously when they enter or leave the
//!   document, parents before children
//! - mutation records for every child list change, delivered to observers
//!   registered on the changed node or any of its ancestors
//!
//! Locks are never held while hooks, listeners or observers run.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::RwLock;
use smallvec::smallvec;

use super::observer::{self, ObserverInner};
use crate::error::{KohError, Result};

/// Unique identifier for a host node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// The kind of a host node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Root of a document. Always connected.
    Document,
    /// An element with a tag name.
    Element(String),
    /// A text leaf.
    Text,
}

/// Callbacks for nodes that react to entering and leaving the document.
pub trait LifecycleHooks: Send + Sync {
    /// The node became connected to a document.
    fn connected(&self, node: &Node);

    /// The node stopped being connected to a document.
    fn disconnected(&self, node: &Node);
}

type Listener = Arc<dyn Fn(&Node) + Send + Sync>;

struct NodeState {
    parent: Option<Weak<NodeInner>>,
    children: Vec<Node>,
    text: String,
    attributes: IndexMap<String, String>,
    listeners: IndexMap<String, Vec<Listener>>,
    lifecycle: Option<Arc<dyn LifecycleHooks>>,
    /// Observers watching this node's subtree.
    observers: Vec<Weak<ObserverInner>>,
}

pub(crate) struct NodeInner {
    id: NodeId,
    kind: NodeKind,
    state: RwLock<NodeState>,
}

/// Handle to a host node. Clones point at the same node.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

/// Non-owning handle to a host node.
#[derive(Clone)]
pub struct WeakNode {
    inner: Weak<NodeInner>,
}

impl WeakNode {
    /// Get the node back if it is still alive.
    pub fn upgrade(&self) -> Option<Node> {
        self.inner.upgrade().map(|inner| Node { inner })
    }
}

impl Node {
    fn with_kind(kind: NodeKind, text: String) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id: NodeId::new(),
                kind,
                state: RwLock::new(NodeState {
                    parent: None,
                    children: Vec::new(),
                    text,
                    attributes: IndexMap::new(),
                    listeners: IndexMap::new(),
                    lifecycle: None,
                    observers: Vec::new(),
                }),
            }),
        }
    }

    /// Create a detached element.
    pub fn element(tag: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Element(tag.into()), String::new())
    }

    /// Create a detached text node.
    pub fn text(text: impl Into<String>) -> Self {
        Self::with_kind(NodeKind::Text, text.into())
    }

    pub(crate) fn document() -> Self {
        Self::with_kind(NodeKind::Document, String::new())
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    pub fn kind(&self) -> &NodeKind {
        &self.inner.kind
    }

    /// Tag name for elements.
    pub fn tag_name(&self) -> Option<&str> {
        match &self.inner.kind {
            NodeKind::Element(tag) => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ------------------------------------------------------------------
    // Tree queries
    // ------------------------------------------------------------------

    pub fn parent(&self) -> Option<Node> {
        self.inner
            .state
            .read()
            .parent
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|inner| Node { inner })
    }

    pub fn children(&self) -> Vec<Node> {
        self.inner.state.read().children.clone()
    }

    /// All nodes below this one, in document order.
    pub fn descendants(&self) -> Vec<Node> {
        let mut out = Vec::new();
        let mut stack: Vec<Node> = self.children().into_iter().rev().collect();
        while let Some(node) = stack.pop() {
            stack.extend(node.children().into_iter().rev());
            out.push(node);
        }
        out
    }

    /// Whether `other` is this node or one of its descendants.
    pub fn contains(&self, other: &Node) -> bool {
        let mut current = Some(other.clone());
        while let Some(node) = current {
            if node == *self {
                return true;
            }
            current = node.parent();
        }
        false
    }

    /// Whether the node is attached to a document.
    pub fn is_connected(&self) -> bool {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.inner.kind == NodeKind::Document {
                return true;
            }
            current = node.parent();
        }
        false
    }

    // ------------------------------------------------------------------
    // Tree mutation
    // ------------------------------------------------------------------

    /// Append `child` as the last child, moving it if it is attached
    /// elsewhere (or earlier in this node).
    pub fn append_child(&self, child: &Node) -> Result<()> {
        let allowed = !matches!(self.inner.kind, NodeKind::Text)
            && child.inner.kind != NodeKind::Document
            && !child.contains(self);
        if !allowed {
            return Err(KohError::HierarchyRequest {
                parent: self.id(),
                child: child.id(),
            });
        }

        self.insert(child);
        Ok(())
    }

    /// Append without validating the hierarchy.
    pub(crate) fn insert(&self, child: &Node) {
        child.detach();

        self.inner.state.write().children.push(child.clone());
        child.inner.state.write().parent = Some(Arc::downgrade(&self.inner));

        observer::record(self, smallvec![child.clone()], smallvec![]);
        if self.is_connected() {
            fire_connected(child);
        }
    }

    /// Detach the node from its parent. No-op for detached nodes.
    pub fn remove(&self) {
        self.detach();
    }

    fn detach(&self) -> Option<Node> {
        let parent = self.parent()?;
        let was_connected = parent.is_connected();

        parent
            .inner
            .state
            .write()
            .children
            .retain(|node| node.id() != self.id());
        self.inner.state.write().parent = None;

        observer::record(&parent, smallvec![], smallvec![self.clone()]);
        if was_connected {
            fire_disconnected(self);
        }
        Some(parent)
    }

    /// Replace all children with the given text.
    pub fn set_text_content(&self, text: impl Into<String>) {
        for child in self.children() {
            child.remove();
        }
        self.inner.state.write().text = text.into();
    }

    /// This node's text followed by the text of its descendants.
    pub fn text_content(&self) -> String {
        let (mut text, children) = {
            let state = self.inner.state.read();
            (state.text.clone(), state.children.clone())
        };
        for child in children {
            text.push_str(&child.text_content());
        }
        text
    }

    // ------------------------------------------------------------------
    // Attributes and events
    // ------------------------------------------------------------------

    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<String>) {
        self.inner
            .state
            .write()
            .attributes
            .insert(name.into(), value.into());
    }

    pub fn attribute(&self, name: &str) -> Option<String> {
        self.inner.state.read().attributes.get(name).cloned()
    }

    pub fn remove_attribute(&self, name: &str) {
        self.inner.state.write().attributes.shift_remove(name);
    }

    pub fn set_class_name(&self, class: impl Into<String>) {
        self.set_attribute("class", class);
    }

    pub fn class_name(&self) -> String {
        self.attribute("class").unwrap_or_default()
    }

    /// Add a listener for `event`.
    pub fn on<F>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(&Node) + Send + Sync + 'static,
    {
        self.inner
            .state
            .write()
            .listeners
            .entry(event.into())
            .or_default()
            .push(Arc::new(listener));
    }

    /// Call every listener for `event` on this node, in registration order.
    pub fn dispatch(&self, event: &str) {
        let listeners = self
            .inner
            .state
            .read()
            .listeners
            .get(event)
            .cloned()
            .unwrap_or_default();
        for listener in listeners {
            listener(self);
        }
    }

    // ------------------------------------------------------------------
    // Hooks
    // ------------------------------------------------------------------

    /// Attach lifecycle hooks, replacing any previous ones.
    pub fn set_lifecycle(&self, hooks: Arc<dyn LifecycleHooks>) {
        self.inner.state.write().lifecycle = Some(hooks);
    }

    fn lifecycle(&self) -> Option<Arc<dyn LifecycleHooks>> {
        self.inner.state.read().lifecycle.clone()
    }

    pub(crate) fn add_observer(&self, observer: Weak<ObserverInner>) {
        self.inner.state.write().observers.push(observer);
    }

    pub(crate) fn remove_observer(&self, observer_id: u64) {
        self.inner
            .state
            .write()
            .observers
            .retain(|o| o.upgrade().is_some_and(|o| o.id() != observer_id));
    }

    pub(crate) fn observers(&self) -> Vec<Weak<ObserverInner>> {
        self.inner.state.read().observers.clone()
    }
}

/// Hooks of `root` and its descendants, parents first.
fn hooked_subtree(root: &Node) -> Vec<(Node, Arc<dyn LifecycleHooks>)> {
    std::iter::once(root.clone())
        .chain(root.descendants())
        .filter_map(|node| node.lifecycle().map(|hooks| (node, hooks)))
        .collect()
}

fn fire_connected(root: &Node) {
    for (node, hooks) in hooked_subtree(root) {
        // An earlier hook may have moved this node out again.
        if node.is_connected() {
            hooks.connected(&node);
        }
    }
}

fn fire_disconnected(root: &Node) {
    for (node, hooks) in hooked_subtree(root) {
        if !node.is_connected() {
            hooks.disconnected(&node);
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Node");
        debug.field("id", &self.id().raw()).field("kind", self.kind());
        let state = self.inner.state.read();
        if !state.text.is_empty() {
            debug.field("text", &state.text);
        }
        debug.field("children", &state.children.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Document;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingHooks {
        connected: AtomicUsize,
        disconnected: AtomicUsize,
    }

    impl LifecycleHooks for CountingHooks {
        fn connected(&self, _node: &Node) {
            self.connected.fetch_add(1, Ordering::SeqCst);
        }

        fn disconnected(&self, _node: &Node) {
            self.disconnected.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn node_ids_are_unique() {
        assert_ne!(Node::element("div").id(), Node::element("div").id());
    }

    #[test]
    fn append_moves_an_attached_node() {
        let list = Node::element("ul");
        let (a, b) = (Node::element("li"), Node::element("li"));
        list.append_child(&a).unwrap();
        list.append_child(&b).unwrap();

        list.append_child(&a).unwrap();
        assert_eq!(list.children(), vec![b.clone(), a.clone()]);
        assert_eq!(a.parent(), Some(list));
    }

    #[test]
    fn cycles_are_rejected() {
        let outer = Node::element("div");
        let inner = Node::element("div");
        outer.append_child(&inner).unwrap();

        let err = inner.append_child(&outer).unwrap_err();
        assert!(matches!(err, KohError::HierarchyRequest { .. }));
        assert!(outer.append_child(&outer).is_err());
    }

    #[test]
    fn connection_follows_the_document() {
        let doc = Document::new();
        let div = Node::element("div");
        let span = Node::element("span");
        div.append_child(&span).unwrap();

        assert!(!span.is_connected());
        doc.body().append_child(&div).unwrap();
        assert!(span.is_connected());

        div.remove();
        assert!(!span.is_connected());
        assert!(div.parent().is_none());
    }

    #[test]
    fn hooks_fire_on_document_transitions_only() {
        let doc = Document::new();
        let hooks = Arc::new(CountingHooks::default());
        let host = Node::element("koh-component");
        host.set_lifecycle(hooks.clone());

        let detached = Node::element("div");
        detached.append_child(&host).unwrap();
        assert_eq!(hooks.connected.load(Ordering::SeqCst), 0);

        doc.body().append_child(&detached).unwrap();
        assert_eq!(hooks.connected.load(Ordering::SeqCst), 1);

        // A move inside the document disconnects and reconnects.
        doc.body().append_child(&host).unwrap();
        assert_eq!(hooks.disconnected.load(Ordering::SeqCst), 1);
        assert_eq!(hooks.connected.load(Ordering::SeqCst), 2);

        host.remove();
        assert_eq!(hooks.disconnected.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn text_content_replaces_children() {
        let p = Node::element("p");
        p.append_child(&Node::text("old")).unwrap();
        assert_eq!(p.text_content(), "old");

        p.set_text_content("new");
        assert!(p.children().is_empty());
        assert_eq!(p.text_content(), "new");
    }

    #[test]
    fn listeners_receive_the_node() {
        let button = Node::element("button");
        let clicks = Arc::new(AtomicUsize::new(0));
        let clicks_clone = clicks.clone();
        button.on("click", move |node| {
            assert_eq!(node.tag_name(), Some("button"));
            clicks_clone.fetch_add(1, Ordering::SeqCst);
        });

        button.dispatch("click");
        button.dispatch("click");
        button.dispatch("hover");
        assert_eq!(clicks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn attributes_can_be_removed() {
        let input = Node::element("input");
        input.set_attribute("disabled", "");
        input.set_class_name("qty");
        assert_eq!(input.attribute("disabled").as_deref(), Some(""));

        input.remove_attribute("disabled");
        input.remove_attribute("missing");
        assert_eq!(input.attribute("disabled"), None);
        assert_eq!(input.class_name(), "qty");
    }

    #[test]
    fn descendants_are_in_document_order() {
        let root = Node::element("div");
        let a = Node::element("a");
        let b = Node::element("b");
        let c = Node::element("i");
        root.append_child(&a).unwrap();
        a.append_child(&b).unwrap();
        root.append_child(&c).unwrap();

        assert_eq!(root.descendants(), vec![a, b, c]);
    }
}

//! Components
//!
//! A component is a setup function run against a [`Component`] handle when
//! its host element first enters the document. The handle creates state,
//! binds reactive output to nodes and registers teardowns, all scoped to the
//! instance: when the instance is removed for good, everything it registered
//! is released (the `lifecycle` module describes how removal is told
//! apart from a move).
//!
//! ```rust,ignore
//! let counter = koh(|k: &Component, start: &i32, _children: &[Child]| {
//!     let count = k.state(*start);
//!     k.html(children![
//!         p(children![k.watch(&count, |el, n| el.set_text_content(format!("Count: {n}")))]),
//!         button(children![
//!             "+1",
//!             Child::bind(cloned!(count => move |el| {
//!                 let count = count.clone();
//!                 el.on("click", move |_| { count.update(|n| n + 1); });
//!             })),
//!         ]),
//!     ]);
//! });
//!
//! mount(&document, "app", &counter.create(0, vec![]))?;
//! ```

mod lifecycle;
mod mount;
mod reconcile;
mod tags;

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

pub use lifecycle::LifecycleState;
pub use mount::{mount, parse_module};
pub use reconcile::{ReconcileStats, Reconciler};
pub use tags::*;

use self::lifecycle::{ComponentHooks, ComponentInner};
use crate::host::Node;
use crate::reactive::{self, Derived, HasIdentity, ReactiveContext, SameValue, Signal};

/// Tag of the host element every component instance lives on.
pub const COMPONENT_TAG: &str = "koh-component";

type SetupFn<P> = dyn Fn(&Component, &P, &[Child]) + Send + Sync;

/// Creates component instances from one setup function.
pub struct ComponentFactory<P> {
    setup: Arc<SetupFn<P>>,
}

/// Define a component.
pub fn koh<P, F>(setup: F) -> ComponentFactory<P>
where
    P: Send + Sync + 'static,
    F: Fn(&Component, &P, &[Child]) + Send + Sync + 'static,
{
    ComponentFactory {
        setup: Arc::new(setup),
    }
}

impl<P> ComponentFactory<P>
where
    P: Send + Sync + 'static,
{
    /// Create one instance and return the binder that attaches it.
    ///
    /// The instance is created here, not per attach: binding the result
    /// twice moves the same instance.
    pub fn create(&self, props: P, children: Vec<Child>) -> Child {
        let element = Node::element(COMPONENT_TAG);
        let setup = Arc::clone(&self.setup);
        let inner = Arc::new(ComponentInner::new(
            element.downgrade(),
            Box::new(move |component: &Component| setup(component, &props, &children)),
        ));
        element.set_lifecycle(Arc::new(ComponentHooks { inner }));

        Child::bind(move |parent| {
            if let Err(err) = parent.append_child(&element) {
                tracing::warn!(%err, "failed to attach component");
            }
        })
    }
}

impl<P> Clone for ComponentFactory<P> {
    fn clone(&self) -> Self {
        Self {
            setup: Arc::clone(&self.setup),
        }
    }
}

/// Handle to one component instance, passed to its setup function.
#[derive(Clone)]
pub struct Component {
    inner: Arc<ComponentInner>,
}

impl Component {
    /// Create a signal.
    pub fn state<T>(&self, initial: T) -> Signal<T>
    where
        T: SameValue + Send + Sync + 'static,
    {
        Signal::new(initial)
    }

    /// Bind `handler` to the node this child is attached under.
    ///
    /// The handler runs immediately and again whenever a signal it read
    /// changes. The binding is released when that node leaves the component
    /// or the component is torn down.
    pub fn watch<S, F>(&self, signal: &Signal<S>, handler: F) -> Child
    where
        S: SameValue + Clone + Send + Sync + 'static,
        F: Fn(&Node, S) + Send + Sync + 'static,
    {
        let binder = reactive::watch(signal, handler);
        let scope = Arc::downgrade(&self.inner);
        Child::bind(move |target: &Node| {
            let effect = binder.bind(target);
            match scope.upgrade() {
                Some(inner) => {
                    inner.register_cleanup(target.id(), Box::new(move || effect.dispose()))
                }
                None => effect.dispose(),
            }
        })
    }

    /// Create a derived signal released with the component.
    pub fn compute<T, F>(&self, f: F) -> Derived<T>
    where
        T: SameValue + Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let derived = reactive::compute(f);
        let effect = derived.effect().clone();
        self.inner
            .add_unsubscribe(Box::new(move || effect.dispose()));
        derived
    }

    /// Render one node per item of `list` under the attach point, keyed by
    /// item identity.
    ///
    /// `render` receives the item and its index at first render; it is not
    /// called again for items that only move.
    pub fn for_each<T, F>(&self, list: &Signal<Vec<T>>, render: F) -> Child
    where
        T: HasIdentity + SameValue + Clone + Send + Sync + 'static,
        F: Fn(&T, usize) -> ElementBuilder + Send + Sync + 'static,
    {
        let reconciler = Arc::new(Mutex::new(Reconciler::new()));
        self.watch(list, move |root, items| {
            reconciler
                .lock()
                .reconcile(root, &items, |item, index| {
                    ReactiveContext::untracked(|| render(item, index).build(root))
                });
        })
    }

    /// Attach children to the component element.
    pub fn html(&self, children: impl IntoIterator<Item = Child>) {
        let Some(element) = self.inner.element() else {
            return;
        };
        for child in children {
            child.attach(&element);
        }
    }

    /// Run `f` when the component is torn down.
    pub fn on_cleanup<F>(&self, f: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.inner.add_unsubscribe(Box::new(f));
    }

    /// The component's host element, while it exists.
    pub fn element(&self) -> Option<Node> {
        self.inner.element()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.inner.state()
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.is_initialized()
    }

    /// Number of teardowns waiting for removal.
    pub fn registered_teardowns(&self) -> usize {
        self.inner.registered_teardowns()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("state", &self.lifecycle_state())
            .field("teardowns", &self.registered_teardowns())
            .finish()
    }
}

//! Element builders.
//!
//! Everything that produces output shares one shape: something that can be
//! attached under a parent node. [`Child`] is that shape; tag constructors,
//! watch bindings, list bindings and component instances all produce one.

use std::fmt;
use std::sync::Arc;

use crate::host::Node;

/// Attaches output under a parent node.
pub type Binder = Arc<dyn Fn(&Node) + Send + Sync>;

/// A child of an element: literal text or a binder.
#[derive(Clone)]
pub enum Child {
    Text(String),
    Bind(Binder),
}

impl Child {
    /// Wrap a closure as a binder child.
    pub fn bind<F>(f: F) -> Self
    where
        F: Fn(&Node) + Send + Sync + 'static,
    {
        Child::Bind(Arc::new(f))
    }

    /// Attach this child under `parent`.
    pub fn attach(&self, parent: &Node) {
        match self {
            Child::Text(text) => {
                if let Err(err) = parent.append_child(&Node::text(text.clone())) {
                    tracing::warn!(%err, "failed to attach text");
                }
            }
            Child::Bind(binder) => binder(parent),
        }
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<ElementBuilder> for Child {
    fn from(builder: ElementBuilder) -> Self {
        Child::bind(move |parent| {
            builder.build(parent);
        })
    }
}

impl fmt::Debug for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Child::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Child::Bind(_) => f.write_str("Bind(..)"),
        }
    }
}

/// An element waiting for a parent.
#[derive(Clone, Debug)]
pub struct ElementBuilder {
    tag: String,
    children: Vec<Child>,
}

impl ElementBuilder {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            children: Vec::new(),
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn child(mut self, child: impl Into<Child>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Child>) -> Self {
        self.children.extend(children);
        self
    }

    /// Create the element, attach its children to it, then append it to
    /// `parent`. Returns the new element.
    pub fn build(&self, parent: &Node) -> Node {
        let element = Node::element(self.tag.clone());
        for child in &self.children {
            child.attach(&element);
        }
        if let Err(err) = parent.append_child(&element) {
            tracing::warn!(%err, tag = %self.tag, "failed to attach element");
        }
        element
    }
}

macro_rules! tags {
    ($($tag:ident),* $(,)?) => {
        $(
            #[doc = concat!("A `<", stringify!($tag), ">` element.")]
            pub fn $tag(children: impl IntoIterator<Item = Child>) -> ElementBuilder {
                ElementBuilder::new(stringify!($tag)).children(children)
            }
        )*
    };
}

tags!(
    a, abbr, address, article, aside, audio, b, blockquote, br, button, canvas, caption, cite,
    code, dd, del, details, dialog, div, dl, dt, em, fieldset, figcaption, figure, footer, form,
    h1, h2, h3, h4, h5, h6, header, hr, i, img, input, ins, kbd, label, legend, li, main, mark,
    nav, ol, optgroup, option, output, p, picture, pre, progress, q, s, script, section, select,
    slot, small, span, strong, sub, summary, sup, table, tbody, td, template, textarea, tfoot, th,
    thead, time, tr, u, ul, video,
);

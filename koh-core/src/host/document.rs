//! The document root.

use super::node::Node;

/// A document: a root node with a `body` element below it.
///
/// Anything appended under the body is connected.
#[derive(Clone, Debug)]
pub struct Document {
    root: Node,
    body: Node,
}

impl Document {
    pub fn new() -> Self {
        let root = Node::document();
        let body = Node::element("body");
        root.insert(&body);
        Self { root, body }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn body(&self) -> &Node {
        &self.body
    }

    pub fn create_element(&self, tag: impl Into<String>) -> Node {
        Node::element(tag)
    }

    pub fn create_text(&self, text: impl Into<String>) -> Node {
        Node::text(text)
    }

    /// The first connected element whose `id` attribute is `id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<Node> {
        self.root
            .descendants()
            .into_iter()
            .find(|node| node.attribute("id").as_deref() == Some(id))
    }

    /// Connected elements with the given tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<Node> {
        self.root
            .descendants()
            .into_iter()
            .filter(|node| node.tag_name() == Some(tag))
            .collect()
    }

    /// `<script>` elements whose `type` attribute is `script_type`.
    pub fn scripts_of_type(&self, script_type: &str) -> Vec<Node> {
        self.elements_by_tag("script")
            .into_iter()
            .filter(|node| node.attribute("type").as_deref() == Some(script_type))
            .collect()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

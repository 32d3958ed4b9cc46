use crate::dom::{Dom, NodeId};

/// Contract every results-panel element offers its host
pub trait ResultsElement {
    /// Machine name of the element type
    fn type_name(&self) -> &'static str;

    /// Human readable label
    fn label(&self) -> &'static str;

    /// Root node the element renders into
    fn root(&self) -> NodeId;

    /// Insert a newly created content container into the root
    fn add_content(&self, dom: &mut Dom, content: NodeId);
}

/// Root element plumbing shared by concrete result elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementBase {
    root: NodeId,
}

impl ElementBase {
    /// Create a detached `<div>` root carrying `class`. The host attaches it
    /// wherever the results panel wants it.
    pub fn new(dom: &mut Dom, class: &str) -> Self {
        let root = dom.create_element("div");
        dom.add_class(root, class);
        Self { root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn add_content(&self, dom: &mut Dom, content: NodeId) {
        dom.append_child(self.root, content);
    }

    /// Destroy the root and everything rendered under it
    pub fn remove(&self, dom: &mut Dom) -> usize {
        dom.remove(self.root)
    }
}

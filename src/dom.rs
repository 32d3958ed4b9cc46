//! Arena DOM used as the render target of result views.
//!
//! Fragments are parsed with html5ever, so malformed markup is repaired the
//! way a browser repairs it. Serialization follows the HTML fragment
//! serialization algorithm, which means already-normalized markup
//! (lowercase tags, double-quoted attributes, explicit end tags) comes back
//! byte for byte.
//!
//! Click dispatch bubbles from the target up through its ancestors. When no
//! listener prevents the default action and the click landed inside an
//! `<a href>`, the navigation the browser would have performed is recorded
//! instead of executed.

use html5ever::parse_fragment;
use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::fmt;
use std::sync::Arc;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Default-action navigations kept for inspection, oldest dropped first.
pub const MAX_RECORDED_NAVIGATIONS: usize = 64;

/// Elements whose text children are serialized without escaping.
const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext", "noscript",
];

/// Handle to a node. Slots are reused once a node is removed; the
/// generation keeps a stale handle from reaching the slot's new occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    index: usize,
    generation: u32,
}

impl NodeId {
    pub fn index(self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

pub type ClickListener = Arc<dyn Fn(&mut Dom, &mut ClickEvent) + Send + Sync>;

/// A click travelling from its target up to the outermost ancestor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    target: NodeId,
    current_target: NodeId,
    default_prevented: bool,
    propagation_stopped: bool,
}

impl ClickEvent {
    fn new(target: NodeId) -> Self {
        Self {
            target,
            current_target: target,
            default_prevented: false,
            propagation_stopped: false,
        }
    }

    /// Node the click originated on
    pub fn target(&self) -> NodeId {
        self.target
    }

    /// Node whose listener is currently running
    pub fn current_target(&self) -> NodeId {
        self.current_target
    }

    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub listeners_run: usize,
    pub default_prevented: bool,
    /// Link the browser followed because nothing prevented it
    pub navigated_to: Option<String>,
}

struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    listeners: Vec<(ListenerId, ClickListener)>,
}

struct Slot {
    generation: u32,
    node: Option<Node>,
}

#[derive(Default)]
pub struct Dom {
    slots: Vec<Slot>,
    free: Vec<usize>,
    live: usize,
    next_listener: u64,
    navigations: Vec<String>,
}

impl fmt::Debug for Dom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dom")
            .field("live_nodes", &self.len())
            .field("navigations", &self.navigations)
            .finish()
    }
}

impl Dom {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Node lifecycle ─────────────────────────────────────────────────────

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        let node = Node {
            kind,
            parent: None,
            children: Vec::new(),
            listeners: Vec::new(),
        };
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.node = Some(node);
            return NodeId {
                index,
                generation: slot.generation,
            };
        }
        self.slots.push(Slot {
            generation: 0,
            node: Some(node),
        });
        NodeId {
            index: self.slots.len() - 1,
            generation: 0,
        }
    }

    /// Empty a slot and queue it for reuse
    fn release(&mut self, id: NodeId) -> Option<Node> {
        let slot = self
            .slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.live -= 1;
        Some(node)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.insert(NodeKind::Element {
            tag: tag.to_ascii_lowercase(),
            attributes: Vec::new(),
        })
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.insert(NodeKind::Text(text.into()))
    }

    /// Whether the node is still alive (not removed)
    pub fn contains(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Number of live nodes, attached or not
    pub fn len(&self) -> usize {
        self.live
    }

    /// Slots allocated so far, live or waiting for reuse
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|n| &n.kind)
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.tag_name(id).is_some()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// The node followed by each of its ancestors, innermost first
    pub fn ancestors_inclusive(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.contains(id).then_some(id);
        while let Some(node) = current {
            out.push(node);
            current = self.parent(node);
        }
        out
    }

    /// Move `child` to the end of `parent`'s children. Ignored when either
    /// node is gone or the move would create a cycle.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        if self.ancestors_inclusive(parent).contains(&child) {
            return;
        }
        self.detach(child);
        self.attach_new(parent, child);
    }

    fn attach_new(&mut self, parent: NodeId, child: NodeId) {
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    /// Unlink a node from its parent, keeping it alive
    pub fn detach(&mut self, id: NodeId) {
        let parent = match self.parent(id) {
            Some(p) => p,
            None => return,
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|c| *c != id);
        }
        if let Some(node) = self.node_mut(id) {
            node.parent = None;
        }
    }

    /// Detach and destroy a subtree, dropping every listener bound inside it.
    /// Returns the number of nodes destroyed.
    pub fn remove(&mut self, id: NodeId) -> usize {
        self.detach(id);
        let mut removed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.release(next) {
                stack.extend(node.children);
                removed += 1;
            }
        }
        removed
    }

    /// Detach all children of a node and hand them back, still alive
    pub fn take_children(&mut self, id: NodeId) -> Vec<NodeId> {
        let children = match self.node_mut(id) {
            Some(node) => std::mem::take(&mut node.children),
            None => return Vec::new(),
        };
        for child in &children {
            if let Some(node) = self.node_mut(*child) {
                node.parent = None;
            }
        }
        children
    }

    /// Destroy all children of a node
    pub fn clear_children(&mut self, id: NodeId) -> usize {
        let children = self.take_children(id);
        children.into_iter().map(|c| self.remove(c)).sum()
    }

    // ─── Attributes ─────────────────────────────────────────────────────────

    fn attributes_mut(&mut self, id: NodeId) -> Option<&mut Vec<(String, String)>> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Element { attributes, .. } => Some(attributes),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(attributes) = self.attributes_mut(id) {
            let value = value.into();
            match attributes.iter_mut().find(|(key, _)| key == name) {
                Some(slot) => slot.1 = value,
                None => attributes.push((name.to_string(), value)),
            }
        }
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> bool {
        match self.attributes_mut(id) {
            Some(attributes) => {
                let before = attributes.len();
                attributes.retain(|(key, _)| key != name);
                attributes.len() != before
            }
            None => false,
        }
    }

    pub fn classes<'a>(&'a self, id: NodeId) -> impl Iterator<Item = &'a str> + 'a {
        self.attribute(id, "class")
            .unwrap_or("")
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.classes(id).any(|c| c == class)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if !self.is_element(id) || self.has_class(id, class) {
            return;
        }
        let mut value = self.attribute(id, "class").unwrap_or("").trim().to_string();
        if !value.is_empty() {
            value.push(' ');
        }
        value.push_str(class);
        self.set_attribute(id, "class", value);
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) {
        if !self.has_class(id, class) {
            return;
        }
        let remaining = self
            .classes(id)
            .filter(|c| *c != class)
            .collect::<Vec<_>>()
            .join(" ");
        if remaining.is_empty() {
            self.remove_attribute(id, "class");
        } else {
            self.set_attribute(id, "class", remaining);
        }
    }

    /// Flip a class token. Returns whether the class is present afterwards.
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> bool {
        if self.has_class(id, class) {
            self.remove_class(id, class);
            false
        } else {
            self.add_class(id, class);
            self.has_class(id, class)
        }
    }

    // ─── Queries ────────────────────────────────────────────────────────────

    /// All nodes below `id` in document order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    pub fn find_by_class(&self, root: NodeId, class: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|n| self.has_class(*n, class))
            .collect()
    }

    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|n| self.tag_name(*n).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    /// Elements named `tag` below `root` that carry attribute `name`
    pub fn find_with_attribute(&self, root: NodeId, tag: &str, name: &str) -> Vec<NodeId> {
        self.find_by_tag(root, tag)
            .into_iter()
            .filter(|n| self.has_attribute(*n, name))
            .collect()
    }

    /// Nearest ancestor-or-self matching the predicate
    pub fn closest(&self, id: NodeId, predicate: impl Fn(&Dom, NodeId) -> bool) -> Option<NodeId> {
        self.ancestors_inclusive(id)
            .into_iter()
            .find(|n| predicate(self, *n))
    }

    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let Some(NodeKind::Text(text)) = self.kind(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let Some(NodeKind::Text(text)) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    // ─── Markup ─────────────────────────────────────────────────────────────

    /// Replace the children of `id` with the parsed fragment. Returns the new
    /// top-level children.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }
        self.clear_children(id);

        // Parsed in the context of a `<div>`; the fragment ends up under a
        // synthetic `<html>` element.
        let context = QualName::new(
            None,
            Namespace::from(HTML_NAMESPACE),
            LocalName::from("div"),
        );
        // Handles must be imported while `parsed` is alive: dropping the
        // document empties every descendant's child list.
        let parsed = parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new())
            .one(html);
        let fragment_root = match find_element(&parsed.document, "html") {
            Some(root) => root,
            None => return Vec::new(),
        };
        let handles: Vec<Handle> = fragment_root.children.borrow().iter().cloned().collect();

        let mut created = Vec::with_capacity(handles.len());
        for handle in &handles {
            if let Some(child) = self.import_handle(handle) {
                self.attach_new(id, child);
                created.push(child);
            }
        }
        created
    }

    fn import_handle(&mut self, handle: &Handle) -> Option<NodeId> {
        let (kind, children) = match &handle.data {
            NodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let tag = name.local.to_string();
                let attributes = attrs
                    .borrow()
                    .iter()
                    .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                    .collect();
                let children: Vec<Handle> = if tag == "template" {
                    template_contents
                        .borrow()
                        .as_ref()
                        .map(|contents| contents.children.borrow().clone())
                        .unwrap_or_default()
                } else {
                    handle.children.borrow().clone()
                };
                (NodeKind::Element { tag, attributes }, children)
            }
            NodeData::Text { contents } => (NodeKind::Text(contents.borrow().to_string()), Vec::new()),
            NodeData::Comment { contents } => (NodeKind::Comment(contents.to_string()), Vec::new()),
            _ => return None,
        };

        let id = self.insert(kind);
        for child in &children {
            if let Some(child_id) = self.import_handle(child) {
                self.attach_new(id, child_id);
            }
        }
        Some(id)
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(id) {
            self.serialize_into(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize_into(id, &mut out);
        out
    }

    fn serialize_into(&self, id: NodeId, out: &mut String) {
        let node = match self.node(id) {
            Some(node) => node,
            None => return,
        };
        match &node.kind {
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(tag);
                for (key, value) in attributes {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&escape_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in &node.children {
                    self.serialize_into(*child, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
            NodeKind::Text(text) => {
                let raw = node
                    .parent
                    .and_then(|p| self.tag_name(p))
                    .is_some_and(|t| RAW_TEXT_ELEMENTS.contains(&t));
                if raw {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
        }
    }

    // ─── Events ─────────────────────────────────────────────────────────────

    pub fn add_click_listener(&mut self, id: NodeId, listener: ClickListener) -> Option<ListenerId> {
        let listener_id = ListenerId(self.next_listener);
        let node = self.node_mut(id)?;
        node.listeners.push((listener_id, listener));
        self.next_listener += 1;
        Some(listener_id)
    }

    pub fn remove_click_listener(&mut self, id: NodeId, listener: ListenerId) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                let before = node.listeners.len();
                node.listeners.retain(|(lid, _)| *lid != listener);
                node.listeners.len() != before
            }
            None => false,
        }
    }

    pub fn listener_count(&self, id: NodeId) -> usize {
        self.node(id).map(|n| n.listeners.len()).unwrap_or(0)
    }

    /// Dispatch a click on `target`, bubbling to the outermost ancestor,
    /// then run the default action.
    pub fn click(&mut self, target: NodeId) -> DispatchOutcome {
        let mut event = ClickEvent::new(target);
        let mut listeners_run = 0;

        for node in self.ancestors_inclusive(target) {
            let listeners: Vec<ClickListener> = match self.node(node) {
                Some(n) => n.listeners.iter().map(|(_, l)| l.clone()).collect(),
                None => continue,
            };
            event.current_target = node;
            for listener in listeners {
                listener(self, &mut event);
                listeners_run += 1;
            }
            if event.propagation_stopped {
                break;
            }
        }

        let navigated_to = if event.default_prevented {
            None
        } else {
            self.closest(target, |dom, n| {
                dom.tag_name(n) == Some("a") && dom.has_attribute(n, "href")
            })
            .and_then(|a| self.attribute(a, "href"))
            .map(str::to_string)
        };
        if let Some(href) = &navigated_to {
            if self.navigations.len() == MAX_RECORDED_NAVIGATIONS {
                self.navigations.remove(0);
            }
            self.navigations.push(href.clone());
        }

        DispatchOutcome {
            listeners_run,
            default_prevented: event.default_prevented,
            navigated_to,
        }
    }

    /// The most recent links followed by a default click action, oldest first
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    pub fn take_navigations(&mut self) -> Vec<String> {
        std::mem::take(&mut self.navigations)
    }
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data {
        if name.local.as_ref() == tag {
            return Some(handle.clone());
        }
    }
    let children = handle.children.borrow();
    let found = children.iter().find_map(|child| find_element(child, tag));
    found
}

pub(crate) fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub(crate) fn escape_attribute(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('"', "&quot;")
}

//! In-Memory Renderer
//!
//! A node tree held in a map, indexed by node ID. Parents keep ordered
//! child lists and children keep a parent link, so every operation is a
//! lookup plus a splice.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::warn;

use super::{NodeKind, Renderer};

/// Unique identifier for a node in a [`MemoryRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A [`Renderer`] that builds a tree in memory.
#[derive(Debug, Default)]
pub struct MemoryRenderer {
    nodes: RefCell<HashMap<NodeId, Node>>,
}

impl MemoryRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Children of `parent`, in order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.nodes
            .borrow()
            .get(&parent)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    /// Children of `parent` that are not markers.
    pub fn visible_children(&self, parent: NodeId) -> Vec<NodeId> {
        let nodes = self.nodes.borrow();
        nodes
            .get(&parent)
            .map(|node| {
                node.children
                    .iter()
                    .copied()
                    .filter(|child| {
                        nodes
                            .get(child)
                            .is_some_and(|child| child.kind != NodeKind::Marker)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.borrow().get(&node).and_then(|node| node.parent)
    }

    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.nodes.borrow().get(&node).map(|node| node.kind.clone())
    }

    /// Check if `node` exists and has not been removed.
    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.borrow().contains_key(&node)
    }

    /// Number of live nodes, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.borrow().len()
    }

    /// Replace the content of a text node.
    pub fn set_text(&self, node: NodeId, content: impl Into<String>) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&node) {
            if let NodeKind::Text(text) = &mut node.kind {
                *text = content.into();
            }
        }
    }

    /// Concatenated text of `node` and its descendants.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.walk_text(node, &mut out);
        out
    }

    fn walk_text(&self, node: NodeId, out: &mut String) {
        let nodes = self.nodes.borrow();
        let Some(entry) = nodes.get(&node) else {
            return;
        };
        if let NodeKind::Text(text) = &entry.kind {
            out.push_str(text);
        }
        let children = entry.children.clone();
        drop(nodes);
        for child in children {
            self.walk_text(child, out);
        }
    }

    /// Serialize the subtree under `node` as markup. Markers render as
    /// empty comments.
    pub fn render_to_string(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_markup(node, &mut out);
        out
    }

    fn write_markup(&self, node: NodeId, out: &mut String) {
        let (kind, children) = {
            let nodes = self.nodes.borrow();
            let Some(entry) = nodes.get(&node) else {
                return;
            };
            (entry.kind.clone(), entry.children.clone())
        };

        match kind {
            NodeKind::Marker => out.push_str("<!---->"),
            NodeKind::Text(text) => escape_into(&text, out),
            NodeKind::Element(tag) => {
                out.push('<');
                out.push_str(&tag);
                out.push('>');
                for child in children {
                    self.write_markup(child, out);
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
        }
    }

    fn detach(nodes: &mut HashMap<NodeId, Node>, node: NodeId) {
        let parent = nodes.get_mut(&node).and_then(|entry| entry.parent.take());
        if let Some(parent) = parent.and_then(|parent| nodes.get_mut(&parent)) {
            parent.children.retain(|child| *child != node);
        }
    }

    fn drop_subtree(nodes: &mut HashMap<NodeId, Node>, node: NodeId) {
        if let Some(entry) = nodes.remove(&node) {
            for child in entry.children {
                Self::drop_subtree(nodes, child);
            }
        }
    }
}

fn escape_into(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

impl Renderer for MemoryRenderer {
    type Node = NodeId;

    fn create_node(&self, kind: NodeKind) -> NodeId {
        let id = NodeId::new();
        self.nodes.borrow_mut().insert(
            id,
            Node {
                kind,
                parent: None,
                children: Vec::new(),
            },
        );
        id
    }

    fn append_node(&self, parent: &NodeId, child: &NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if !nodes.contains_key(parent) || !nodes.contains_key(child) {
            warn!(?parent, ?child, "append_node on a removed node");
            return;
        }
        Self::detach(&mut nodes, *child);
        if let Some(entry) = nodes.get_mut(parent) {
            entry.children.push(*child);
        }
        if let Some(entry) = nodes.get_mut(child) {
            entry.parent = Some(*parent);
        }
    }

    fn insert_node(&self, anchor: &NodeId, node: &NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        if anchor == node || !nodes.contains_key(node) {
            return;
        }
        Self::detach(&mut nodes, *node);

        let Some(parent) = nodes.get(anchor).and_then(|entry| entry.parent) else {
            warn!(?anchor, "insert_node after a detached anchor");
            return;
        };
        if let Some(entry) = nodes.get_mut(&parent) {
            let position = entry
                .children
                .iter()
                .position(|child| child == anchor)
                .map_or(entry.children.len(), |position| position + 1);
            entry.children.insert(position, *node);
        }
        if let Some(entry) = nodes.get_mut(node) {
            entry.parent = Some(parent);
        }
    }

    fn remove_node(&self, node: &NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        Self::detach(&mut nodes, *node);
        Self::drop_subtree(&mut nodes, *node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_insert_keep_order() {
        let renderer = MemoryRenderer::new();
        let list = renderer.create_node(NodeKind::element("ul"));
        let a = renderer.create_node(NodeKind::text("a"));
        let b = renderer.create_node(NodeKind::text("b"));
        let c = renderer.create_node(NodeKind::text("c"));

        renderer.append_node(&list, &a);
        renderer.append_node(&list, &c);
        renderer.insert_node(&a, &b);

        assert_eq!(renderer.children(list), vec![a, b, c]);
        assert_eq!(renderer.parent(b), Some(list));
    }

    #[test]
    fn insert_moves_attached_nodes() {
        let renderer = MemoryRenderer::new();
        let list = renderer.create_node(NodeKind::element("ul"));
        let nodes: Vec<_> = ["a", "b", "c"]
            .into_iter()
            .map(|text| {
                let node = renderer.create_node(NodeKind::text(text));
                renderer.append_node(&list, &node);
                node
            })
            .collect();

        renderer.insert_node(&nodes[2], &nodes[0]);
        assert_eq!(renderer.children(list), vec![nodes[1], nodes[2], nodes[0]]);
        assert_eq!(renderer.node_count(), 4);
    }

    #[test]
    fn remove_drops_the_subtree() {
        let renderer = MemoryRenderer::new();
        let list = renderer.create_node(NodeKind::element("ul"));
        let item = renderer.create_node(NodeKind::element("li"));
        let text = renderer.create_node(NodeKind::text("x"));
        renderer.append_node(&list, &item);
        renderer.append_node(&item, &text);

        renderer.remove_node(&item);

        assert!(renderer.children(list).is_empty());
        assert!(!renderer.contains(item));
        assert!(!renderer.contains(text));
    }

    #[test]
    fn renders_markup() {
        let renderer = MemoryRenderer::new();
        let list = renderer.create_node(NodeKind::element("ul"));
        let marker = renderer.create_node(NodeKind::Marker);
        let item = renderer.create_node(NodeKind::element("li"));
        let text = renderer.create_node(NodeKind::text("a < b"));
        renderer.append_node(&list, &marker);
        renderer.append_node(&list, &item);
        renderer.append_node(&item, &text);

        assert_eq!(
            renderer.render_to_string(list),
            "<ul><!----><li>a &lt; b</li></ul>"
        );
        assert_eq!(renderer.text_content(list), "a < b");
        assert_eq!(renderer.visible_children(list), vec![item]);
    }
}

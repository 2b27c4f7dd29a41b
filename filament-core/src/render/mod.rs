//! Rendering Backends
//!
//! The reactive core touches an output medium only through the [`Renderer`]
//! trait. A backend (DOM bindings, a string builder, a widget toolkit)
//! implements four node operations and the keyed list reconciler drives them.
//!
//! [`MemoryRenderer`] is an in-memory node tree implementing the trait. It
//! backs the tests and doubles as a string renderer.

mod memory;

pub use memory::{MemoryRenderer, NodeId};

/// What a backend should create.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// An element with the given tag.
    Element(String),
    /// A text node.
    Text(String),
    /// An invisible position marker, such as a list's anchor.
    Marker,
}

impl NodeKind {
    pub fn element(tag: impl Into<String>) -> Self {
        Self::Element(tag.into())
    }

    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }
}

/// The node operations a rendering backend provides.
///
/// Operations take `&self`; backends use interior mutability where they
/// need it, since one renderer is shared by every reactive subscope.
pub trait Renderer {
    /// A handle to a backend node. Clones refer to the same node.
    type Node: Clone + PartialEq + std::fmt::Debug + 'static;

    /// Create a detached node.
    fn create_node(&self, kind: NodeKind) -> Self::Node;

    /// Append `child` as the last child of `parent`.
    fn append_node(&self, parent: &Self::Node, child: &Self::Node);

    /// Place `node` immediately after `anchor`, under `anchor`'s parent.
    ///
    /// If `node` is already attached it is moved, not copied.
    fn insert_node(&self, anchor: &Self::Node, node: &Self::Node);

    /// Detach `node` from its parent. The node is not used afterwards.
    fn remove_node(&self, node: &Self::Node);
}

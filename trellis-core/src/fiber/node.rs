//! Render Nodes
//!
//! This module defines the node record that lives in the node arena.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use smallvec::SmallVec;

use super::flags::{Flags, Lanes};
use crate::element::{Child, ElementType, Key, NodeRef, Props};
use crate::hooks::StateHook;
use crate::host::HostId;
use crate::update_queue::UpdateQueue;

/// Unique identifier for a render node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
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

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a render node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The root of a tree. Owns the root update queue.
    HostRoot,

    /// A host element such as `<div>`.
    HostElement,

    /// A host text node.
    HostText,

    /// A user component. Has no host instance; its children are whatever
    /// the component rendered.
    FunctionComponent,

    /// A grouping of children with no host instance.
    Fragment,
}

impl NodeKind {
    /// Kind of node that renders `element_type`.
    pub fn of(element_type: &ElementType) -> Self {
        match element_type {
            ElementType::Host(_) => Self::HostElement,
            ElementType::Component(_) => Self::FunctionComponent,
            ElementType::Fragment => Self::Fragment,
        }
    }

    /// Whether nodes of this kind own a host instance.
    pub fn is_host(&self) -> bool {
        matches!(self, Self::HostElement | Self::HostText)
    }
}

/// What a node's `state_node` points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateNode {
    #[default]
    None,
    /// Host instance of a host element or text node.
    Instance(HostId),
    /// Host container of a root.
    Container(HostId),
}

impl StateNode {
    /// The host handle, whatever its role.
    pub fn host_id(&self) -> Option<HostId> {
        match self {
            Self::None => None,
            Self::Instance(id) | Self::Container(id) => Some(*id),
        }
    }
}

/// Kind-specific persistent state.
#[derive(Debug, Clone, Default)]
pub enum MemoizedState {
    #[default]
    None,
    /// Resolved children of a root.
    Root(Child),
    /// Ordered state hooks of a function component.
    Hooks(Vec<StateHook>),
}

impl MemoizedState {
    /// Hooks of a function component, empty for other kinds.
    pub fn hooks(&self) -> &[StateHook] {
        match self {
            Self::Hooks(hooks) => hooks,
            _ => &[],
        }
    }
}

/// One position in the render tree, paired with its counterpart in the
/// other buffer through `alternate`.
///
/// Tree links are arena ids. `child` and `sibling` describe the tree;
/// `parent` and `alternate` are lookups only.
pub struct RenderNode {
    pub(crate) id: NodeId,
    pub kind: NodeKind,
    pub element_type: Option<ElementType>,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRef>,

    pub pending_props: Props,
    pub memoized_props: Option<Props>,
    pub memoized_state: MemoizedState,
    pub update_queue: Option<Arc<UpdateQueue<Child>>>,
    pub state_node: StateNode,

    pub parent: Option<NodeId>,
    pub child: Option<NodeId>,
    pub sibling: Option<NodeId>,
    pub index: usize,
    pub alternate: Option<NodeId>,

    pub flags: Flags,
    pub subtree_flags: Flags,
    pub deletions: SmallVec<[NodeId; 2]>,
    pub lanes: Lanes,
}

impl RenderNode {
    /// Create a detached node.
    pub fn new(kind: NodeKind, pending_props: Props, key: Option<Key>) -> Self {
        Self {
            id: NodeId::new(),
            kind,
            element_type: None,
            key,
            node_ref: None,
            pending_props,
            memoized_props: None,
            memoized_state: MemoizedState::None,
            update_queue: None,
            state_node: StateNode::None,
            parent: None,
            child: None,
            sibling: None,
            index: 0,
            alternate: None,
            flags: Flags::empty(),
            subtree_flags: Flags::empty(),
            deletions: SmallVec::new(),
            lanes: Lanes::empty(),
        }
    }

    /// Create a root node for a host container.
    pub fn root(container: HostId) -> Self {
        let mut node = Self::new(NodeKind::HostRoot, Props::new(), None);
        node.state_node = StateNode::Container(container);
        node.update_queue = Some(Arc::new(UpdateQueue::new()));
        node.memoized_state = MemoizedState::Root(Child::Empty);
        node
    }

    /// Create a text node.
    pub fn text(content: &str) -> Self {
        Self::new(NodeKind::HostText, Props::text(content), None)
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Host instance owned by a host-kind node.
    pub fn instance(&self) -> Option<HostId> {
        match self.state_node {
            StateNode::Instance(id) => Some(id),
            _ => None,
        }
    }

    /// Name used in logs: tag, component name, or kind.
    pub fn label(&self) -> String {
        match &self.element_type {
            Some(element_type) => format!("{element_type:?}"),
            None => format!("{:?}", self.kind),
        }
    }

    /// Whether this node or anything below it has host work pending.
    pub fn has_mutations(&self) -> bool {
        (self.flags | self.subtree_flags).intersects(Flags::MUTATION_MASK)
    }
}

impl fmt::Debug for RenderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("type", &self.element_type)
            .field("key", &self.key)
            .field("index", &self.index)
            .field("flags", &self.flags)
            .field("subtree_flags", &self.subtree_flags)
            .field("state_node", &self.state_node)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Component;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn kind_follows_element_type() {
        let component = Component::new("App", |_, _| Ok(Child::Empty));
        assert_eq!(NodeKind::of(&ElementType::Host("div".into())), NodeKind::HostElement);
        assert_eq!(
            NodeKind::of(&ElementType::Component(component)),
            NodeKind::FunctionComponent
        );
        assert_eq!(NodeKind::of(&ElementType::Fragment), NodeKind::Fragment);
        assert!(NodeKind::HostText.is_host());
        assert!(!NodeKind::Fragment.is_host());
    }

    #[test]
    fn root_node_starts_empty() {
        let root = RenderNode::root(HostId::new(7));
        assert_eq!(root.kind, NodeKind::HostRoot);
        assert_eq!(root.state_node.host_id(), Some(HostId::new(7)));
        assert!(root.update_queue.is_some());
        assert!(matches!(root.memoized_state, MemoizedState::Root(Child::Empty)));
        assert!(!root.has_mutations());
    }
}

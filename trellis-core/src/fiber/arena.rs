//! Node Arena
//!
//! All render nodes of a root live in one arena indexed by [`NodeId`].
//! Links between nodes are ids, so the current and work-in-progress trees
//! can point at each other freely without reference cycles.
//!
//! Nodes are never freed one by one. After each commit (and after an
//! aborted render) [`NodeArena::sweep`] keeps the current tree plus the
//! alternates of its nodes and drops everything else.

use std::collections::{HashMap, HashSet};
use std::ops::{Index, IndexMut};

use super::flags::{Flags, Lanes};
use super::node::{NodeId, NodeKind, RenderNode, StateNode};
use crate::element::{Child, Element, Key, Props};
use crate::host::HostId;

/// Storage for the render nodes of one root.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: HashMap<NodeId, RenderNode>,
}

impl NodeArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Add a node to the arena.
    pub fn insert(&mut self, node: RenderNode) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        id
    }

    /// Get a reference to a node.
    pub fn get(&self, id: NodeId) -> Option<&RenderNode> {
        self.nodes.get(&id)
    }

    /// Get a mutable reference to a node.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut RenderNode> {
        self.nodes.get_mut(&id)
    }

    /// Whether the node is still stored.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Total number of stored nodes, both buffers included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get or create the work-in-progress counterpart of `current`.
    ///
    /// The first call allocates the alternate and links the pair. Later
    /// calls recycle it, resetting effects from the previous render.
    pub fn create_work_in_progress(&mut self, current: NodeId, pending_props: Props) -> NodeId {
        let wip = match self[current].alternate {
            Some(wip) => {
                let node = &mut self[wip];
                node.pending_props = pending_props;
                node.flags = Flags::empty();
                node.subtree_flags = Flags::empty();
                node.deletions.clear();
                wip
            }
            None => {
                let source = &self[current];
                let mut node = RenderNode::new(source.kind, pending_props, source.key.clone());
                node.alternate = Some(current);
                let wip = self.insert(node);
                self[current].alternate = Some(wip);
                wip
            }
        };

        let source = &self[current];
        let element_type = source.element_type.clone();
        let update_queue = source.update_queue.clone();
        let child = source.child;
        let memoized_props = source.memoized_props.clone();
        let memoized_state = source.memoized_state.clone();
        let node_ref = source.node_ref.clone();
        let state_node = source.state_node;
        let lanes = source.lanes;

        let node = &mut self[wip];
        node.element_type = element_type;
        node.update_queue = update_queue;
        node.child = child;
        node.memoized_props = memoized_props;
        node.memoized_state = memoized_state;
        node.node_ref = node_ref;
        node.state_node = state_node;
        node.lanes = lanes;
        wip
    }

    /// Build a fresh node for an element descriptor.
    pub fn create_from_element(&mut self, element: &Element) -> NodeId {
        let kind = NodeKind::of(&element.element_type);
        let mut node = RenderNode::new(kind, element.props.clone(), element.key.clone());
        node.element_type = Some(element.element_type.clone());
        node.node_ref = element.node_ref.clone();
        self.insert(node)
    }

    /// Build a fresh fragment node around `children`.
    pub fn create_fragment(&mut self, children: Child, key: Option<Key>) -> NodeId {
        let mut node = RenderNode::new(NodeKind::Fragment, Props::with_children(children), key);
        node.element_type = Some(crate::element::ElementType::Fragment);
        self.insert(node)
    }

    /// Build a fresh text node.
    pub fn create_text(&mut self, content: &str) -> NodeId {
        self.insert(RenderNode::text(content))
    }

    /// The sibling chain starting at `first`.
    pub fn siblings(&self, first: Option<NodeId>) -> Vec<NodeId> {
        let mut chain = Vec::new();
        let mut cursor = first;
        while let Some(id) = cursor {
            chain.push(id);
            cursor = self[id].sibling;
        }
        chain
    }

    /// Children of `parent`, in order.
    pub fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.siblings(self[parent].child)
    }

    /// Walk `parent` links from `node` to its root, marking lanes on the
    /// way. Returns `None` when the node is gone or no longer attached to
    /// a root.
    pub fn mark_update_lane_to_root(&mut self, node: NodeId, lane: Lanes) -> Option<NodeId> {
        let mut cursor = node;
        loop {
            let current = self.get_mut(cursor)?;
            current.lanes |= lane;
            let (kind, parent, alternate) = (current.kind, current.parent, current.alternate);
            if let Some(alternate) = alternate.and_then(|id| self.get_mut(id)) {
                alternate.lanes |= lane;
            }
            match parent {
                Some(parent) => cursor = parent,
                None if kind == NodeKind::HostRoot => return Some(cursor),
                None => return None,
            }
        }
    }

    /// Nearest host instance above `node` that its host nodes attach to.
    pub fn host_parent(&self, node: NodeId) -> Option<HostId> {
        let mut parent = self[node].parent;
        while let Some(id) = parent {
            let candidate = &self[id];
            match (candidate.kind, candidate.state_node) {
                (NodeKind::HostElement, StateNode::Instance(instance)) => return Some(instance),
                (NodeKind::HostRoot, StateNode::Container(container)) => return Some(container),
                _ => parent = candidate.parent,
            }
        }
        None
    }

    /// Drop every node not reachable from the tree at `root`, keeping the
    /// alternates of reachable nodes. Returns how many nodes were dropped.
    pub fn sweep(&mut self, root: NodeId) -> usize {
        let mut live = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(&id) else {
                continue;
            };
            if !live.insert(id) {
                continue;
            }
            if let Some(alternate) = node.alternate {
                live.insert(alternate);
            }
            stack.extend(node.sibling);
            stack.extend(node.child);
        }

        let before = self.nodes.len();
        self.nodes.retain(|id, _| live.contains(id));
        before - self.nodes.len()
    }
}

impl Index<NodeId> for NodeArena {
    type Output = RenderNode;

    fn index(&self, id: NodeId) -> &RenderNode {
        self.nodes
            .get(&id)
            .unwrap_or_else(|| panic!("render node {id} is not in the arena"))
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut RenderNode {
        self.nodes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("render node {id} is not in the arena"))
    }
}

//! Commit Phase
//!
//! Applies the effects recorded during render to the host, in one
//! uninterrupted pass over the finished tree:
//!
//! 1. Descend from the root while `subtree_flags` says something below
//!    needs mutation, down to the deepest such node.
//! 2. On the way back up, apply each node's own effects: placement,
//!    then update, then child deletions, then ref attachment.
//!
//! Clean subtrees are never visited.

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::fiber::{Flags, NodeArena, NodeId, NodeKind};
use crate::host::{Host, HostId};

/// Counts of host work done by one commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CommitSummary {
    /// Subtrees inserted or moved.
    pub placements: usize,
    /// Host instances whose text or props changed.
    pub updates: usize,
    /// Subtrees removed from the tree.
    pub deletions: usize,
    /// `remove_child` calls issued for those subtrees.
    pub host_removals: usize,
    /// Refs attached to new instances.
    pub refs_attached: usize,
}

impl CommitSummary {
    /// Whether the commit touched the host at all.
    pub fn is_empty(&self) -> bool {
        self.placements == 0 && self.updates == 0 && self.deletions == 0
    }
}

/// Applies mutation effects of a finished tree.
pub(crate) struct Committer<'a> {
    arena: &'a mut NodeArena,
    host: &'a mut dyn Host,
    summary: CommitSummary,
}

impl<'a> Committer<'a> {
    pub(crate) fn new(arena: &'a mut NodeArena, host: &'a mut dyn Host) -> Self {
        Self {
            arena,
            host,
            summary: CommitSummary::default(),
        }
    }

    /// Walk the finished tree rooted at `finished_work` and apply its effects.
    pub(crate) fn commit_mutation_effects(mut self, finished_work: NodeId) -> CommitSummary {
        let mut next = Some(finished_work);

        while let Some(id) = next {
            let node = &self.arena[id];
            if node.subtree_flags.intersects(Flags::MUTATION_MASK) {
                if let Some(child) = node.child {
                    next = Some(child);
                    continue;
                }
            }

            // Nothing further down: apply effects here and climb.
            let mut up = id;
            loop {
                self.commit_mutation_effects_on_node(up);
                if up == finished_work {
                    next = None;
                    break;
                }
                if let Some(sibling) = self.arena[up].sibling {
                    next = Some(sibling);
                    break;
                }
                match self.arena[up].parent {
                    Some(parent) => up = parent,
                    None => {
                        next = None;
                        break;
                    }
                }
            }
        }

        debug!(
            placements = self.summary.placements,
            updates = self.summary.updates,
            deletions = self.summary.deletions,
            "mutation effects applied"
        );
        self.summary
    }

    fn commit_mutation_effects_on_node(&mut self, id: NodeId) {
        let flags = self.arena[id].flags;

        if flags.contains(Flags::PLACEMENT) {
            self.commit_placement(id);
            self.arena[id].flags.remove(Flags::PLACEMENT);
        }
        if flags.contains(Flags::UPDATE) {
            self.commit_update(id);
            self.arena[id].flags.remove(Flags::UPDATE);
        }
        if flags.contains(Flags::CHILD_DELETION) {
            let deletions = std::mem::take(&mut self.arena[id].deletions);
            for child in deletions {
                self.commit_deletion(id, child);
            }
            self.arena[id].flags.remove(Flags::CHILD_DELETION);
        }
        if flags.contains(Flags::REF) {
            self.commit_attach_ref(id);
            self.arena[id].flags.remove(Flags::REF);
        }
    }

    fn commit_placement(&mut self, id: NodeId) {
        let Some(parent) = self.arena.host_parent(id) else {
            warn!(node = %id, "placement without a host parent");
            return;
        };
        let before = self.host_sibling(id);
        trace!(node = %id, parent = ?parent, before = ?before, "placing");
        self.insert_or_append(parent, id, before);
        self.summary.placements += 1;
    }

    /// Host instance the subtree at `id` must be inserted before: the first
    /// host node after it in document order that is not itself being placed.
    fn host_sibling(&self, id: NodeId) -> Option<HostId> {
        let mut node = id;
        'siblings: loop {
            // Climb until there is a sibling, giving up at a host boundary.
            while self.arena[node].sibling.is_none() {
                let parent = self.arena[node].parent?;
                let parent_node = &self.arena[parent];
                if matches!(parent_node.kind, NodeKind::HostElement | NodeKind::HostRoot) {
                    return None;
                }
                node = parent;
            }
            node = self.arena[node].sibling?;

            // Descend through components and fragments to a host node.
            while !self.arena[node].kind.is_host() {
                if self.arena[node].flags.contains(Flags::PLACEMENT) {
                    continue 'siblings;
                }
                match self.arena[node].child {
                    Some(child) => node = child,
                    None => continue 'siblings,
                }
            }

            if !self.arena[node].flags.contains(Flags::PLACEMENT) {
                if let Some(instance) = self.arena[node].instance() {
                    return Some(instance);
                }
            }
        }
    }

    fn insert_or_append(&mut self, parent: HostId, id: NodeId, before: Option<HostId>) {
        let node = &self.arena[id];
        if node.kind.is_host() {
            if let Some(instance) = node.instance() {
                match before {
                    Some(before) => self.host.insert_before(parent, instance, before),
                    None => self.host.append_child(parent, instance),
                }
            }
            return;
        }

        let mut child = node.child;
        while let Some(current) = child {
            self.insert_or_append(parent, current, before);
            child = self.arena[current].sibling;
        }
    }

    fn commit_update(&mut self, id: NodeId) {
        let node = &self.arena[id];
        let (Some(instance), Some(props)) = (node.instance(), node.memoized_props.as_ref()) else {
            return;
        };
        match node.kind {
            NodeKind::HostText => {
                let content = props.text_content().unwrap_or_default();
                self.host.commit_text_update(instance, content);
            }
            NodeKind::HostElement => self.host.commit_update(instance, props),
            _ => return,
        }
        self.summary.updates += 1;
    }

    /// Remove the subtree at `child` from the host and release its refs.
    fn commit_deletion(&mut self, parent: NodeId, child: NodeId) {
        let host_parent = self.arena.host_parent(child);

        // Pre-order walk; only the outermost host nodes are removed from the
        // host, their descendants go with them.
        let mut removals = Vec::new();
        let mut stack = vec![(child, false)];
        while let Some((id, inside_host)) = stack.pop() {
            let node = &self.arena[id];
            match node.kind {
                NodeKind::HostElement | NodeKind::HostText => {
                    if let (Some(node_ref), Some(instance)) = (&node.node_ref, node.instance()) {
                        if node_ref.get() == Some(instance) {
                            node_ref.set(None);
                        }
                    }
                    if !inside_host {
                        removals.extend(node.instance());
                    }
                }
                NodeKind::FunctionComponent => trace!(node = %id, label = %node.label(), "unmounting"),
                NodeKind::HostRoot | NodeKind::Fragment => {}
            }

            let inside = inside_host || node.kind.is_host();
            let children = self.arena.siblings(node.child);
            stack.extend(children.into_iter().rev().map(|c| (c, inside)));
        }

        match host_parent {
            Some(host_parent) => {
                for instance in removals {
                    self.host.remove_child(host_parent, instance);
                    self.summary.host_removals += 1;
                }
            }
            None => warn!(node = %child, "deleted subtree has no host parent"),
        }

        trace!(parent = %parent, child = %child, "deleted");
        let node = &mut self.arena[child];
        node.parent = None;
        node.child = None;
        node.sibling = None;
        if let Some(alternate) = node.alternate {
            let alternate = &mut self.arena[alternate];
            alternate.parent = None;
            alternate.child = None;
        }
        self.summary.deletions += 1;
    }

    fn commit_attach_ref(&mut self, id: NodeId) {
        let node = &self.arena[id];
        let instance = node.instance();

        if let Some(current) = node.alternate.and_then(|alt| self.arena.get(alt)) {
            if let Some(old) = &current.node_ref {
                let replaced = node.node_ref.as_ref().map_or(true, |new| !new.same_as(old));
                if replaced && old.get() == instance {
                    old.set(None);
                }
            }
        }

        if let Some(node_ref) = &node.node_ref {
            node_ref.set(instance);
            self.summary.refs_attached += 1;
        }
    }
}

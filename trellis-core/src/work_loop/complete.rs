//! Complete work: build host instances and bubble effect flags.

use super::WorkLoop;
use crate::element::{same_ref, ElementType};
use crate::fiber::{Flags, NodeId, NodeKind, StateNode};
use crate::host::HostId;

impl WorkLoop<'_> {
    pub(super) fn complete_work(&mut self, wip: NodeId) {
        match self.arena[wip].kind {
            NodeKind::HostElement => self.complete_host_element(wip),
            NodeKind::HostText => self.complete_host_text(wip),
            NodeKind::HostRoot | NodeKind::FunctionComponent | NodeKind::Fragment => {}
        }
        self.bubble_properties(wip);
    }

    fn complete_host_element(&mut self, wip: NodeId) {
        let node = &self.arena[wip];

        if let (Some(current), Some(_)) = (node.alternate, node.instance()) {
            let current = &self.arena[current];
            let mut flags = Flags::empty();
            let props_changed = current
                .memoized_props
                .as_ref()
                .map_or(true, |old| !old.same_attributes(&node.pending_props));
            if props_changed {
                flags |= Flags::UPDATE;
            }
            if !same_ref(current.node_ref.as_ref(), node.node_ref.as_ref()) {
                flags |= Flags::REF;
            }
            self.arena[wip].flags |= flags;
            return;
        }

        let Some(ElementType::Host(tag)) = &node.element_type else {
            return;
        };
        let instance = self.host.create_instance(tag, &node.pending_props);
        self.created.push(instance);
        let has_ref = node.node_ref.is_some();
        self.append_all_children(instance, wip);

        let node = &mut self.arena[wip];
        node.state_node = StateNode::Instance(instance);
        if has_ref {
            node.flags |= Flags::REF;
        }
    }

    fn complete_host_text(&mut self, wip: NodeId) {
        let node = &self.arena[wip];
        let content = node.pending_props.text_content().unwrap_or_default();

        if let (Some(current), Some(_)) = (node.alternate, node.instance()) {
            let old = self.arena[current]
                .memoized_props
                .as_ref()
                .and_then(|props| props.text_content());
            if old != Some(content) {
                self.arena[wip].flags |= Flags::UPDATE;
            }
            return;
        }

        let instance = self.host.create_text_instance(content);
        self.created.push(instance);
        self.arena[wip].state_node = StateNode::Instance(instance);
    }

    /// Attach the top-level host instances below `wip` to `parent`, looking
    /// through components and fragments.
    fn append_all_children(&mut self, parent: HostId, wip: NodeId) {
        let mut cursor = self.arena[wip].child;
        while let Some(id) = cursor {
            let node = &self.arena[id];
            if node.kind.is_host() {
                if let Some(instance) = node.instance() {
                    self.host.append_child(parent, instance);
                }
            } else if let Some(child) = node.child {
                cursor = Some(child);
                continue;
            }

            let mut up = id;
            loop {
                if let Some(sibling) = self.arena[up].sibling {
                    cursor = Some(sibling);
                    break;
                }
                match self.arena[up].parent {
                    Some(parent) if parent != wip => up = parent,
                    _ => return,
                }
            }
        }
    }

    fn bubble_properties(&mut self, wip: NodeId) {
        let mut subtree_flags = Flags::empty();
        let mut cursor = self.arena[wip].child;
        while let Some(child) = cursor {
            let node = &mut self.arena[child];
            subtree_flags |= node.flags | node.subtree_flags;
            node.parent = Some(wip);
            cursor = node.sibling;
        }
        self.arena[wip].subtree_flags = subtree_flags;
    }
}

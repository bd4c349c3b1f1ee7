//! Child Reconciliation
//!
//! Given the current children of a node and the descriptor for its new
//! children, decide which nodes are reused, which are created, which move
//! and which go away. Decisions are recorded as effect flags; nothing
//! touches the host here.
//!
//! # Algorithm
//!
//! - A single element scans the current sibling chain for a node with the
//!   same key. Same key and type reuses it; same key but another type
//!   invalidates the whole remaining chain.
//! - A list builds a `key ?? index` map of the current children and walks
//!   the new entries once. `last_placed_index` tracks the furthest old
//!   position reused so far: a reused node whose old position lies before
//!   it has moved and is marked for placement. This is linear and handles
//!   appends, prepends and removals without moves, but it is not a minimal
//!   move set for arbitrary permutations.
//!
//! When effects are not tracked (a subtree mounting for the first time)
//! nothing is flagged: the whole subtree is placed as one unit by its
//! nearest tracked ancestor.

use indexmap::IndexMap;
use tracing::{trace, warn};

use crate::element::{Child, Element, Key, Props};
use crate::fiber::{Flags, NodeArena, NodeId, NodeKind};

/// Where a current child sits in the lookup map of a list diff.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SlotKey {
    Key(Key),
    Index(usize),
}

impl SlotKey {
    fn of(key: Option<&Key>, index: usize) -> Self {
        match key {
            Some(key) => Self::Key(key.clone()),
            None => Self::Index(index),
        }
    }
}

/// Diffs children of one node against their new descriptor.
#[derive(Debug, Clone, Copy)]
pub struct ChildReconciler {
    track_effects: bool,
}

impl ChildReconciler {
    /// Reconciler for nodes that have a current counterpart.
    pub const UPDATE: Self = Self {
        track_effects: true,
    };

    /// Reconciler for subtrees mounting for the first time.
    pub const MOUNT: Self = Self {
        track_effects: false,
    };

    /// Whether deletions and placements are recorded.
    pub fn tracks_effects(&self) -> bool {
        self.track_effects
    }

    /// Reconcile `parent`'s children against `new_child` and return the
    /// first new child.
    pub fn reconcile(
        &self,
        arena: &mut NodeArena,
        parent: NodeId,
        current_first: Option<NodeId>,
        new_child: &Child,
    ) -> Option<NodeId> {
        let new_child = match new_child {
            Child::Element(element) if element.is_unkeyed_fragment() => element.props.children(),
            other => other,
        };

        match new_child {
            Child::Element(element) => {
                let node = self.reconcile_single_element(arena, parent, current_first, element);
                Some(self.place_single_child(arena, node))
            }
            Child::Text(content) => {
                let node = self.reconcile_single_text(arena, parent, current_first, content);
                Some(self.place_single_child(arena, node))
            }
            Child::List(items) => self.reconcile_array(arena, parent, current_first, items),
            Child::Empty => {
                self.delete_remaining_children(arena, parent, current_first);
                None
            }
            Child::Unsupported(value) => {
                warn!(parent = %parent, descriptor = %value, "unsupported child rendered as nothing");
                self.delete_remaining_children(arena, parent, current_first);
                None
            }
        }
    }

    fn reconcile_single_element(
        &self,
        arena: &mut NodeArena,
        parent: NodeId,
        current_first: Option<NodeId>,
        element: &Element,
    ) -> NodeId {
        let mut cursor = current_first;
        while let Some(current) = cursor {
            let node = &arena[current];
            let next = node.sibling;

            if node.key != element.key {
                self.delete_child(arena, parent, current);
                cursor = next;
                continue;
            }

            if node.element_type.as_ref() == Some(&element.element_type) {
                self.delete_remaining_children(arena, parent, next);
                let existing = reuse_node(arena, current, element.props.clone());
                arena[existing].node_ref = element.node_ref.clone();
                arena[existing].parent = Some(parent);
                return existing;
            }

            // Same key, different type: nothing at this position can be reused.
            self.delete_remaining_children(arena, parent, Some(current));
            break;
        }

        let created = arena.create_from_element(element);
        arena[created].parent = Some(parent);
        created
    }

    fn reconcile_single_text(
        &self,
        arena: &mut NodeArena,
        parent: NodeId,
        current_first: Option<NodeId>,
        content: &str,
    ) -> NodeId {
        if let Some(current) = current_first {
            if arena[current].kind == NodeKind::HostText {
                let next = arena[current].sibling;
                self.delete_remaining_children(arena, parent, next);
                let existing = reuse_node(arena, current, Props::text(content));
                arena[existing].parent = Some(parent);
                return existing;
            }
        }

        self.delete_remaining_children(arena, parent, current_first);
        let created = arena.create_text(content);
        arena[created].parent = Some(parent);
        created
    }

    fn reconcile_array(
        &self,
        arena: &mut NodeArena,
        parent: NodeId,
        current_first: Option<NodeId>,
        items: &[Child],
    ) -> Option<NodeId> {
        let mut existing: IndexMap<SlotKey, NodeId> = IndexMap::new();
        for current in arena.siblings(current_first) {
            let node = &arena[current];
            let slot = SlotKey::of(node.key.as_ref(), node.index);
            if let Some(duplicate) = existing.insert(slot, current) {
                warn!(parent = %parent, key = ?arena[current].key, "duplicate key among siblings");
                self.delete_child(arena, parent, duplicate);
            }
        }

        let mut last_placed_index = 0;
        let mut first = None;
        let mut previous: Option<NodeId> = None;

        for (index, item) in items.iter().enumerate() {
            let Some(new) = self.update_from_map(arena, &mut existing, parent, index, item) else {
                continue;
            };

            {
                let node = &mut arena[new];
                node.index = index;
                node.parent = Some(parent);
                node.sibling = None;
            }
            match previous {
                Some(prev) => arena[prev].sibling = Some(new),
                None => first = Some(new),
            }
            previous = Some(new);

            if !self.track_effects {
                continue;
            }
            match arena[new].alternate {
                Some(current) => {
                    let old_index = arena[current].index;
                    if old_index < last_placed_index {
                        arena[new].flags |= Flags::PLACEMENT;
                    } else {
                        last_placed_index = old_index;
                    }
                }
                None => arena[new].flags |= Flags::PLACEMENT,
            }
        }

        let mut stale: Vec<NodeId> = existing.into_values().collect();
        stale.sort_by_key(|id| arena[*id].index);
        for node in stale {
            self.delete_child(arena, parent, node);
        }

        first
    }

    fn update_from_map(
        &self,
        arena: &mut NodeArena,
        existing: &mut IndexMap<SlotKey, NodeId>,
        parent: NodeId,
        index: usize,
        item: &Child,
    ) -> Option<NodeId> {
        match item {
            Child::Text(content) => {
                let slot = SlotKey::Index(index);
                if let Some(&current) = existing.get(&slot) {
                    if arena[current].kind == NodeKind::HostText {
                        existing.swap_remove(&slot);
                        return Some(reuse_node(arena, current, Props::text(content.as_str())));
                    }
                }
                Some(arena.create_text(content))
            }
            Child::Element(element) => {
                let slot = SlotKey::of(element.key.as_ref(), index);
                if let Some(&current) = existing.get(&slot) {
                    if arena[current].element_type.as_ref() == Some(&element.element_type) {
                        existing.swap_remove(&slot);
                        let reused = reuse_node(arena, current, element.props.clone());
                        arena[reused].node_ref = element.node_ref.clone();
                        return Some(reused);
                    }
                }
                Some(arena.create_from_element(element))
            }
            Child::List(children) => {
                let slot = SlotKey::Index(index);
                let props = Props::with_children(Child::List(children.clone()));
                if let Some(&current) = existing.get(&slot) {
                    if arena[current].kind == NodeKind::Fragment {
                        existing.swap_remove(&slot);
                        return Some(reuse_node(arena, current, props));
                    }
                }
                Some(arena.create_fragment(props.children().clone(), None))
            }
            Child::Empty => None,
            Child::Unsupported(value) => {
                warn!(parent = %parent, index, descriptor = %value, "unsupported child rendered as nothing");
                None
            }
        }
    }

    fn place_single_child(&self, arena: &mut NodeArena, node: NodeId) -> NodeId {
        if self.track_effects && arena[node].alternate.is_none() {
            arena[node].flags |= Flags::PLACEMENT;
        }
        node
    }

    fn delete_child(&self, arena: &mut NodeArena, parent: NodeId, child: NodeId) {
        if !self.track_effects {
            return;
        }
        trace!(parent = %parent, child = %child, "marking child for deletion");
        let node = &mut arena[parent];
        node.deletions.push(child);
        node.flags |= Flags::CHILD_DELETION;
    }

    fn delete_remaining_children(
        &self,
        arena: &mut NodeArena,
        parent: NodeId,
        first: Option<NodeId>,
    ) {
        if !self.track_effects {
            return;
        }
        for child in arena.siblings(first) {
            self.delete_child(arena, parent, child);
        }
    }
}

/// Recycle `current`'s work-in-progress counterpart as a lone child.
fn reuse_node(arena: &mut NodeArena, current: NodeId, pending_props: Props) -> NodeId {
    let wip = arena.create_work_in_progress(current, pending_props);
    let node = &mut arena[wip];
    node.index = 0;
    node.sibling = None;
    wip
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Component;
    use crate::fiber::RenderNode;

    /// Mount `children` under a fresh `<ul>` and return the ul's id.
    fn mounted(arena: &mut NodeArena, children: Child) -> NodeId {
        let ul = arena.create_from_element(&Element::host("ul"));
        let first = ChildReconciler::MOUNT.reconcile(arena, ul, None, &children);
        arena[ul].child = first;
        ul
    }

    /// Reconcile the ul's children against `next` as an update.
    fn update(arena: &mut NodeArena, current: NodeId, next: Child) -> (NodeId, Vec<NodeId>) {
        let wip = arena.create_work_in_progress(current, Props::new());
        let first = arena[current].child;
        let new_first = ChildReconciler::UPDATE.reconcile(arena, wip, first, &next);
        arena[wip].child = new_first;
        let children = arena.children(wip);
        (wip, children)
    }

    fn li(key: &str) -> Child {
        Element::host("li").key(key).child(key).into()
    }

    fn keyed(keys: &[&str]) -> Child {
        Child::List(keys.iter().map(|k| li(k)).collect())
    }

    #[test]
    fn mount_marks_nothing() {
        assert!(!ChildReconciler::MOUNT.tracks_effects());
        assert!(ChildReconciler::UPDATE.tracks_effects());

        let mut arena = NodeArena::new();
        let ul = mounted(&mut arena, keyed(&["a", "b"]));
        for child in arena.children(ul) {
            assert!(arena[child].flags.is_empty());
        }
        assert!(arena[ul].deletions.is_empty());
    }

    #[test]
    fn swapping_two_keyed_children_moves_one() {
        let mut arena = NodeArena::new();
        let ul = mounted(&mut arena, keyed(&["1", "2"]));
        let old = arena.children(ul);

        let (_, new) = update(&mut arena, ul, keyed(&["2", "1"]));

        assert_eq!(new.len(), 2);
        assert_eq!(arena[new[0]].alternate, Some(old[1]));
        assert_eq!(arena[new[1]].alternate, Some(old[0]));
        assert!(!arena[new[0]].flags.contains(Flags::PLACEMENT));
        assert!(arena[new[1]].flags.contains(Flags::PLACEMENT));
    }

    #[test]
    fn append_and_prepend_do_not_move_existing() {
        let mut arena = NodeArena::new();
        let ul = mounted(&mut arena, keyed(&["a", "b"]));

        let (_, new) = update(&mut arena, ul, keyed(&["z", "a", "b", "c"]));
        let placed: Vec<_> = new
            .iter()
            .map(|id| arena[*id].flags.contains(Flags::PLACEMENT))
            .collect();
        assert_eq!(placed, vec![true, false, false, true]);
        assert_eq!(arena[new[1]].index, 1);
    }

    #[test]
    fn unmatched_children_are_deleted() {
        let mut arena = NodeArena::new();
        let ul = mounted(&mut arena, keyed(&["a", "b", "c"]));
        let old = arena.children(ul);

        let (wip, new) = update(&mut arena, ul, keyed(&["c"]));

        assert_eq!(new.len(), 1);
        assert_eq!(arena[new[0]].alternate, Some(old[2]));
        assert!(arena[wip].flags.contains(Flags::CHILD_DELETION));
        assert_eq!(arena[wip].deletions.as_slice(), &[old[0], old[1]]);
    }

    #[test]
    fn single_element_scans_past_other_keys() {
        let mut arena = NodeArena::new();
        let ul = mounted(&mut arena, keyed(&["a", "b", "c"]));
        let old = arena.children(ul);

        let (wip, new) = update(&mut arena, ul, li("b"));

        assert_eq!(new.len(), 1);
        assert_eq!(arena[new[0]].alternate, Some(old[1]));
        assert!(arena[new[0]].flags.is_empty());
        assert_eq!(arena[wip].deletions.as_slice(), &[old[0], old[2]]);
    }

    #[test]
    fn type_change_with_same_key_remounts() {
        let mut arena = NodeArena::new();
        let ul = mounted(&mut arena, Element::host("div").key("x").into());
        let old = arena.children(ul);

        let (wip, new) = update(&mut arena, ul, Element::host("span").key("x").into());

        assert_eq!(arena[wip].deletions.as_slice(), old.as_slice());
        assert!(arena[new[0]].alternate.is_none());
        assert!(arena[new[0]].flags.contains(Flags::PLACEMENT));
        assert!(!arena[new[0]].flags.contains(Flags::UPDATE));
    }

    #[test]
    fn type_change_in_list_remounts() {
        let mut arena = NodeArena::new();
        let app = Component::new("App", |_, _| Ok(Child::Empty));
        let ul = mounted(
            &mut arena,
            Child::List(vec![Element::component(&app).key("k").into()]),
        );
        let old = arena.children(ul);

        let (wip, new) = update(
            &mut arena,
            ul,
            Child::List(vec![Element::host("li").key("k").into()]),
        );

        assert_eq!(arena[wip].deletions.as_slice(), old.as_slice());
        assert!(arena[new[0]].alternate.is_none());
        assert!(arena[new[0]].flags.contains(Flags::PLACEMENT));
    }

    #[test]
    fn text_replaces_element_and_back() {
        let mut arena = NodeArena::new();
        let ul = mounted(&mut arena, Child::text("1"));
        let old = arena.children(ul);

        let (wip, new) = update(&mut arena, ul, Child::text("2"));
        assert_eq!(arena[new[0]].alternate, Some(old[0]));
        assert!(arena[wip].deletions.is_empty());

        let (wip, new) = update(&mut arena, ul, Element::host("b").into());
        assert_eq!(arena[wip].deletions.as_slice(), old.as_slice());
        assert!(arena[new[0]].flags.contains(Flags::PLACEMENT));
    }

    #[test]
    fn empty_children_delete_everything() {
        let mut arena = NodeArena::new();
        let ul = mounted(&mut arena, keyed(&["a", "b"]));
        let old = arena.children(ul);

        let (wip, new) = update(&mut arena, ul, Child::Empty);
        assert!(new.is_empty());
        assert_eq!(arena[wip].deletions.as_slice(), old.as_slice());
    }

    #[test]
    fn duplicate_current_keys_delete_the_earlier_node() {
        let mut arena = NodeArena::new();
        let ul = arena.insert(RenderNode::new(NodeKind::HostElement, Props::new(), None));
        let first = ChildReconciler::MOUNT.reconcile(&mut arena, ul, None, &keyed(&["d", "d"]));
        arena[ul].child = first;
        let old = arena.children(ul);

        let (wip, new) = update(&mut arena, ul, keyed(&["d"]));
        assert_eq!(arena[new[0]].alternate, Some(old[1]));
        assert_eq!(arena[wip].deletions.as_slice(), &[old[0]]);
    }

    #[test]
    fn nested_lists_become_fragments() {
        let mut arena = NodeArena::new();
        let ul = mounted(
            &mut arena,
            Child::List(vec![li("a"), Child::List(vec![li("b"), li("c")])]),
        );
        let children = arena.children(ul);
        assert_eq!(children.len(), 2);
        assert_eq!(arena[children[1]].kind, NodeKind::Fragment);

        let (_, new) = update(
            &mut arena,
            ul,
            Child::List(vec![li("a"), Child::List(vec![li("b")])]),
        );
        assert_eq!(arena[new[1]].alternate, Some(children[1]));
    }

    #[test]
    fn unkeyed_fragment_is_unwrapped() {
        let mut arena = NodeArena::new();
        let ul = mounted(&mut arena, Element::fragment([li("a"), li("b")]).into());
        let children = arena.children(ul);
        assert_eq!(children.len(), 2);
        assert_eq!(arena[children[0]].kind, NodeKind::HostElement);
    }

    #[test]
    fn unsupported_child_renders_nothing() {
        let mut arena = NodeArena::new();
        let ul = mounted(&mut arena, keyed(&["a"]));
        let old = arena.children(ul);

        let (wip, new) = update(&mut arena, ul, Child::Unsupported(serde_json::json!({"x": 1})));
        assert!(new.is_empty());
        assert_eq!(arena[wip].deletions.as_slice(), old.as_slice());
    }
}

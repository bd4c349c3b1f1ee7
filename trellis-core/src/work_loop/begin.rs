//! Begin work: compute a node's new children.

use tracing::warn;

use super::WorkLoop;
use crate::element::{Child, ElementType};
use crate::error::ReconcileError;
use crate::fiber::{Lanes, MemoizedState, NodeId, NodeKind};
use crate::hooks::{HookMode, Hooks};
use crate::reconcile::ChildReconciler;
use crate::update_queue::process_update;

impl WorkLoop<'_> {
    /// Reconcile `wip`'s children and return the first one to work on.
    pub(super) fn begin_work(&mut self, wip: NodeId) -> Result<Option<NodeId>, ReconcileError> {
        self.arena[wip].lanes = Lanes::empty();

        match self.arena[wip].kind {
            NodeKind::HostRoot => Ok(self.update_host_root(wip)),
            NodeKind::FunctionComponent => self.update_function_component(wip),
            NodeKind::HostElement | NodeKind::Fragment => {
                let children = self.arena[wip].pending_props.children().clone();
                self.reconcile_children(wip, &children);
                Ok(self.arena[wip].child)
            }
            NodeKind::HostText => Ok(None),
        }
    }

    fn update_host_root(&mut self, wip: NodeId) -> Option<NodeId> {
        let node = &self.arena[wip];
        let base = match &node.memoized_state {
            MemoizedState::Root(children) => children.clone(),
            _ => Child::Empty,
        };
        let pending = node.update_queue.as_ref().and_then(|queue| queue.take_pending());

        let next = process_update(base, pending);
        self.arena[wip].memoized_state = MemoizedState::Root(next.clone());
        self.reconcile_children(wip, &next);
        self.arena[wip].child
    }

    fn update_function_component(
        &mut self,
        wip: NodeId,
    ) -> Result<Option<NodeId>, ReconcileError> {
        let node = &self.arena[wip];
        let Some(ElementType::Component(component)) = node.element_type.clone() else {
            warn!(node = %wip, "function component node without a component");
            return Ok(None);
        };
        let props = node.pending_props.clone();
        let (mode, previous) = match node.alternate {
            Some(current) => (
                HookMode::Update,
                self.arena[current].memoized_state.hooks().to_vec(),
            ),
            None => (HookMode::Mount, Vec::new()),
        };

        let mut hooks = Hooks::new(
            mode,
            wip,
            component.name(),
            &previous,
            self.root,
            self.config.hook_mismatch,
        );
        let rendered = component
            .render(&mut hooks, &props)
            .map_err(|source| match source.downcast::<ReconcileError>() {
                Ok(err) if err.is_hook_misuse() => *err,
                Ok(err) => ReconcileError::Component {
                    component: component.name().to_string(),
                    source: err,
                },
                Err(source) => ReconcileError::Component {
                    component: component.name().to_string(),
                    source,
                },
            })?;
        let hooks = hooks.finish()?;

        self.arena[wip].memoized_state = MemoizedState::Hooks(hooks);
        self.reconcile_children(wip, &rendered);
        Ok(self.arena[wip].child)
    }

    fn reconcile_children(&mut self, wip: NodeId, children: &Child) {
        let first = match self.arena[wip].alternate {
            Some(current) => {
                let current_first = self.arena[current].child;
                ChildReconciler::UPDATE.reconcile(self.arena, wip, current_first, children)
            }
            None => ChildReconciler::MOUNT.reconcile(self.arena, wip, None, children),
        };
        self.arena[wip].child = first;
    }
}

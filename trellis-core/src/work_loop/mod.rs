//! Render Phase
//!
//! Builds the work-in-progress tree depth first. Each node is visited
//! twice: *begin* on the way down computes its children, *complete* on the
//! way up creates host instances and aggregates effect flags. The host is
//! only asked to create detached instances here; nothing is attached until
//! commit.
//!
//! # Failure
//!
//! A component error, a hook misuse or a panic inside a render aborts the
//! pass. Host instances the pass created are handed back through
//! [`Host::discard_instance`], the caller discards the work-in-progress
//! tree, and the committed tree stays exactly as it was.

mod begin;
mod complete;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Weak;

use tracing::{debug, error, trace};

use crate::config::ReconcilerConfig;
use crate::error::ReconcileError;
use crate::fiber::{NodeArena, NodeId};
use crate::host::{Host, HostId};
use crate::root::RootShared;

/// One render pass over a root's work-in-progress tree.
pub(crate) struct WorkLoop<'a> {
    arena: &'a mut NodeArena,
    host: &'a mut dyn Host,
    config: &'a ReconcilerConfig,
    root: &'a Weak<RootShared>,
    work_in_progress: Option<NodeId>,
    units: usize,
    /// Instances created by this pass, released again if it aborts.
    created: Vec<HostId>,
}

impl<'a> WorkLoop<'a> {
    pub(crate) fn new(
        arena: &'a mut NodeArena,
        host: &'a mut dyn Host,
        config: &'a ReconcilerConfig,
        root: &'a Weak<RootShared>,
    ) -> Self {
        Self {
            arena,
            host,
            config,
            root,
            work_in_progress: None,
            units: 0,
            created: Vec::new(),
        }
    }

    /// Render the tree below `root_wip` to completion.
    pub(crate) fn run(mut self, root_wip: NodeId) -> Result<(), ReconcileError> {
        self.work_in_progress = Some(root_wip);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.work_loop()));
        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                let component = self
                    .work_in_progress
                    .and_then(|id| self.arena.get(id))
                    .map_or_else(|| "<unknown>".to_string(), |node| node.label());
                Err(ReconcileError::ComponentPanicked {
                    component,
                    message: panic_message(payload.as_ref()),
                })
            }
        };

        match &result {
            Ok(()) => debug!(root = %root_wip, units = self.units, "render phase finished"),
            Err(err) => {
                let discarded = self.created.len();
                for instance in self.created.drain(..) {
                    self.host.discard_instance(instance);
                }
                error!(root = %root_wip, error = %err, discarded, "render phase aborted");
            }
        }
        self.work_in_progress = None;
        result
    }

    fn work_loop(&mut self) -> Result<(), ReconcileError> {
        while let Some(unit) = self.work_in_progress {
            self.perform_unit_of_work(unit)?;
        }
        Ok(())
    }

    fn perform_unit_of_work(&mut self, unit: NodeId) -> Result<(), ReconcileError> {
        self.units += 1;
        trace!(node = %unit, label = %self.arena[unit].label(), "begin work");

        let next = self.begin_work(unit)?;
        let node = &mut self.arena[unit];
        node.memoized_props = Some(node.pending_props.clone());

        match next {
            Some(child) => self.work_in_progress = Some(child),
            None => self.complete_unit_of_work(unit),
        }
        Ok(())
    }

    /// Complete `unit` and climb until a sibling with pending work turns up.
    fn complete_unit_of_work(&mut self, unit: NodeId) {
        let mut node = Some(unit);
        while let Some(current) = node {
            self.complete_work(current);

            if let Some(sibling) = self.arena[current].sibling {
                self.work_in_progress = Some(sibling);
                return;
            }
            node = self.arena[current].parent;
            self.work_in_progress = node;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads_become_messages() {
        let text: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(text.as_ref()), "boom");

        let owned: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(owned.as_ref()), "bang");

        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}

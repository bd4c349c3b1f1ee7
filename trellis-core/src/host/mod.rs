//! Host Binding
//!
//! The reconciler never touches a concrete display tree. It talks to one
//! through the [`Host`] capability trait and refers to host objects only by
//! opaque [`HostId`] handles that the host hands out.
//!
//! # Provided hosts
//!
//! - [`MemoryHost`]: an in-memory document that records every operation.
//!   It backs the test suite and doubles as a reference for real bindings.

mod event;
mod memory;

pub use event::{Event, EventHandler};
pub use memory::{HostOp, MemoryHost};

use serde::Serialize;

use crate::element::Props;

/// Opaque handle to a host instance (element, text node or container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct HostId(u64);

impl HostId {
    /// Wrap a raw handle value chosen by the host.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw handle value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Capabilities the reconciler needs from a host tree.
///
/// Calls arrive in two phases. The complete phase creates detached
/// instances and builds fresh subtrees with [`Host::append_child`]; the
/// commit phase attaches, moves, updates and removes them.
pub trait Host: Send {
    /// Create a detached element instance.
    fn create_instance(&mut self, tag: &str, props: &Props) -> HostId;

    /// Create a detached text instance.
    fn create_text_instance(&mut self, content: &str) -> HostId;

    /// Append `child` as the last child of `parent`, moving it if already attached.
    fn append_child(&mut self, parent: HostId, child: HostId);

    /// Insert `child` into `parent` right before `before`, moving it if already attached.
    fn insert_before(&mut self, parent: HostId, child: HostId, before: HostId);

    /// Detach `child` from `parent`.
    fn remove_child(&mut self, parent: HostId, child: HostId);

    /// Replace the content of a text instance.
    fn commit_text_update(&mut self, text: HostId, content: &str);

    /// Apply new props to an element instance. Hosts without mutable
    /// attributes can ignore this.
    fn commit_update(&mut self, _instance: HostId, _props: &Props) {}

    /// Release an instance created by a render that was abandoned before
    /// commit. The instance was never attached to a committed tree.
    fn discard_instance(&mut self, _instance: HostId) {}
}

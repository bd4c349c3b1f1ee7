//! Effect flags and lanes.

use bitflags::bitflags;

bitflags! {
    /// Host work pending on a render node.
    ///
    /// Combine with bitwise OR: `Flags::PLACEMENT | Flags::UPDATE`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flags: u32 {
        /// Insert or move the node's host instances.
        const PLACEMENT = 1 << 1;
        /// Apply new props or text to an existing host instance.
        const UPDATE = 1 << 2;
        /// Some children in `deletions` must be removed.
        const CHILD_DELETION = 1 << 4;
        /// Attach (and detach the previous) ref.
        const REF = 1 << 9;
    }
}

impl Flags {
    /// Flags that require the commit phase to visit a node.
    pub const MUTATION_MASK: Flags = Flags::PLACEMENT
        .union(Flags::UPDATE)
        .union(Flags::CHILD_DELETION)
        .union(Flags::REF);
}

bitflags! {
    /// Priority lanes of pending work.
    ///
    /// Only marked and cleared today; the work loop always renders
    /// synchronously.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Lanes: u32 {
        const SYNC = 1 << 0;
    }
}

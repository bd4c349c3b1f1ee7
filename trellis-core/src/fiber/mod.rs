//! Render Tree
//!
//! This module implements the double-buffered node tree the reconciler
//! works on.
//!
//! # Overview
//!
//! Every logical position of the UI tree is represented by up to two
//! [`RenderNode`]s: the *current* one, describing what is on screen, and the
//! *work-in-progress* one being built by a render. The two point at each
//! other through `alternate`. When a render commits, the work-in-progress
//! tree becomes current, and the old current nodes become the buffers the
//! next render recycles.
//!
//! # Design Decisions
//!
//! 1. Nodes live in an arena ([`NodeArena`]) and refer to each other by
//!    [`NodeId`]. Parent and alternate links are plain lookups and never
//!    keep a node alive.
//!
//! 2. The tree is encoded as first-child / next-sibling links, so walking
//!    up, down and sideways is O(1) without child vectors.
//!
//! 3. Pending host work is a [`Flags`] set per node, OR-aggregated into
//!    `subtree_flags` so the commit phase can skip clean subtrees.

mod arena;
mod flags;
mod node;

pub use arena::NodeArena;
pub use flags::{Flags, Lanes};
pub use node::{MemoizedState, NodeId, NodeKind, RenderNode, StateNode};

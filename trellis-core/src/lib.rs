//! Trellis Core
//!
//! This crate provides the reconciliation runtime for the Trellis UI
//! framework. It implements:
//!
//! - Element descriptors (host tags, function components, fragments, text)
//! - A double-buffered render tree with per-node effect flags
//! - State hooks with per-hook update queues
//! - Keyed child reconciliation
//! - A synchronous render/commit loop driving an abstract host
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `element`: descriptors and props handed to the reconciler
//! - `fiber`: render nodes, the node arena, effect flags
//! - `update_queue`: single-slot update queues
//! - `hooks`: the state hook protocol
//! - `reconcile`: child diffing
//! - `work_loop`: the render phase (begin and complete work)
//! - `commit`: applying effects to the host
//! - `root`: roots, scheduling and the public entry point
//! - `host`: the host capability trait and an in-memory host
//!
//! # Example
//!
//! ```rust
//! use trellis_core::element::{Child, Component, Element};
//! use trellis_core::host::MemoryHost;
//! use trellis_core::Root;
//!
//! let counter = Component::new("Counter", |hooks, _props| {
//!     let (count, set_count) = hooks.use_state(0)?;
//!     Ok(Element::host("button")
//!         .on("onClick", move |_| {
//!             let _ = set_count.update(|n| n + 1);
//!         })
//!         .child(count)
//!         .into())
//! });
//!
//! let host = MemoryHost::new();
//! let container = host.create_container("root");
//! let root = Root::new(host.clone(), container);
//! root.render(Element::component(&counter)).unwrap();
//!
//! let button = host.find_by_tag(container, "button").unwrap();
//! host.dispatch_event(button, "click");
//! assert_eq!(host.to_markup(container), "<root><button>1</button></root>");
//! ```

pub mod commit;
pub mod config;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod host;
pub mod reconcile;
pub mod root;
pub mod update_queue;
mod work_loop;

pub use commit::CommitSummary;
pub use config::{HookMismatchPolicy, ReconcilerConfig};
pub use element::{Child, Component, Element, NodeRef, Props};
pub use error::{BoxError, ReconcileError};
pub use hooks::{Hooks, SetState};
pub use host::{Host, HostId, MemoryHost};
pub use root::Root;

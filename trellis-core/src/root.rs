//! Roots
//!
//! A [`Root`] owns one render tree bound to one host container. It is the
//! entry point for rendering and the target of every state update
//! dispatched from inside the tree.
//!
//! # Scheduling
//!
//! Updates are synchronous: `render` and every hook setter run a full
//! render and commit before returning. A setter called *while* the root is
//! rendering (from inside a component) cannot start another pass; it
//! leaves its update queued and flags the root, and the running pass
//! repeats once it has committed. Repeats are capped by
//! [`ReconcilerConfig::max_nested_updates`].
//!
//! # Example
//!
//! ```rust
//! use trellis_core::element::Element;
//! use trellis_core::host::MemoryHost;
//! use trellis_core::Root;
//!
//! let host = MemoryHost::new();
//! let container = host.create_container("root");
//! let root = Root::new(host.clone(), container);
//!
//! root.render(Element::host("p").child("hello")).unwrap();
//! assert_eq!(host.to_markup(container), "<root><p>hello</p></root>");
//! ```

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, error, info, warn};

use crate::commit::{CommitSummary, Committer};
use crate::config::ReconcilerConfig;
use crate::element::{Child, Props};
use crate::error::ReconcileError;
use crate::fiber::{Lanes, NodeArena, NodeId, RenderNode};
use crate::host::{Host, HostId};
use crate::update_queue::{Update, UpdateQueue};
use crate::work_loop::WorkLoop;

/// Buffers of a root: the committed tree and the one awaiting commit.
#[derive(Debug, Clone, Copy)]
pub struct RootContainer {
    /// The host container everything renders into.
    pub host_container: HostId,
    /// Root node of the committed tree.
    pub current: NodeId,
    /// Root node of a finished render not yet committed.
    pub finished_work: Option<NodeId>,
}

/// Mutable state of a root, only touched by the thread holding the lock.
pub(crate) struct RootInner {
    container: RootContainer,
    arena: NodeArena,
    host: Box<dyn Host>,
    config: ReconcilerConfig,
    last_commit: CommitSummary,
    weak_self: Weak<RootShared>,
}

impl RootInner {
    /// Render until no nested update is pending.
    fn perform_sync_work(&mut self, rerender_requested: &AtomicBool) -> Result<(), ReconcileError> {
        let limit = self.config.max_nested_updates;
        let mut nested = 0;
        loop {
            rerender_requested.store(false, Ordering::SeqCst);
            self.render_root()?;

            if !rerender_requested.swap(false, Ordering::SeqCst) {
                return Ok(());
            }
            if nested >= limit {
                error!(limit, "nested update limit reached");
                return Err(ReconcileError::TooManyNestedUpdates { limit });
            }
            nested += 1;
            debug!(pass = nested + 1, "re-rendering for updates dispatched during render");
        }
    }

    fn render_root(&mut self) -> Result<(), ReconcileError> {
        let current = self.container.current;
        let root_wip = self.arena.create_work_in_progress(current, Props::new());

        let result = WorkLoop::new(
            &mut self.arena,
            self.host.as_mut(),
            &self.config,
            &self.weak_self,
        )
        .run(root_wip);

        if let Err(err) = result {
            let released = self.arena.sweep(current);
            warn!(released, "discarded work-in-progress tree");
            return Err(err);
        }

        self.container.finished_work = Some(root_wip);
        self.commit_root();
        Ok(())
    }

    fn commit_root(&mut self) {
        let Some(finished) = self.container.finished_work.take() else {
            return;
        };

        let summary = if self.arena[finished].has_mutations() {
            Committer::new(&mut self.arena, self.host.as_mut()).commit_mutation_effects(finished)
        } else {
            CommitSummary::default()
        };

        self.container.current = finished;
        let released = self.arena.sweep(finished);
        debug!(
            root = %finished,
            placements = summary.placements,
            updates = summary.updates,
            deletions = summary.deletions,
            released,
            live = self.arena.len(),
            "commit finished"
        );
        self.last_commit = summary;
    }
}

/// State shared between a [`Root`] handle and the dispatchers of its hooks.
pub(crate) struct RootShared {
    inner: ReentrantMutex<RefCell<RootInner>>,
    rerender_requested: AtomicBool,
    root_queue: Arc<UpdateQueue<Child>>,
    host_root: NodeId,
    host_container: HostId,
    /// Copy of the latest commit summary, readable while a render runs.
    last_commit: Mutex<CommitSummary>,
}

impl RootShared {
    /// Re-render the root because `node` has a pending update.
    pub(crate) fn schedule_update(&self, node: NodeId) -> Result<(), ReconcileError> {
        let guard = self.inner.lock();
        let Ok(mut inner) = guard.try_borrow_mut() else {
            // Already rendering on this thread: the running pass repeats.
            self.rerender_requested.store(true, Ordering::SeqCst);
            debug!(node = %node, "update during render deferred to the next pass");
            return Ok(());
        };

        if inner.arena.mark_update_lane_to_root(node, Lanes::SYNC).is_none() {
            warn!(node = %node, "state update dropped: node is no longer mounted");
            return Ok(());
        }
        let result = inner.perform_sync_work(&self.rerender_requested);
        *self.last_commit.lock() = inner.last_commit;
        result
    }
}

/// Handle to a render tree mounted in a host container.
///
/// Cloning the handle does not clone the tree.
#[derive(Clone)]
pub struct Root {
    shared: Arc<RootShared>,
}

impl Root {
    /// Create a root with the default configuration.
    pub fn new(host: impl Host + 'static, container: HostId) -> Self {
        Self::build(Box::new(host), container, ReconcilerConfig::default())
    }

    /// Create a root with a custom configuration.
    pub fn with_config(
        host: impl Host + 'static,
        container: HostId,
        config: ReconcilerConfig,
    ) -> Result<Self, ReconcileError> {
        config.validate()?;
        Ok(Self::build(Box::new(host), container, config))
    }

    fn build(host: Box<dyn Host>, container: HostId, config: ReconcilerConfig) -> Self {
        let shared = Arc::new_cyclic(|weak_self| {
            let root_queue = Arc::new(UpdateQueue::new());
            let mut node = RenderNode::root(container);
            node.update_queue = Some(Arc::clone(&root_queue));

            let mut arena = NodeArena::new();
            let host_root = arena.insert(node);

            RootShared {
                inner: ReentrantMutex::new(RefCell::new(RootInner {
                    container: RootContainer {
                        host_container: container,
                        current: host_root,
                        finished_work: None,
                    },
                    arena,
                    host,
                    config,
                    last_commit: CommitSummary::default(),
                    weak_self: weak_self.clone(),
                })),
                rerender_requested: AtomicBool::new(false),
                root_queue,
                host_root,
                host_container: container,
                last_commit: Mutex::new(CommitSummary::default()),
            }
        });

        info!(container = ?container, "root created");
        Self { shared }
    }

    /// Render `children` into the container, replacing what was rendered
    /// before, and commit before returning.
    ///
    /// On error the previously committed tree is left untouched.
    pub fn render(&self, children: impl Into<Child>) -> Result<(), ReconcileError> {
        self.shared.root_queue.enqueue(Update::replace(children.into()));
        self.shared.schedule_update(self.shared.host_root)
    }

    /// Remove everything rendered into the container.
    pub fn unmount(&self) -> Result<(), ReconcileError> {
        self.render(Child::Empty)
    }

    /// The host container of this root.
    pub fn container(&self) -> HostId {
        self.shared.host_container
    }

    /// Host work done by the most recent commit.
    ///
    /// Called from a component, this is the commit before the render in
    /// progress.
    pub fn last_commit(&self) -> CommitSummary {
        *self.shared.last_commit.lock()
    }

    /// Number of render nodes held, both buffers included.
    ///
    /// `None` while the root is rendering, since the arena is in flux.
    pub fn node_count(&self) -> Option<usize> {
        self.with_inner(|inner| inner.arena.len())
    }

    /// Read root state, or `None` when called from inside a render.
    fn with_inner<R>(&self, f: impl FnOnce(&RootInner) -> R) -> Option<R> {
        let guard = self.shared.inner.lock();
        let inner = guard.try_borrow().ok()?;
        Some(f(&inner))
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Root")
            .field("container", &self.shared.host_container)
            .field("last_commit", &self.last_commit())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::element::{Component, Element};
    use crate::fiber::{MemoizedState, NodeKind};
    use crate::hooks::SetState;
    use crate::host::MemoryHost;

    fn setup() -> (MemoryHost, HostId, Root) {
        let host = MemoryHost::new();
        let container = host.create_container("root");
        let root = Root::new(host.clone(), container);
        (host, container, root)
    }

    #[test]
    fn render_text_into_container() {
        let (host, container, root) = setup();
        root.render("hello").unwrap();
        assert_eq!(host.to_markup(container), "<root>hello</root>");
        assert_eq!(root.last_commit().placements, 1);
    }

    #[test]
    fn hook_state_persists_on_the_current_node() {
        let (_, _, root) = setup();
        let counter = Component::new("Counter", |hooks, _| {
            let (count, set) = hooks.use_state(0)?;
            if count < 3 {
                set.update(|c| c + 1)?;
            }
            Ok(Child::from(count))
        });
        root.render(Element::component(&counter)).unwrap();

        let guard = root.shared.inner.lock();
        let inner = guard.borrow();
        let current = inner.container.current;
        let component = inner.arena[current].child.unwrap();
        assert_eq!(inner.arena[component].kind, NodeKind::FunctionComponent);
        match &inner.arena[component].memoized_state {
            MemoizedState::Hooks(hooks) => {
                assert_eq!(hooks.len(), 1);
                assert_eq!(hooks[0].value::<i32>(), Some(3));
            }
            other => panic!("expected hooks, got {other:?}"),
        }
    }

    fn hook_values(root: &Root) -> Vec<i32> {
        let guard = root.shared.inner.lock();
        let inner = guard.borrow();
        let component = inner.arena[inner.container.current].child.unwrap();
        match &inner.arena[component].memoized_state {
            MemoizedState::Hooks(hooks) => hooks.iter().map(|h| h.value::<i32>().unwrap()).collect(),
            other => panic!("expected hooks, got {other:?}"),
        }
    }

    #[test]
    fn dispatches_between_renders_reuse_the_hook_list() {
        let (host, container, root) = setup();
        let setter: Arc<Mutex<Option<SetState<i32>>>> = Arc::new(Mutex::new(None));
        let slot = Arc::clone(&setter);
        let counter = Component::new("Counter", move |hooks, _| {
            let (count, set) = hooks.use_state(0)?;
            *slot.lock() = Some(set);
            Ok(Child::from(count))
        });
        root.render(Element::component(&counter)).unwrap();

        for _ in 0..3 {
            let set = setter.lock().clone().unwrap();
            set.update(|n| n + 1).unwrap();
        }
        assert_eq!(host.to_markup(container), "<root>3</root>");
        assert_eq!(hook_values(&root), vec![3]);
    }

    #[test]
    fn nested_update_limit_allows_that_many_passes() {
        let host = MemoryHost::new();
        let container = host.create_container("root");
        let config = ReconcilerConfig {
            max_nested_updates: 1,
            ..ReconcilerConfig::default()
        };
        let root = Root::with_config(host.clone(), container, config).unwrap();

        let renders = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&renders);
        let once = Component::new("Once", move |hooks, _| {
            seen.fetch_add(1, Ordering::SeqCst);
            let (n, set) = hooks.use_state(0)?;
            if n < 1 {
                set.set(1)?;
            }
            Ok(Child::from(n))
        });
        root.render(Element::component(&once)).unwrap();
        assert_eq!(host.to_markup(container), "<root>1</root>");
        assert_eq!(renders.load(Ordering::SeqCst), 2);

        let twice = Component::new("Twice", |hooks, _| {
            let (n, set) = hooks.use_state(0)?;
            if n < 2 {
                set.set(n + 1)?;
            }
            Ok(Child::from(n))
        });
        assert!(matches!(
            root.render(Element::component(&twice)),
            Err(ReconcileError::TooManyNestedUpdates { limit: 1 })
        ));
    }

    #[test]
    fn accessors_work_during_render() {
        let (_, container, root) = setup();
        root.render("before").unwrap();

        let handle: Arc<Mutex<Option<Root>>> = Arc::new(Mutex::new(Some(root.clone())));
        let observed = Arc::new(Mutex::new(None));
        let (slot, out) = (Arc::clone(&handle), Arc::clone(&observed));
        let reader = Component::new("Reader", move |_, _| {
            if let Some(root) = slot.lock().as_ref() {
                *out.lock() = Some((root.container(), root.last_commit(), root.node_count()));
            }
            Ok(Child::from("after"))
        });
        root.render(Element::component(&reader)).unwrap();
        handle.lock().take();

        let (seen_container, seen_commit, seen_count) = observed.lock().take().unwrap();
        assert_eq!(seen_container, container);
        assert_eq!(seen_commit.placements, 1);
        assert_eq!(seen_count, None);
        assert_eq!(root.container(), container);
    }

    #[test]
    fn buffers_alternate_between_commits() {
        let (_, _, root) = setup();
        let first = root.with_inner(|inner| inner.container.current).unwrap();
        root.render("a").unwrap();
        let second = root.with_inner(|inner| inner.container.current).unwrap();
        root.render("b").unwrap();
        let third = root.with_inner(|inner| inner.container.current).unwrap();

        assert_ne!(first, second);
        assert_eq!(first, third);
    }

    #[test]
    fn arena_stays_bounded() {
        let (_, _, root) = setup();
        let list = |n: usize| Child::List((0..n).map(|i| Element::host("li").key(i).into()).collect());

        root.render(list(10)).unwrap();
        root.render(list(10)).unwrap();
        let steady = root.node_count().unwrap();
        for _ in 0..5 {
            root.render(list(10)).unwrap();
        }
        assert_eq!(root.node_count(), Some(steady));

        root.render(list(2)).unwrap();
        assert!(root.node_count().unwrap() < steady);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let host = MemoryHost::new();
        let container = host.create_container("root");
        let config = ReconcilerConfig {
            max_nested_updates: 0,
            ..ReconcilerConfig::default()
        };
        assert!(matches!(
            Root::with_config(host, container, config),
            Err(ReconcileError::InvalidConfig(_))
        ));
    }
}

//! State Hooks
//!
//! Components keep state across renders through hooks. Each function
//! component node stores an ordered list of [`StateHook`] cells; a render
//! walks that list positionally, so a component must call the same hooks in
//! the same order every time.
//!
//! # Mount and update
//!
//! The work loop hands every component a [`Hooks`] context. Its mode is
//! fixed for the whole call:
//!
//! - **Mount** (the node has no current counterpart): each hook call appends
//!   a new cell with a fresh update queue and dispatcher.
//! - **Update**: each hook call pairs with the cell at the same position in
//!   the current node, copies its queue and dispatcher, and applies the
//!   pending update.
//!
//! Because hooks are only reachable through the context argument, calling a
//! hook outside a render does not compile.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::element::{Child, Component};
//!
//! let counter = Component::new("Counter", |hooks, _props| {
//!     let (count, _set_count) = hooks.use_state(0)?;
//!     Ok(Child::from(count))
//! });
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};

use tracing::warn;

use crate::config::HookMismatchPolicy;
use crate::error::ReconcileError;
use crate::fiber::NodeId;
use crate::root::RootShared;
use crate::update_queue::{process_update, Update, UpdateQueue};

/// Type-erased state held by a hook.
pub(crate) type StateValue = Arc<dyn Any + Send + Sync>;

/// Which half of the hook protocol a render runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookMode {
    Mount,
    Update,
}

/// A persistent state cell of a function component.
#[derive(Clone)]
pub struct StateHook {
    pub(crate) memoized_state: StateValue,
    pub(crate) queue: Arc<UpdateQueue<StateValue>>,
    pub(crate) dispatch: Dispatcher,
}

impl StateHook {
    /// The committed value, if it has type `T`.
    pub fn value<T: Clone + 'static>(&self) -> Option<T> {
        self.memoized_state.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for StateHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHook")
            .field("queue", &self.queue)
            .field("node", &self.dispatch.node)
            .finish()
    }
}

/// Binds a hook's queue to the node that owns it and the root to re-render.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    node: NodeId,
    queue: Arc<UpdateQueue<StateValue>>,
    root: Weak<RootShared>,
}

impl Dispatcher {
    fn dispatch(&self, update: Update<StateValue>) -> Result<(), ReconcileError> {
        self.queue.enqueue(update);
        match self.root.upgrade() {
            Some(root) => root.schedule_update(self.node),
            None => {
                warn!(node = %self.node, "state update dropped: root no longer exists");
                Ok(())
            }
        }
    }
}

/// Setter returned by [`Hooks::use_state`].
///
/// Each call enqueues an update and synchronously re-renders the root.
pub struct SetState<T> {
    dispatcher: Dispatcher,
    _marker: PhantomData<fn(T)>,
}

impl<T> SetState<T>
where
    T: Send + Sync + 'static,
{
    fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            _marker: PhantomData,
        }
    }

    /// Replace the state.
    pub fn set(&self, value: T) -> Result<(), ReconcileError> {
        let state: StateValue = Arc::new(value);
        self.dispatcher.dispatch(Update::replace(state))
    }

    /// Compute the next state from the current one.
    pub fn update<F>(&self, f: F) -> Result<(), ReconcileError>
    where
        F: FnOnce(&T) -> T + Send + 'static,
    {
        self.dispatcher
            .dispatch(Update::reduce(move |prev: &StateValue| -> StateValue {
                match prev.downcast_ref::<T>() {
                    Some(value) => Arc::new(f(value)),
                    None => Arc::clone(prev),
                }
            }))
    }
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState")
            .field("node", &self.dispatcher.node)
            .finish()
    }
}

/// Hook context passed to a component for one render.
pub struct Hooks<'a> {
    mode: HookMode,
    node: NodeId,
    component: &'a str,
    previous: &'a [StateHook],
    built: Vec<StateHook>,
    root: &'a Weak<RootShared>,
    policy: HookMismatchPolicy,
}

impl<'a> Hooks<'a> {
    pub(crate) fn new(
        mode: HookMode,
        node: NodeId,
        component: &'a str,
        previous: &'a [StateHook],
        root: &'a Weak<RootShared>,
        policy: HookMismatchPolicy,
    ) -> Self {
        Self {
            mode,
            node,
            component,
            previous,
            built: Vec::with_capacity(previous.len()),
            root,
            policy,
        }
    }

    /// Whether this render mounts or updates the component.
    pub fn mode(&self) -> HookMode {
        self.mode
    }

    /// Declare a state cell initialized to `initial` on mount.
    pub fn use_state<T>(&mut self, initial: T) -> Result<(T, SetState<T>), ReconcileError>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.use_state_with(move || initial)
    }

    /// Like [`Hooks::use_state`], but the initial value is computed only on mount.
    pub fn use_state_with<T, F>(&mut self, init: F) -> Result<(T, SetState<T>), ReconcileError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        match self.mode {
            HookMode::Mount => Ok(self.mount_state(init)),
            HookMode::Update => self.update_state(init),
        }
    }

    fn mount_state<T, F>(&mut self, init: F) -> (T, SetState<T>)
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let value = init();
        let queue = Arc::new(UpdateQueue::new());
        let dispatch = Dispatcher {
            node: self.node,
            queue: Arc::clone(&queue),
            root: self.root.clone(),
        };
        self.built.push(StateHook {
            memoized_state: Arc::new(value.clone()),
            queue,
            dispatch: dispatch.clone(),
        });
        (value, SetState::new(dispatch))
    }

    fn update_state<T, F>(&mut self, init: F) -> Result<(T, SetState<T>), ReconcileError>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        let index = self.built.len();
        let previous_hooks: &'a [StateHook] = self.previous;
        let Some(previous) = previous_hooks.get(index) else {
            let err = ReconcileError::HookCountMismatch {
                component: self.component.to_string(),
                previous: self.previous.len(),
                rendered: index + 1,
            };
            return match self.policy {
                HookMismatchPolicy::Error => Err(err),
                HookMismatchPolicy::Warn => {
                    warn!(component = self.component, "{err}; mounting the extra hook");
                    Ok(self.mount_state(init))
                }
            };
        };

        let state = process_update(
            Arc::clone(&previous.memoized_state),
            previous.queue.take_pending(),
        );
        let value = state.downcast_ref::<T>().cloned().ok_or_else(|| {
            ReconcileError::HookTypeMismatch {
                component: self.component.to_string(),
                index,
                expected: type_name::<T>(),
            }
        })?;

        self.built.push(StateHook {
            memoized_state: state,
            queue: Arc::clone(&previous.queue),
            dispatch: previous.dispatch.clone(),
        });
        Ok((value, SetState::new(previous.dispatch.clone())))
    }

    /// Check the hook count and hand back the new hook list.
    pub(crate) fn finish(self) -> Result<Vec<StateHook>, ReconcileError> {
        if self.mode == HookMode::Update && self.built.len() < self.previous.len() {
            let err = ReconcileError::HookCountMismatch {
                component: self.component.to_string(),
                previous: self.previous.len(),
                rendered: self.built.len(),
            };
            match self.policy {
                HookMismatchPolicy::Error => return Err(err),
                HookMismatchPolicy::Warn => warn!(component = self.component, "{err}"),
            }
        }
        Ok(self.built)
    }
}

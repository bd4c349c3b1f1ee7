//! Update Queue
//!
//! A single-slot cell holding the next state change for a root or a state
//! hook, and the reducer that applies it.
//!
//! Enqueuing overwrites whatever is pending: there is no batching, the last
//! write wins. Root renders and hook dispatches each trigger a synchronous
//! render right after enqueuing, so in practice a slot holds at most one
//! update. Updates dispatched while a render is already running are the
//! exception; see [`Root`](crate::Root) for how those are coalesced.

use std::fmt;

use parking_lot::Mutex;

/// A reducer from the previous state to the next one.
pub type Reducer<S> = Box<dyn FnOnce(&S) -> S + Send>;

/// A pending state change: a replacement value or a reducer.
pub enum Update<S> {
    Replace(S),
    Reduce(Reducer<S>),
}

impl<S> Update<S> {
    /// An update that replaces the state.
    pub fn replace(value: S) -> Self {
        Self::Replace(value)
    }

    /// An update computed from the previous state.
    pub fn reduce<F>(reducer: F) -> Self
    where
        F: FnOnce(&S) -> S + Send + 'static,
    {
        Self::Reduce(Box::new(reducer))
    }
}

impl<S> fmt::Debug for Update<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace(_) => f.write_str("Update::Replace"),
            Self::Reduce(_) => f.write_str("Update::Reduce"),
        }
    }
}

/// Single pending-update slot shared between the paired nodes of a root or hook.
pub struct UpdateQueue<S> {
    pending: Mutex<Option<Update<S>>>,
}

impl<S> UpdateQueue<S> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(None),
        }
    }

    /// Store `update`, replacing any pending one.
    pub fn enqueue(&self, update: Update<S>) {
        *self.pending.lock() = Some(update);
    }

    /// Take the pending update, leaving the slot empty.
    pub fn take_pending(&self) -> Option<Update<S>> {
        self.pending.lock().take()
    }

    /// Whether an update is waiting.
    pub fn has_pending(&self) -> bool {
        self.pending.lock().is_some()
    }
}

impl<S> Default for UpdateQueue<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> fmt::Debug for UpdateQueue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateQueue")
            .field("pending", &self.has_pending())
            .finish()
    }
}

/// Apply `pending` to `base`. Without an update the base state is kept.
pub fn process_update<S>(base: S, pending: Option<Update<S>>) -> S {
    match pending {
        None => base,
        Some(Update::Replace(value)) => value,
        Some(Update::Reduce(reducer)) => reducer(&base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_overwrites_pending() {
        let queue = UpdateQueue::new();
        queue.enqueue(Update::replace(1));
        queue.enqueue(Update::replace(2));

        let state = process_update(0, queue.take_pending());
        assert_eq!(state, 2);
        assert!(!queue.has_pending());
    }

    #[test]
    fn reducer_sees_base_state() {
        let state = process_update(10, Some(Update::reduce(|n: &i32| n + 5)));
        assert_eq!(state, 15);
    }

    #[test]
    fn no_update_keeps_base() {
        let queue: UpdateQueue<&str> = UpdateQueue::new();
        assert_eq!(process_update("base", queue.take_pending()), "base");
    }
}

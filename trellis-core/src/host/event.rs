//! Delegated events.
//!
//! Handlers live in element props under `on<Event>` (bubble phase) and
//! `on<Event>Capture` (capture phase), e.g. `onClick` / `onClickCapture`.

use std::fmt;
use std::sync::Arc;

use super::HostId;

/// Callback stored in props and invoked by the host's event delegation.
pub type EventHandler = Arc<dyn Fn(&mut Event) + Send + Sync>;

/// An event travelling through the host tree.
#[derive(Debug, Clone)]
pub struct Event {
    /// Event name without the `on` prefix, e.g. `"click"`.
    pub event_type: String,
    /// Instance the event was dispatched on.
    pub target: HostId,
    /// Instance whose handler is currently running.
    pub current_target: HostId,
    propagation_stopped: bool,
}

impl Event {
    /// Create an event aimed at `target`.
    pub fn new(event_type: impl Into<String>, target: HostId) -> Self {
        Self {
            event_type: event_type.into(),
            target,
            current_target: target,
            propagation_stopped: false,
        }
    }

    /// Stop the remaining handlers of the current flow from running.
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Whether [`Event::stop_propagation`] was called.
    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Prop names for this event: `(capture, bubble)`.
    pub fn handler_names(&self) -> (String, String) {
        let mut chars = self.event_type.chars();
        let capitalized = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        };
        (format!("on{capitalized}Capture"), format!("on{capitalized}"))
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} on {:?}", self.event_type, self.target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_names_follow_prop_convention() {
        let event = Event::new("click", HostId::new(1));
        assert_eq!(
            event.handler_names(),
            ("onClickCapture".to_string(), "onClick".to_string())
        );
    }

    #[test]
    fn stop_propagation_sticks() {
        let mut event = Event::new("keydown", HostId::new(1));
        assert!(!event.is_propagation_stopped());
        event.stop_propagation();
        assert!(event.is_propagation_stopped());
    }
}

//! Error types for the reconciler.
//!
//! Everything that can abort a render or reject a configuration surfaces as a
//! [`ReconcileError`]. Unsupported descriptors are *not* errors: they are
//! logged and rendered as nothing.

use thiserror::Error;

/// Boxed error returned by component functions.
///
/// Components can return any error type; hook errors convert into it through
/// `?` like everything else.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Core reconciler errors.
#[derive(Error, Debug)]
pub enum ReconcileError {
    /// A component called a different number of hooks than in its previous render.
    #[error("`{component}` rendered {rendered} hooks, but {previous} on its previous render")]
    HookCountMismatch {
        component: String,
        previous: usize,
        rendered: usize,
    },

    /// The hook at `index` holds a value of another type than requested.
    #[error("hook #{index} in `{component}` does not hold a `{expected}`")]
    HookTypeMismatch {
        component: String,
        index: usize,
        expected: &'static str,
    },

    /// A component function returned an error.
    #[error("component `{component}` failed: {source}")]
    Component {
        component: String,
        #[source]
        source: BoxError,
    },

    /// A component function panicked during the begin phase.
    #[error("component `{component}` panicked: {message}")]
    ComponentPanicked { component: String, message: String },

    /// Updates kept being requested from inside the render loop.
    #[error("exceeded {limit} nested updates; a component is dispatching on every render")]
    TooManyNestedUpdates { limit: usize },

    /// A JSON descriptor could not be parsed.
    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ReconcileError {
    /// Whether this error was raised by the hook subsystem rather than user code.
    pub fn is_hook_misuse(&self) -> bool {
        match self {
            Self::HookCountMismatch { .. } | Self::HookTypeMismatch { .. } => true,
            Self::Component { source, .. } => source
                .downcast_ref::<ReconcileError>()
                .is_some_and(ReconcileError::is_hook_misuse),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hook_misuse_is_detected_through_component_wrapper() {
        let inner = ReconcileError::HookCountMismatch {
            component: "App".into(),
            previous: 1,
            rendered: 2,
        };
        let wrapped = ReconcileError::Component {
            component: "App".into(),
            source: Box::new(inner),
        };
        assert!(wrapped.is_hook_misuse());

        let plain = ReconcileError::Component {
            component: "App".into(),
            source: "boom".into(),
        };
        assert!(!plain.is_hook_misuse());
    }

    #[test]
    fn messages_name_the_component() {
        let err = ReconcileError::HookTypeMismatch {
            component: "Counter".into(),
            index: 0,
            expected: "i32",
        };
        assert_eq!(err.to_string(), "hook #0 in `Counter` does not hold a `i32`");
    }
}

//! Reconciler Configuration
//!
//! Runtime knobs for a root. Every field has a default, so an empty JSON
//! object is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// What to do when a component calls a different number of hooks than it
/// did on its previous render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookMismatchPolicy {
    /// Abort the render with [`ReconcileError::HookCountMismatch`].
    #[default]
    Error,
    /// Log a warning and keep rendering. Extra hooks are mounted fresh.
    Warn,
}

/// Configuration for a [`Root`](crate::Root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// How many extra passes a single render may run for updates dispatched
    /// while it was in progress.
    pub max_nested_updates: usize,

    /// Hook count mismatch handling.
    pub hook_mismatch: HookMismatchPolicy,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            max_nested_updates: 50,
            hook_mismatch: HookMismatchPolicy::Error,
        }
    }
}

impl ReconcilerConfig {
    /// Parse and validate a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ReconcileError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the work loop cannot run with.
    pub fn validate(&self) -> Result<(), ReconcileError> {
        if self.max_nested_updates == 0 {
            return Err(ReconcileError::InvalidConfig(
                "max_nested_updates must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

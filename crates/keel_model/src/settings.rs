//! Model settings

use serde::{Deserialize, Serialize};

/// Tunables for a [`World`](crate::World).
///
/// Missing fields fall back to their defaults when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Deepest allowed nesting of rule callbacks before dispatch gives up.
    pub max_dispatch_depth: usize,
    /// Log every rule firing at `debug` instead of `trace`.
    pub trace_dispatch: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            max_dispatch_depth: 256,
            trace_dispatch: false,
        }
    }
}

//! Plugin lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a plugin stub is in its lifecycle.
///
/// ```text
/// Unloaded <- Loaded -> Starting -> Started -> Stopping -> Stopped
///                          ^                                  |
///                          \----------------------------------/
/// ```
///
/// Stubs are created `Loaded`. `start` is legal from `Loaded` and `Stopped`,
/// `stop` only from `Started`. `Starting` and `Stopping` last while the
/// plugin's own callback runs; a failed callback returns to the state it
/// left. `Unloaded` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Unloaded,
    Loaded,
    Starting,
    Started,
    Stopping,
    Stopped,
}

impl LifecycleState {
    /// Returns true if `start` may be called from this state.
    pub fn can_start(self) -> bool {
        matches!(self, LifecycleState::Loaded | LifecycleState::Stopped)
    }

    /// Returns true if `stop` may be called from this state.
    pub fn can_stop(self) -> bool {
        self == LifecycleState::Started
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleState::Unloaded => "unloaded",
            LifecycleState::Loaded => "loaded",
            LifecycleState::Starting => "starting",
            LifecycleState::Started => "started",
            LifecycleState::Stopping => "stopping",
            LifecycleState::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(LifecycleState::Loaded.can_start());
        assert!(LifecycleState::Stopped.can_start());
        assert!(!LifecycleState::Started.can_start());
        assert!(!LifecycleState::Unloaded.can_start());
        assert!(!LifecycleState::Starting.can_start());
        assert!(!LifecycleState::Stopping.can_start());

        assert!(LifecycleState::Started.can_stop());
        assert!(!LifecycleState::Loaded.can_stop());
        assert!(!LifecycleState::Unloaded.can_stop());
        assert!(!LifecycleState::Starting.can_stop());
        assert!(!LifecycleState::Stopping.can_stop());
    }
}

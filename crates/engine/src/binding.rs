//! Hook bindings.

use serde::{Deserialize, Serialize};

/// Binds one plugin to one hook, with ordering metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookBinding {
    /// Hook name.
    pub hook: String,

    /// Bound plugin id.
    #[serde(rename = "plugin")]
    pub plugin_id: String,

    /// Lower runs earlier.
    #[serde(default)]
    pub priority: i32,

    /// Run before the bindings of this plugin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,

    /// Run after the bindings of this plugin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,

    /// Registration sequence number, assigned by the hook table.
    #[serde(skip)]
    pub(crate) seq: u64,
}

impl HookBinding {
    /// Creates a binding with priority 0 and no constraints.
    pub fn new(hook: impl Into<String>, plugin_id: impl Into<String>) -> Self {
        Self {
            hook: hook.into(),
            plugin_id: plugin_id.into(),
            priority: 0,
            before: None,
            after: None,
            seq: 0,
        }
    }

    /// Sets the priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Runs this binding before those of `plugin_id`.
    pub fn with_before(mut self, plugin_id: impl Into<String>) -> Self {
        self.before = Some(plugin_id.into());
        self
    }

    /// Runs this binding after those of `plugin_id`.
    pub fn with_after(mut self, plugin_id: impl Into<String>) -> Self {
        self.after = Some(plugin_id.into());
        self
    }

    /// Position in registration order; earlier bindings have smaller numbers.
    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let binding = HookBinding::new("save", "fmt")
            .with_priority(-1)
            .with_before("lint")
            .with_after("parse");
        assert_eq!(binding.priority, -1);
        assert_eq!(binding.before.as_deref(), Some("lint"));
        assert_eq!(binding.after.as_deref(), Some("parse"));
    }

    #[test]
    fn test_parse_bindings_file_entry() {
        let binding: HookBinding =
            serde_json::from_str(r#"{ "hook": "save", "plugin": "fmt", "before": "lint" }"#)
                .unwrap();
        assert_eq!(binding, HookBinding::new("save", "fmt").with_before("lint"));
    }
}

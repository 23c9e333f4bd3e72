//! Error types for hookhost.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::aggregate::AggregateError;
use crate::context::Interrupted;
use crate::lifecycle::LifecycleState;

/// Result type alias for hookhost operations.
pub type Result<T> = std::result::Result<T, HostError>;

/// Structural problems in a plugin descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ValidationError {
    #[error("plugin name must not be empty")]
    #[diagnostic(code(hookhost::descriptor::empty_name))]
    EmptyName,

    #[error("plugin id must not be empty")]
    #[diagnostic(code(hookhost::descriptor::empty_id))]
    EmptyId,

    #[error("start command must not be empty")]
    #[diagnostic(code(hookhost::descriptor::empty_command))]
    EmptyCommand,
}

/// Failure reported by a plugin handler while it runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct InvokeError {
    message: String,
}

impl InvokeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Main error type for hookhost.
#[derive(Debug, Error, Diagnostic)]
pub enum HostError {
    #[error("failed to read plugins dir: {path}: {source}")]
    #[diagnostic(code(hookhost::scan::read_dir))]
    ReadPluginsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open plugin descriptor: {path}: {source}")]
    #[diagnostic(code(hookhost::load::open))]
    OpenDescriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read plugin descriptor: {path}: {source}")]
    #[diagnostic(code(hookhost::load::read))]
    ReadDescriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode plugin descriptor: {path}: {source}")]
    #[diagnostic(code(hookhost::load::decode))]
    DecodeDescriptor {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("plugin is not valid: {path}: {source}")]
    #[diagnostic(code(hookhost::load::invalid))]
    InvalidDescriptor {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error("plugin '{plugin}' requires host version {required}, but this host is version {host}")]
    #[diagnostic(
        code(hookhost::load::incompatible),
        help("upgrade the host or disable `enforceMinHostVersion`")
    )]
    IncompatibleHostVersion {
        plugin: String,
        required: u32,
        host: u32,
    },

    #[error("plugin id '{id}' from {path} is already used by {existing}")]
    #[diagnostic(
        code(hookhost::load::duplicate_id),
        help("declare a distinct `id` in one of the descriptors")
    )]
    DuplicatePluginId {
        id: String,
        path: PathBuf,
        existing: PathBuf,
    },

    #[error("cyclic ordering constraint on hook '{hook}' between plugins: {}", .plugins.join(", "))]
    #[diagnostic(code(hookhost::order::cycle))]
    CyclicOrderingConstraint { hook: String, plugins: Vec<String> },

    #[error("plugin '{0}' not found")]
    #[diagnostic(code(hookhost::registry::not_found))]
    PluginNotFound(String),

    #[error("cannot {action} plugin '{plugin}' while it is {state}")]
    #[diagnostic(code(hookhost::lifecycle::transition))]
    InvalidLifecycleTransition {
        plugin: String,
        action: &'static str,
        state: LifecycleState,
    },

    #[error("failed to {action} plugin '{plugin}': {source}")]
    #[diagnostic(code(hookhost::lifecycle::callback))]
    Lifecycle {
        plugin: String,
        action: &'static str,
        #[source]
        source: InvokeError,
    },

    #[error("{action} of plugin '{plugin}' interrupted: {reason}")]
    #[diagnostic(code(hookhost::lifecycle::interrupted))]
    LifecycleInterrupted {
        plugin: String,
        action: &'static str,
        #[source]
        reason: Interrupted,
    },

    #[error("plugin '{plugin}' bound to hook '{hook}' is {state}, not started")]
    #[diagnostic(code(hookhost::dispatch::not_started))]
    PluginNotStarted {
        hook: String,
        plugin: String,
        state: LifecycleState,
    },

    #[error("plugin '{plugin}' failed on hook '{hook}': {source}")]
    #[diagnostic(code(hookhost::dispatch::invoke))]
    Invocation {
        hook: String,
        plugin: String,
        #[source]
        source: InvokeError,
    },

    #[error("hook '{hook}' interrupted before plugin '{plugin}': {reason}")]
    #[diagnostic(code(hookhost::dispatch::interrupted))]
    HookInterrupted {
        hook: String,
        plugin: String,
        #[source]
        reason: Interrupted,
    },

    #[error("failed to read file: {path}: {source}")]
    #[diagnostic(code(hookhost::config::read))]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode file: {path}: {source}")]
    #[diagnostic(code(hookhost::config::decode))]
    DecodeConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Aggregate(#[from] AggregateError),
}

impl HostError {
    /// Returns the leaf errors this error stands for.
    ///
    /// Aggregates yield their leaves; any other error yields itself.
    pub fn leaves(&self) -> Vec<&HostError> {
        match self {
            HostError::Aggregate(aggregate) => aggregate.iter().collect(),
            other => vec![other],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_plugins() {
        let err = HostError::CyclicOrderingConstraint {
            hook: "save".to_string(),
            plugins: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "cyclic ordering constraint on hook 'save' between plugins: a, b"
        );
    }

    #[test]
    fn test_invalid_descriptor_includes_reason() {
        let err = HostError::InvalidDescriptor {
            path: PathBuf::from("/plugins/x/plugin.json"),
            source: ValidationError::EmptyCommand,
        };
        assert_eq!(
            err.to_string(),
            "plugin is not valid: /plugins/x/plugin.json: start command must not be empty"
        );
    }

    #[test]
    fn test_interrupted_messages() {
        let err = HostError::HookInterrupted {
            hook: "save".to_string(),
            plugin: "fmt".to_string(),
            reason: Interrupted::DeadlineExceeded,
        };
        assert_eq!(
            err.to_string(),
            "hook 'save' interrupted before plugin 'fmt': deadline exceeded"
        );

        let err = HostError::LifecycleInterrupted {
            plugin: "fmt".to_string(),
            action: "start",
            reason: Interrupted::Cancelled,
        };
        assert_eq!(err.to_string(), "start of plugin 'fmt' interrupted: cancelled");
    }

    #[test]
    fn test_leaves_of_plain_error() {
        let err = HostError::PluginNotFound("x".to_string());
        assert_eq!(err.leaves().len(), 1);
    }
}

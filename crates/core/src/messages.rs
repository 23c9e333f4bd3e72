//! User-facing message rendering.
//!
//! Errors carry structured data; turning them into display text goes through a
//! [`Messages`] value that is handed to whoever needs it. A [`Catalog`]
//! supplies translated templates keyed by [`MessageKey`]; anything the catalog
//! does not cover falls back to the built-in English text.
//!
//! Templates name their arguments with `{name}` placeholders:
//!
//! ```
//! use hookhost_core::{HostError, MapCatalog, MessageKey, Messages};
//!
//! let catalog = MapCatalog::new().with(MessageKey::PluginNotFound, "插件 {plugin} 不存在");
//! let messages = Messages::new(catalog);
//!
//! let err = HostError::PluginNotFound("echo".into());
//! assert_eq!(messages.render(&err), "插件 echo 不存在");
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::aggregate::{AggregateError, format_aggregate};
use crate::error::{HostError, Result, ValidationError};

/// Identifies one translatable message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    ReadPluginsDir,
    OpenDescriptor,
    ReadDescriptor,
    DecodeDescriptor,
    InvalidDescriptor,
    IncompatibleHostVersion,
    DuplicatePluginId,
    CyclicOrderingConstraint,
    PluginNotFound,
    InvalidLifecycleTransition,
    Lifecycle,
    LifecycleInterrupted,
    PluginNotStarted,
    Invocation,
    HookInterrupted,
    ReadConfig,
    DecodeConfig,
    EmptyName,
    EmptyId,
    EmptyCommand,
    Aggregate,
}

impl MessageKey {
    pub const ALL: &'static [MessageKey] = &[
        MessageKey::ReadPluginsDir,
        MessageKey::OpenDescriptor,
        MessageKey::ReadDescriptor,
        MessageKey::DecodeDescriptor,
        MessageKey::InvalidDescriptor,
        MessageKey::IncompatibleHostVersion,
        MessageKey::DuplicatePluginId,
        MessageKey::CyclicOrderingConstraint,
        MessageKey::PluginNotFound,
        MessageKey::InvalidLifecycleTransition,
        MessageKey::Lifecycle,
        MessageKey::LifecycleInterrupted,
        MessageKey::PluginNotStarted,
        MessageKey::Invocation,
        MessageKey::HookInterrupted,
        MessageKey::ReadConfig,
        MessageKey::DecodeConfig,
        MessageKey::EmptyName,
        MessageKey::EmptyId,
        MessageKey::EmptyCommand,
        MessageKey::Aggregate,
    ];

    /// Stable identifier used in catalog files.
    pub fn id(self) -> &'static str {
        match self {
            MessageKey::ReadPluginsDir => "plugins.read-dir",
            MessageKey::OpenDescriptor => "plugin.open",
            MessageKey::ReadDescriptor => "plugin.read",
            MessageKey::DecodeDescriptor => "plugin.decode",
            MessageKey::InvalidDescriptor => "plugin.invalid",
            MessageKey::IncompatibleHostVersion => "plugin.incompatible",
            MessageKey::DuplicatePluginId => "plugin.duplicate-id",
            MessageKey::CyclicOrderingConstraint => "hook.cycle",
            MessageKey::PluginNotFound => "plugin.not-found",
            MessageKey::InvalidLifecycleTransition => "plugin.transition",
            MessageKey::Lifecycle => "plugin.lifecycle",
            MessageKey::LifecycleInterrupted => "plugin.interrupted",
            MessageKey::PluginNotStarted => "hook.not-started",
            MessageKey::Invocation => "hook.invoke",
            MessageKey::HookInterrupted => "hook.interrupted",
            MessageKey::ReadConfig => "config.read",
            MessageKey::DecodeConfig => "config.decode",
            MessageKey::EmptyName => "plugin.name-empty",
            MessageKey::EmptyId => "plugin.id-empty",
            MessageKey::EmptyCommand => "plugin.command-empty",
            MessageKey::Aggregate => "errors",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|key| key.id() == id)
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Source of translated message templates.
pub trait Catalog: Send + Sync {
    /// Returns the template for `key`, or `None` to use the built-in text.
    fn template(&self, key: MessageKey) -> Option<&str>;
}

/// A catalog backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MapCatalog {
    templates: HashMap<MessageKey, String>,
}

impl MapCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the template for `key`.
    pub fn with(mut self, key: MessageKey, template: impl Into<String>) -> Self {
        self.templates.insert(key, template.into());
        self
    }

    /// Parses a JSON object mapping message ids to templates.
    ///
    /// Ids that do not name a known message are ignored.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let raw: HashMap<String, String> = serde_json::from_str(json)?;
        let templates = raw
            .into_iter()
            .filter_map(|(id, template)| MessageKey::from_id(&id).map(|key| (key, template)))
            .collect();
        Ok(Self { templates })
    }

    /// Loads a catalog from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| HostError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| HostError::DecodeConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl Catalog for MapCatalog {
    fn template(&self, key: MessageKey) -> Option<&str> {
        self.templates.get(&key).map(|s| s.as_str())
    }
}

/// Renders errors into display text through an optional catalog.
#[derive(Clone, Default)]
pub struct Messages {
    catalog: Option<Arc<dyn Catalog>>,
}

impl fmt::Debug for Messages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messages")
            .field("catalog", &self.catalog.is_some())
            .finish()
    }
}

type Args = Vec<(&'static str, String)>;

impl Messages {
    /// Creates messages backed by `catalog`.
    pub fn new(catalog: impl Catalog + 'static) -> Self {
        Self {
            catalog: Some(Arc::new(catalog)),
        }
    }

    /// Built-in English text only.
    pub fn english() -> Self {
        Self::default()
    }

    /// Renders an error, translating nested leaves and causes as well.
    pub fn render(&self, error: &HostError) -> String {
        if let HostError::Aggregate(aggregate) = error {
            return self.render_aggregate(aggregate);
        }
        let (key, args) = self.arguments(error);
        self.fill(key, &args).unwrap_or_else(|| error.to_string())
    }

    pub fn render_aggregate(&self, aggregate: &AggregateError) -> String {
        let leaves: Vec<String> = aggregate.iter().map(|e| self.render(e)).collect();
        let args: Args = vec![
            ("count", aggregate.len().to_string()),
            ("errors", leaves.join(", ")),
        ];
        self.fill(MessageKey::Aggregate, &args)
            .unwrap_or_else(|| format_aggregate(aggregate.len(), &leaves))
    }

    pub fn render_validation(&self, error: &ValidationError) -> String {
        let key = match error {
            ValidationError::EmptyName => MessageKey::EmptyName,
            ValidationError::EmptyId => MessageKey::EmptyId,
            ValidationError::EmptyCommand => MessageKey::EmptyCommand,
        };
        self.fill(key, &[]).unwrap_or_else(|| error.to_string())
    }

    fn fill(&self, key: MessageKey, args: &[(&'static str, String)]) -> Option<String> {
        let template = self.catalog.as_ref()?.template(key)?;
        Some(substitute(template, args))
    }

    fn arguments(&self, error: &HostError) -> (MessageKey, Args) {
        fn path(p: &Path) -> String {
            p.display().to_string()
        }

        match error {
            HostError::ReadPluginsDir { path: p, source } => (
                MessageKey::ReadPluginsDir,
                vec![("path", path(p)), ("reason", source.to_string())],
            ),
            HostError::OpenDescriptor { path: p, source } => (
                MessageKey::OpenDescriptor,
                vec![("path", path(p)), ("reason", source.to_string())],
            ),
            HostError::ReadDescriptor { path: p, source } => (
                MessageKey::ReadDescriptor,
                vec![("path", path(p)), ("reason", source.to_string())],
            ),
            HostError::DecodeDescriptor { path: p, source } => (
                MessageKey::DecodeDescriptor,
                vec![("path", path(p)), ("reason", source.to_string())],
            ),
            HostError::InvalidDescriptor { path: p, source } => (
                MessageKey::InvalidDescriptor,
                vec![("path", path(p)), ("reason", self.render_validation(source))],
            ),
            HostError::IncompatibleHostVersion {
                plugin,
                required,
                host,
            } => (
                MessageKey::IncompatibleHostVersion,
                vec![
                    ("plugin", plugin.clone()),
                    ("required", required.to_string()),
                    ("host", host.to_string()),
                ],
            ),
            HostError::DuplicatePluginId { id, path: p, existing } => (
                MessageKey::DuplicatePluginId,
                vec![
                    ("id", id.clone()),
                    ("path", path(p)),
                    ("existing", path(existing)),
                ],
            ),
            HostError::CyclicOrderingConstraint { hook, plugins } => (
                MessageKey::CyclicOrderingConstraint,
                vec![("hook", hook.clone()), ("plugins", plugins.join(", "))],
            ),
            HostError::PluginNotFound(plugin) => {
                (MessageKey::PluginNotFound, vec![("plugin", plugin.clone())])
            }
            HostError::InvalidLifecycleTransition {
                plugin,
                action,
                state,
            } => (
                MessageKey::InvalidLifecycleTransition,
                vec![
                    ("plugin", plugin.clone()),
                    ("action", action.to_string()),
                    ("state", state.to_string()),
                ],
            ),
            HostError::Lifecycle {
                plugin,
                action,
                source,
            } => (
                MessageKey::Lifecycle,
                vec![
                    ("plugin", plugin.clone()),
                    ("action", action.to_string()),
                    ("reason", source.to_string()),
                ],
            ),
            HostError::LifecycleInterrupted {
                plugin,
                action,
                reason,
            } => (
                MessageKey::LifecycleInterrupted,
                vec![
                    ("plugin", plugin.clone()),
                    ("action", action.to_string()),
                    ("reason", reason.to_string()),
                ],
            ),
            HostError::PluginNotStarted {
                hook,
                plugin,
                state,
            } => (
                MessageKey::PluginNotStarted,
                vec![
                    ("hook", hook.clone()),
                    ("plugin", plugin.clone()),
                    ("state", state.to_string()),
                ],
            ),
            HostError::Invocation {
                hook,
                plugin,
                source,
            } => (
                MessageKey::Invocation,
                vec![
                    ("hook", hook.clone()),
                    ("plugin", plugin.clone()),
                    ("reason", source.to_string()),
                ],
            ),
            HostError::HookInterrupted {
                hook,
                plugin,
                reason,
            } => (
                MessageKey::HookInterrupted,
                vec![
                    ("hook", hook.clone()),
                    ("plugin", plugin.clone()),
                    ("reason", reason.to_string()),
                ],
            ),
            HostError::ReadConfig { path: p, source } => (
                MessageKey::ReadConfig,
                vec![("path", path(p)), ("reason", source.to_string())],
            ),
            HostError::DecodeConfig { path: p, source } => (
                MessageKey::DecodeConfig,
                vec![("path", path(p)), ("reason", source.to_string())],
            ),
            HostError::Aggregate(aggregate) => (
                MessageKey::Aggregate,
                vec![("count", aggregate.len().to_string())],
            ),
        }
    }
}

/// Replaces the `{name}` placeholders of `template` in a single left-to-right
/// pass. Substituted values are never scanned again, and placeholders with no
/// matching argument are kept as written.
fn substitute(template: &str, args: &[(&'static str, String)]) -> String {
    let mut text = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            rest = &rest[open..];
            break;
        };

        let name = &after[..close];
        match args.iter().find(|(arg, _)| *arg == name) {
            Some((_, value)) => {
                text.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                // not a placeholder we know; keep the brace and rescan after it
                text.push('{');
                rest = after;
            }
        }
    }

    text.push_str(rest);
    text
}

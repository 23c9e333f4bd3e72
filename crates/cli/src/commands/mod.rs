//! CLI command implementations.

pub mod list;
pub mod order;
pub mod start;
pub mod validate;

use std::path::{Path, PathBuf};

use hookhost_core::{AggregateError, HostConfig, Messages};
use hookhost_plugin::PluginRegistry;
use miette::{Report, miette};

use crate::output;

/// Settings shared by every command.
pub struct Context {
    pub config: HostConfig,
    pub messages: Messages,
}

impl Context {
    pub fn new(config: HostConfig, messages: Messages) -> Self {
        Self { config, messages }
    }

    /// An empty registry following the host configuration.
    pub fn registry(&self) -> PluginRegistry {
        PluginRegistry::from_config(&self.config, self.messages.clone())
    }

    /// `--root` if given, else the configured plugins directory.
    pub fn plugins_root(&self, root: Option<&Path>) -> PathBuf {
        root.map(Path::to_path_buf)
            .unwrap_or_else(|| self.config.plugins_dir())
    }

    /// Prints every leaf of `aggregate` and turns it into the command's error.
    pub fn failure(&self, summary: &str, aggregate: &AggregateError) -> Report {
        output::error(summary);
        let leaves: Vec<String> = aggregate.iter().map(|e| self.messages.render(e)).collect();
        output::error_list(&leaves);
        miette!("{} ({} errors)", summary, aggregate.len())
    }
}

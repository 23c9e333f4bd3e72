//! Plugin registry: discovery, loading and lookup of plugin stubs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hookhost_core::config::DEFAULT_DESCRIPTOR_FILE;
use hookhost_core::{AggregateError, CallContext, HostConfig, HostError, Messages, Result, combine};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::manifest::{PluginDescriptor, PluginManifest};
use crate::stub::PluginStub;
use crate::transport::{DetachedTransport, Transport};

/// Owns every known plugin, keyed by plugin id.
///
/// ```text
/// root/
/// |-- echo/
/// |   |-- echo-exe
/// |   \-- plugin.json
/// \-- upper/plugin.json
/// ```
pub struct PluginRegistry {
    plugins: RwLock<BTreeMap<String, Arc<PluginStub>>>,
    transport: Arc<dyn Transport>,
    messages: Messages,
    descriptor_file: String,
    host_version: u32,
    enforce_min_host_version: bool,
}

impl PluginRegistry {
    /// Creates an empty registry with a detached transport.
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(BTreeMap::new()),
            transport: Arc::new(DetachedTransport),
            messages: Messages::english(),
            descriptor_file: DEFAULT_DESCRIPTOR_FILE.to_string(),
            host_version: 1,
            enforce_min_host_version: false,
        }
    }

    /// Creates a registry following the host configuration.
    pub fn from_config(config: &HostConfig, messages: Messages) -> Self {
        Self::new()
            .with_messages(messages)
            .with_descriptor_file(config.descriptor_file.clone())
            .with_host_version(config.host_version, config.enforce_min_host_version)
    }

    /// Sets the transport used to connect loaded plugins.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the renderer used for log output.
    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    /// Sets the descriptor file name looked up in each plugin directory.
    pub fn with_descriptor_file(mut self, name: impl Into<String>) -> Self {
        self.descriptor_file = name.into();
        self
    }

    /// Sets the host version and whether `minHostVersion` is enforced.
    pub fn with_host_version(mut self, version: u32, enforce: bool) -> Self {
        self.host_version = version;
        self.enforce_min_host_version = enforce;
        self
    }

    pub fn messages(&self) -> &Messages {
        &self.messages
    }

    /// Loads every immediate subdirectory of `root`.
    ///
    /// One broken plugin never stops its siblings from loading: every failure
    /// is collected and reported together, and plugins that loaded cleanly stay
    /// registered. Subdirectories are visited in name order.
    pub fn scan(&self, root: &Path) -> std::result::Result<Vec<Arc<PluginStub>>, AggregateError> {
        let entries = std::fs::read_dir(root).map_err(|source| {
            AggregateError::from(HostError::ReadPluginsDir {
                path: root.to_path_buf(),
                source,
            })
        })?;

        let mut errors = Vec::new();
        let mut dirs: Vec<PathBuf> = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_dir() {
                        dirs.push(path);
                    } else {
                        debug!(path = %path.display(), "Skipping non-directory entry");
                    }
                }
                Err(source) => errors.push(HostError::ReadPluginsDir {
                    path: root.to_path_buf(),
                    source,
                }),
            }
        }
        dirs.sort();

        let mut loaded = Vec::with_capacity(dirs.len());
        for dir in dirs {
            match self.load(&dir) {
                Ok(stub) => loaded.push(stub),
                Err(err) => {
                    warn!(dir = %dir.display(), "{}", self.messages.render(&err));
                    errors.push(err);
                }
            }
        }

        info!(
            root = %root.display(),
            loaded = loaded.len(),
            failed = errors.len(),
            "Plugin scan finished"
        );

        match combine(errors) {
            Some(aggregate) => Err(aggregate),
            None => Ok(loaded),
        }
    }

    /// Loads the plugin in `dir` and registers it.
    ///
    /// Loading the same directory again replaces the earlier stub. An id
    /// already taken by a plugin from another directory is rejected.
    pub fn load(&self, dir: &Path) -> Result<Arc<PluginStub>> {
        let path = dir.join(&self.descriptor_file);
        let manifest = PluginManifest::from_file(&path)?;
        let descriptor =
            manifest
                .validate(dir)
                .map_err(|source| HostError::InvalidDescriptor {
                    path: path.clone(),
                    source,
                })?;
        self.check_host_version(&descriptor)?;

        let handler = self.transport.connect(&descriptor);
        let stub = PluginStub::new(descriptor, handler);
        let stub = self.insert(stub)?;

        info!(
            plugin_id = %stub.id(),
            dir = %dir.display(),
            "Plugin loaded"
        );
        Ok(stub)
    }

    /// Registers a stub built elsewhere, e.g. an in-process plugin.
    ///
    /// A stub replaced by a reload is unloaded. If it fails to stop, the new
    /// stub stays registered and the stop failure is returned.
    pub fn insert(&self, stub: PluginStub) -> Result<Arc<PluginStub>> {
        let stub = Arc::new(stub);
        let previous = {
            let mut plugins = self.plugins.write();
            if let Some(existing) = plugins.get(stub.id()) {
                let existing_dir = existing.descriptor().directory();
                if existing_dir != stub.descriptor().directory() {
                    return Err(HostError::DuplicatePluginId {
                        id: stub.id().to_string(),
                        path: stub.descriptor().directory().to_path_buf(),
                        existing: existing_dir.to_path_buf(),
                    });
                }
            }
            plugins.insert(stub.id().to_string(), Arc::clone(&stub))
        };

        if let Some(previous) = previous {
            debug!(plugin_id = %stub.id(), "Replacing previously loaded plugin");
            if let Err(err) = previous.unload() {
                warn!(plugin_id = %stub.id(), "{}", self.messages.render(&err));
                return Err(err);
            }
        }
        Ok(stub)
    }

    /// Unregisters a plugin. The removed stub is `Unloaded`.
    ///
    /// Returns `Ok(None)` for an unknown id. An error means the plugin was
    /// removed but failed to stop.
    pub fn remove(&self, id: &str) -> Result<Option<Arc<PluginStub>>> {
        let Some(stub) = self.plugins.write().remove(id) else {
            return Ok(None);
        };
        let unloaded = stub.unload();
        info!(plugin_id = %id, "Plugin removed");
        if let Err(err) = unloaded {
            warn!(plugin_id = %id, "{}", self.messages.render(&err));
            return Err(err);
        }
        Ok(Some(stub))
    }

    /// Live lookup by id.
    pub fn get(&self, id: &str) -> Option<Arc<PluginStub>> {
        self.plugins.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.plugins.read().contains_key(id)
    }

    /// Plugin ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        self.plugins.read().keys().cloned().collect()
    }

    /// All stubs, sorted by id.
    pub fn plugins(&self) -> Vec<Arc<PluginStub>> {
        self.plugins.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    /// Starts one plugin.
    pub fn start(&self, id: &str) -> Result<()> {
        self.require(id)?.start()
    }

    /// Stops one plugin.
    pub fn stop(&self, id: &str) -> Result<()> {
        self.require(id)?.stop()
    }

    /// Starts every plugin that is not already running.
    pub fn start_all(&self) -> std::result::Result<(), AggregateError> {
        self.start_all_with(&CallContext::new())
    }

    /// Starts every plugin that is not already running, in id order.
    ///
    /// Once `ctx` is interrupted the remaining plugins are left alone and a
    /// single interruption error naming the next plugin is recorded.
    pub fn start_all_with(&self, ctx: &CallContext) -> std::result::Result<(), AggregateError> {
        let pending = self
            .plugins()
            .into_iter()
            .filter(|stub| stub.state().can_start());
        Self::each(pending, |stub| stub.start_with(ctx))
    }

    /// Stops every running plugin.
    pub fn stop_all(&self) -> std::result::Result<(), AggregateError> {
        self.stop_all_with(&CallContext::new())
    }

    /// Stops every running plugin, in id order, until `ctx` is interrupted.
    pub fn stop_all_with(&self, ctx: &CallContext) -> std::result::Result<(), AggregateError> {
        let pending = self.plugins().into_iter().filter(|stub| stub.is_started());
        Self::each(pending, |stub| stub.stop_with(ctx))
    }

    /// Runs `action` on each stub, stopping after the first interruption.
    fn each(
        stubs: impl Iterator<Item = Arc<PluginStub>>,
        action: impl Fn(&PluginStub) -> Result<()>,
    ) -> std::result::Result<(), AggregateError> {
        let mut errors = Vec::new();
        for stub in stubs {
            let result = action(stub.as_ref());
            let interrupted = matches!(result, Err(HostError::LifecycleInterrupted { .. }));
            errors.extend(result.err());
            if interrupted {
                break;
            }
        }
        match combine(errors) {
            Some(aggregate) => Err(aggregate),
            None => Ok(()),
        }
    }

    fn require(&self, id: &str) -> Result<Arc<PluginStub>> {
        self.get(id)
            .ok_or_else(|| HostError::PluginNotFound(id.to_string()))
    }

    fn check_host_version(&self, descriptor: &PluginDescriptor) -> Result<()> {
        if self.enforce_min_host_version && descriptor.min_host_version() > self.host_version {
            return Err(HostError::IncompatibleHostVersion {
                plugin: descriptor.id().to_string(),
                required: descriptor.min_host_version(),
                host: self.host_version,
            });
        }
        Ok(())
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

//! Hookhost Plugin - descriptors, stubs and the plugin registry.
//!
//! A plugin lives in its own directory with a `plugin.json` descriptor.
//! [`PluginRegistry::scan`] loads every such directory under a root, wraps
//! each validated [`PluginDescriptor`] in a [`PluginStub`] and indexes it by
//! id. How a stub actually reaches its plugin is up to the [`Transport`].

mod handler;
mod manifest;
mod registry;
mod stub;
mod transport;

pub use handler::{DetachedHandler, FnHandler, InvokeResult, PluginHandler};
pub use manifest::{DIR_PLACEHOLDER, PluginDescriptor, PluginManifest};
pub use registry::PluginRegistry;
pub use stub::PluginStub;
pub use transport::{DetachedTransport, InProcessTransport, Transport};

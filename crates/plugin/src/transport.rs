//! Turning descriptors into callable handlers.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::handler::{DetachedHandler, PluginHandler};
use crate::manifest::PluginDescriptor;

/// Connects a validated descriptor to something that can run its hooks.
pub trait Transport: Send + Sync {
    fn connect(&self, descriptor: &PluginDescriptor) -> Arc<dyn PluginHandler>;
}

/// Transport that never reaches a plugin; calls fail with a clear message.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetachedTransport;

impl Transport for DetachedTransport {
    fn connect(&self, descriptor: &PluginDescriptor) -> Arc<dyn PluginHandler> {
        Arc::new(DetachedHandler::new(descriptor.command().to_vec()))
    }
}

/// Transport serving handlers registered in this process, keyed by plugin id.
///
/// Descriptors with no registered handler get a detached one.
#[derive(Default)]
pub struct InProcessTransport {
    handlers: RwLock<HashMap<String, Arc<dyn PluginHandler>>>,
}

impl InProcessTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler used for plugin `id`.
    pub fn register(&self, id: impl Into<String>, handler: impl PluginHandler + 'static) {
        self.handlers.write().insert(id.into(), Arc::new(handler));
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_handler(self, id: impl Into<String>, handler: impl PluginHandler + 'static) -> Self {
        self.register(id, handler);
        self
    }
}

impl Transport for InProcessTransport {
    fn connect(&self, descriptor: &PluginDescriptor) -> Arc<dyn PluginHandler> {
        match self.handlers.read().get(descriptor.id()) {
            Some(handler) => Arc::clone(handler),
            None => DetachedTransport.connect(descriptor),
        }
    }
}

#[cfg(test)]
mod tests {
    use hookhost_core::CallContext;
    use serde_json::{Value, json};

    use super::*;
    use crate::handler::FnHandler;
    use crate::manifest::PluginManifest;

    fn descriptor(name: &str) -> PluginDescriptor {
        PluginManifest::new(name, ["run"]).validate("/p").unwrap()
    }

    #[test]
    fn test_in_process_uses_registered_handler() {
        let transport =
            InProcessTransport::new().with_handler("echo", FnHandler::new(|_, v, _| Ok(v)));

        let handler = transport.connect(&descriptor("echo"));
        assert_eq!(handler.invoke(&CallContext::new(), "h", json!(7), &[]).unwrap(), json!(7));
    }

    #[test]
    fn test_in_process_falls_back_to_detached() {
        let transport = InProcessTransport::new();
        let handler = transport.connect(&descriptor("other"));
        assert!(
            handler
                .invoke(&CallContext::new(), "h", Value::Null, &[])
                .is_err()
        );
    }
}

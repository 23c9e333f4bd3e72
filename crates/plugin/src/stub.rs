//! Host-side proxy for one plugin.

use std::fmt;
use std::sync::Arc;

use hookhost_core::{CallContext, HostError, Interrupted, LifecycleState, Result};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::info;

use crate::handler::PluginHandler;
use crate::manifest::PluginDescriptor;

/// Calling a stub is like calling the plugin itself.
///
/// The stub owns the plugin's descriptor and lifecycle state and forwards
/// hook calls to its handler once started. The state lock is never held
/// while the handler runs, so a slow callback does not block `state()` or
/// `invoke()` on the same stub.
pub struct PluginStub {
    descriptor: PluginDescriptor,
    handler: Arc<dyn PluginHandler>,
    state: Mutex<LifecycleState>,
}

impl PluginStub {
    /// Creates a stub in the `Loaded` state.
    pub fn new(descriptor: PluginDescriptor, handler: Arc<dyn PluginHandler>) -> Self {
        Self {
            descriptor,
            handler,
            state: Mutex::new(LifecycleState::Loaded),
        }
    }

    /// Creates a stub around an in-process handler.
    pub fn in_process(descriptor: PluginDescriptor, handler: impl PluginHandler + 'static) -> Self {
        Self::new(descriptor, Arc::new(handler))
    }

    pub fn id(&self) -> &str {
        self.descriptor.id()
    }

    pub fn descriptor(&self) -> &PluginDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub fn is_started(&self) -> bool {
        self.state() == LifecycleState::Started
    }

    /// Brings the plugin up with no deadline.
    pub fn start(&self) -> Result<()> {
        self.start_with(&CallContext::new())
    }

    /// Brings the plugin up. Legal from `Loaded` and `Stopped`.
    ///
    /// The stub is `Starting` while the handler's `on_start` runs. If the
    /// callback fails, or `ctx` is already interrupted, the state is left as
    /// it was.
    pub fn start_with(&self, ctx: &CallContext) -> Result<()> {
        ctx.check()
            .map_err(|reason| self.interrupted("start", reason))?;
        let previous = self.begin("start", LifecycleState::can_start, LifecycleState::Starting)?;

        if let Err(source) = self.handler.on_start(ctx) {
            self.finish(LifecycleState::Starting, previous);
            return Err(HostError::Lifecycle {
                plugin: self.id().to_string(),
                action: "start",
                source,
            });
        }

        if !self.finish(LifecycleState::Starting, LifecycleState::Started) {
            // Unloaded while starting: undo what on_start brought up.
            self.handler
                .on_stop(&CallContext::new())
                .map_err(|source| HostError::Lifecycle {
                    plugin: self.id().to_string(),
                    action: "stop",
                    source,
                })?;
            return Err(self.illegal("start", LifecycleState::Unloaded));
        }

        info!(plugin_id = %self.id(), "Plugin started");
        Ok(())
    }

    /// Tears the plugin down with no deadline.
    pub fn stop(&self) -> Result<()> {
        self.stop_with(&CallContext::new())
    }

    /// Tears the plugin down. Legal from `Started` only.
    ///
    /// The stub is `Stopping` while the handler's `on_stop` runs and goes back
    /// to `Started` if the callback fails.
    pub fn stop_with(&self, ctx: &CallContext) -> Result<()> {
        ctx.check()
            .map_err(|reason| self.interrupted("stop", reason))?;
        let previous = self.begin("stop", LifecycleState::can_stop, LifecycleState::Stopping)?;

        if let Err(source) = self.handler.on_stop(ctx) {
            self.finish(LifecycleState::Stopping, previous);
            return Err(HostError::Lifecycle {
                plugin: self.id().to_string(),
                action: "stop",
                source,
            });
        }

        self.finish(LifecycleState::Stopping, LifecycleState::Stopped);
        info!(plugin_id = %self.id(), "Plugin stopped");
        Ok(())
    }

    /// Marks the stub as removed from its registry. Terminal.
    ///
    /// A started plugin is stopped first. The stub ends up `Unloaded` either
    /// way; a failing `on_stop` is returned.
    pub(crate) fn unload(&self) -> Result<()> {
        let previous = std::mem::replace(&mut *self.state.lock(), LifecycleState::Unloaded);
        if previous != LifecycleState::Started {
            return Ok(());
        }

        self.handler
            .on_stop(&CallContext::new())
            .map_err(|source| HostError::Lifecycle {
                plugin: self.id().to_string(),
                action: "stop",
                source,
            })
    }

    /// Forwards one hook call to the plugin with no deadline.
    pub fn invoke(&self, hook: &str, value: Value, args: &[Value]) -> Result<Value> {
        self.invoke_with(&CallContext::new(), hook, value, args)
    }

    /// Forwards one hook call to the plugin.
    ///
    /// Refused with [`HostError::PluginNotStarted`] unless the stub is
    /// `Started`, and with [`HostError::HookInterrupted`] if `ctx` is
    /// cancelled or past its deadline. Handler failures come back as
    /// [`HostError::Invocation`].
    pub fn invoke_with(
        &self,
        ctx: &CallContext,
        hook: &str,
        value: Value,
        args: &[Value],
    ) -> Result<Value> {
        let state = self.state();
        if state != LifecycleState::Started {
            return Err(HostError::PluginNotStarted {
                hook: hook.to_string(),
                plugin: self.id().to_string(),
                state,
            });
        }

        ctx.check().map_err(|reason| HostError::HookInterrupted {
            hook: hook.to_string(),
            plugin: self.id().to_string(),
            reason,
        })?;

        self.handler
            .invoke(ctx, hook, value, args)
            .map_err(|source| HostError::Invocation {
                hook: hook.to_string(),
                plugin: self.id().to_string(),
                source,
            })
    }

    /// Enters `transient` if `allowed` holds for the current state, returning
    /// the state it left.
    fn begin(
        &self,
        action: &'static str,
        allowed: fn(LifecycleState) -> bool,
        transient: LifecycleState,
    ) -> Result<LifecycleState> {
        let mut state = self.state.lock();
        if !allowed(*state) {
            return Err(self.illegal(action, *state));
        }
        Ok(std::mem::replace(&mut *state, transient))
    }

    /// Leaves `transient` for `next`. Returns false if the stub was unloaded
    /// in the meantime.
    fn finish(&self, transient: LifecycleState, next: LifecycleState) -> bool {
        let mut state = self.state.lock();
        if *state != transient {
            return false;
        }
        *state = next;
        true
    }

    fn illegal(&self, action: &'static str, state: LifecycleState) -> HostError {
        HostError::InvalidLifecycleTransition {
            plugin: self.id().to_string(),
            action,
            state,
        }
    }

    fn interrupted(&self, action: &'static str, reason: Interrupted) -> HostError {
        HostError::LifecycleInterrupted {
            plugin: self.id().to_string(),
            action,
            reason,
        }
    }
}

impl fmt::Debug for PluginStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginStub")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

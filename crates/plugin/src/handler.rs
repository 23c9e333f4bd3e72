//! The callable side of a plugin.

use std::fmt;

use hookhost_core::{CallContext, InvokeError};
use serde_json::Value;

/// Result of a single handler call.
pub type InvokeResult<T> = std::result::Result<T, InvokeError>;

/// Executes hook calls on behalf of a plugin.
///
/// A transport hands one of these to each stub. Implementations may talk to
/// a child process, a socket, or just run Rust code in-process.
///
/// Every call carries a [`CallContext`]. Long-running handlers should poll it
/// and give up once it is cancelled or past its deadline.
pub trait PluginHandler: Send + Sync {
    /// Brings the plugin up.
    fn on_start(&self, _ctx: &CallContext) -> InvokeResult<()> {
        Ok(())
    }

    /// Tears the plugin down.
    fn on_stop(&self, _ctx: &CallContext) -> InvokeResult<()> {
        Ok(())
    }

    /// Handles one hook call and returns the (possibly transformed) value.
    fn invoke(
        &self,
        ctx: &CallContext,
        hook: &str,
        value: Value,
        args: &[Value],
    ) -> InvokeResult<Value>;
}

type HandlerFn =
    dyn Fn(&CallContext, &str, Value, &[Value]) -> InvokeResult<Value> + Send + Sync;

/// Handler backed by a closure.
///
/// ```
/// use hookhost_core::CallContext;
/// use hookhost_plugin::{FnHandler, PluginHandler};
/// use serde_json::json;
///
/// let double = FnHandler::new(|_hook, value, _args| Ok(json!(value.as_i64().unwrap_or(0) * 2)));
/// assert_eq!(double.invoke(&CallContext::new(), "h", json!(4), &[]).unwrap(), json!(8));
/// ```
pub struct FnHandler {
    call: Box<HandlerFn>,
}

impl FnHandler {
    /// Wraps a closure that does not look at the call context.
    pub fn new<F>(call: F) -> Self
    where
        F: Fn(&str, Value, &[Value]) -> InvokeResult<Value> + Send + Sync + 'static,
    {
        Self::with_context(move |_ctx: &CallContext, hook: &str, value: Value, args: &[Value]| {
            call(hook, value, args)
        })
    }

    /// Wraps a closure that receives the call context as well.
    pub fn with_context<F>(call: F) -> Self
    where
        F: Fn(&CallContext, &str, Value, &[Value]) -> InvokeResult<Value> + Send + Sync + 'static,
    {
        Self {
            call: Box::new(call),
        }
    }
}

impl fmt::Debug for FnHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

impl PluginHandler for FnHandler {
    fn invoke(
        &self,
        ctx: &CallContext,
        hook: &str,
        value: Value,
        args: &[Value],
    ) -> InvokeResult<Value> {
        (self.call)(ctx, hook, value, args)
    }
}

/// Handler for a plugin with no transport attached; every call fails.
#[derive(Debug, Clone)]
pub struct DetachedHandler {
    command: Vec<String>,
}

impl DetachedHandler {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }
}

impl PluginHandler for DetachedHandler {
    fn invoke(
        &self,
        _ctx: &CallContext,
        _hook: &str,
        _value: Value,
        _args: &[Value],
    ) -> InvokeResult<Value> {
        Err(InvokeError::new(format!(
            "no transport attached for `{}`",
            self.command.join(" ")
        )))
    }
}

//! Hook dispatch: actions and filters over the bound plugins.

use std::collections::HashSet;
use std::sync::Arc;

use hookhost_core::{AggregateError, CallContext, HostError, combine};
use hookhost_plugin::PluginRegistry;
use serde_json::Value;
use tracing::{debug, debug_span, warn};

use crate::table::HookTable;

/// Result of running a filter chain.
///
/// The value is always present: when some plugins failed it is whatever the
/// chain produced around them.
#[derive(Debug)]
pub struct FilterOutcome {
    pub value: Value,
    pub error: Option<AggregateError>,
}

impl FilterOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// The final value, or the collected errors if any plugin failed.
    pub fn into_result(self) -> Result<Value, AggregateError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.value),
        }
    }
}

/// Runs hooks against the plugins of a registry, in the order the hook table
/// derived.
pub struct Dispatcher {
    registry: Arc<PluginRegistry>,
    table: Arc<HookTable>,
    fail_fast: HashSet<String>,
}

impl Dispatcher {
    pub fn new(registry: Arc<PluginRegistry>, table: Arc<HookTable>) -> Self {
        Self {
            registry,
            table,
            fail_fast: HashSet::new(),
        }
    }

    /// Stops `hook`'s chain at its first refusal or invocation failure.
    pub fn fail_fast(mut self, hook: impl Into<String>) -> Self {
        self.fail_fast.insert(hook.into());
        self
    }

    pub fn is_fail_fast(&self, hook: &str) -> bool {
        self.fail_fast.contains(hook)
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn table(&self) -> &Arc<HookTable> {
        &self.table
    }

    /// Threads `initial` through every plugin bound to `hook`.
    pub fn apply_filter(&self, hook: &str, initial: Value, args: &[Value]) -> FilterOutcome {
        self.apply_filter_with(&CallContext::new(), hook, initial, args)
    }

    /// Threads `initial` through every plugin bound to `hook` under `ctx`.
    ///
    /// Each plugin receives the previous plugin's output plus `args`.
    /// Bindings whose plugin is no longer registered are skipped. A plugin
    /// that is not started, or that fails, leaves the value untouched; its
    /// error is collected and the chain moves on.
    ///
    /// `ctx` is checked before each binding. Once it is cancelled or past its
    /// deadline the chain ends with a [`HostError::HookInterrupted`] naming
    /// the plugin that was not called, whether or not the hook is fail-fast.
    pub fn apply_filter_with(
        &self,
        ctx: &CallContext,
        hook: &str,
        initial: Value,
        args: &[Value],
    ) -> FilterOutcome {
        let _span = debug_span!("apply_filter", hook = %hook).entered();
        let fail_fast = self.is_fail_fast(hook);

        let mut value = initial;
        let mut errors: Vec<HostError> = Vec::new();

        for binding in self.table.bindings_for(hook) {
            if let Err(reason) = ctx.check() {
                let err = HostError::HookInterrupted {
                    hook: hook.to_string(),
                    plugin: binding.plugin_id,
                    reason,
                };
                warn!(hook = %hook, "{}", self.registry.messages().render(&err));
                errors.push(err);
                break;
            }

            let Some(stub) = self.registry.get(&binding.plugin_id) else {
                debug!(plugin_id = %binding.plugin_id, "Bound plugin not registered, skipped");
                continue;
            };

            match stub.invoke_with(ctx, hook, value.clone(), args) {
                Ok(next) => value = next,
                Err(err) => {
                    warn!(
                        hook = %hook,
                        plugin_id = %binding.plugin_id,
                        "{}",
                        self.registry.messages().render(&err)
                    );
                    let interrupted = matches!(err, HostError::HookInterrupted { .. });
                    errors.push(err);
                    if fail_fast || interrupted {
                        break;
                    }
                }
            }
        }

        FilterOutcome {
            value,
            error: combine(errors),
        }
    }

    /// Runs every plugin bound to `hook` for its side effects.
    pub fn do_action(&self, hook: &str, args: &[Value]) -> Result<(), AggregateError> {
        self.do_action_with(&CallContext::new(), hook, args)
    }

    /// Runs every plugin bound to `hook` for its side effects, under `ctx`.
    pub fn do_action_with(
        &self,
        ctx: &CallContext,
        hook: &str,
        args: &[Value],
    ) -> Result<(), AggregateError> {
        self.apply_filter_with(ctx, hook, Value::Null, args)
            .into_result()
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hookhost_core::{Interrupted, InvokeError, LifecycleState};
    use hookhost_plugin::{FnHandler, PluginManifest, PluginStub};
    use parking_lot::Mutex;
    use serde_json::json;

    use super::*;
    use crate::binding::HookBinding;

    fn stub<F>(id: &str, call: F) -> PluginStub
    where
        F: Fn(&str, Value, &[Value]) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        let descriptor = PluginManifest::new(id, ["run"]).validate("/p").unwrap();
        PluginStub::in_process(descriptor, FnHandler::new(call))
    }

    fn stub_with_context<F>(id: &str, call: F) -> PluginStub
    where
        F: Fn(&CallContext, &str, Value, &[Value]) -> Result<Value, InvokeError>
            + Send
            + Sync
            + 'static,
    {
        let descriptor = PluginManifest::new(id, ["run"]).validate("/p").unwrap();
        PluginStub::in_process(descriptor, FnHandler::with_context(call))
    }

    fn setup(stubs: Vec<PluginStub>) -> (Arc<PluginRegistry>, Arc<HookTable>) {
        let registry = Arc::new(PluginRegistry::new());
        for stub in stubs {
            let stub = registry.insert(stub).unwrap();
            stub.start().unwrap();
        }
        (registry, Arc::new(HookTable::new()))
    }

    fn number(value: &Value) -> i64 {
        value.as_i64().unwrap_or(0)
    }

    #[test]
    fn test_filter_threads_value() {
        let (registry, table) = setup(vec![
            stub("add", |_, v, _| Ok(json!(number(&v) + 1))),
            stub("double", |_, v, _| Ok(json!(number(&v) * 2))),
        ]);
        table.bind(HookBinding::new("h", "add")).unwrap();
        table.bind(HookBinding::new("h", "double")).unwrap();

        let dispatcher = Dispatcher::new(registry, table);
        let outcome = dispatcher.apply_filter("h", json!(10), &[]);
        assert!(outcome.is_ok());
        assert_eq!(outcome.into_result().unwrap(), json!(22));
    }

    #[test]
    fn test_filter_without_bindings_returns_initial() {
        let (registry, table) = setup(Vec::new());
        let dispatcher = Dispatcher::new(registry, table);
        let value = dispatcher
            .apply_filter("nothing", json!({"k": 1}), &[])
            .into_result()
            .unwrap();
        assert_eq!(value, json!({"k": 1}));
    }

    #[test]
    fn test_filter_passes_args() {
        let (registry, table) = setup(vec![stub("join", |_, v, args| {
            let suffix = args.first().and_then(Value::as_str).unwrap_or_default();
            Ok(json!(format!("{}{}", v.as_str().unwrap_or_default(), suffix)))
        })]);
        table.bind(HookBinding::new("h", "join")).unwrap();

        let dispatcher = Dispatcher::new(registry, table);
        let value = dispatcher
            .apply_filter("h", json!("a"), &[json!("b")])
            .into_result()
            .unwrap();
        assert_eq!(value, json!("ab"));
    }

    #[test]
    fn test_action_runs_each_handler_once_in_order() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let record = |name: &'static str| {
            let calls = calls.clone();
            move |_: &str, v: Value, _: &[Value]| {
                calls.lock().push(name);
                Ok::<_, InvokeError>(v)
            }
        };
        let (registry, table) = setup(vec![
            stub("first", record("first")),
            stub("second", record("second")),
            stub("third", record("third")),
        ]);
        table
            .bind(HookBinding::new("save", "third").with_priority(2))
            .unwrap();
        table.bind(HookBinding::new("save", "first")).unwrap();
        table
            .bind(HookBinding::new("save", "second").with_priority(1))
            .unwrap();

        let dispatcher = Dispatcher::new(registry, table);
        dispatcher.do_action("save", &[]).unwrap();
        assert_eq!(*calls.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unknown_plugin_is_skipped() {
        let (registry, table) = setup(vec![stub("add", |_, v, _| Ok(json!(number(&v) + 1)))]);
        table.bind(HookBinding::new("h", "ghost")).unwrap();
        table.bind(HookBinding::new("h", "add")).unwrap();

        let dispatcher = Dispatcher::new(registry, table);
        let value = dispatcher.apply_filter("h", json!(1), &[]).into_result().unwrap();
        assert_eq!(value, json!(2));
    }

    #[test]
    fn test_removed_plugin_is_skipped() {
        let (registry, table) = setup(vec![
            stub("add", |_, v, _| Ok(json!(number(&v) + 1))),
            stub("double", |_, v, _| Ok(json!(number(&v) * 2))),
        ]);
        table.bind(HookBinding::new("h", "add")).unwrap();
        table.bind(HookBinding::new("h", "double")).unwrap();
        registry.remove("add").unwrap();

        let dispatcher = Dispatcher::new(registry, table);
        let value = dispatcher.apply_filter("h", json!(5), &[]).into_result().unwrap();
        assert_eq!(value, json!(10));
    }

    #[test]
    fn test_unstarted_plugin_is_refused() {
        let (registry, table) = setup(vec![stub("add", |_, v, _| Ok(json!(number(&v) + 1)))]);
        let idle = registry
            .insert(stub("idle", |_, _, _| Ok(json!("never"))))
            .unwrap();
        table.bind(HookBinding::new("h", "idle")).unwrap();
        table.bind(HookBinding::new("h", "add")).unwrap();

        let dispatcher = Dispatcher::new(registry, table);
        let outcome = dispatcher.apply_filter("h", json!(1), &[]);
        assert_eq!(outcome.value, json!(2));

        let error = outcome.error.unwrap();
        assert_eq!(error.len(), 1);
        assert!(matches!(
            &error.errors()[0],
            HostError::PluginNotStarted { plugin, .. } if plugin == idle.id()
        ));
    }

    #[test]
    fn test_invocation_errors_are_collected() {
        let (registry, table) = setup(vec![
            stub("add", |_, v, _| Ok(json!(number(&v) + 1))),
            stub("broken", |_, _, _| Err(InvokeError::new("boom"))),
            stub("double", |_, v, _| Ok(json!(number(&v) * 2))),
            stub("worse", |_, _, _| Err(InvokeError::new("bang"))),
        ]);
        for id in ["add", "broken", "double", "worse"] {
            table.bind(HookBinding::new("h", id)).unwrap();
        }

        let dispatcher = Dispatcher::new(registry, table);
        let outcome = dispatcher.apply_filter("h", json!(10), &[]);
        assert_eq!(outcome.value, json!(22));

        let error = outcome.into_result().unwrap_err();
        assert_eq!(error.len(), 2);
        assert_eq!(
            error.to_string(),
            "(2 errors): [plugin 'broken' failed on hook 'h': boom, \
             plugin 'worse' failed on hook 'h': bang]"
        );
    }

    #[test]
    fn test_fail_fast_stops_chain() {
        let calls = Arc::new(Mutex::new(0));
        let counted = {
            let calls = calls.clone();
            move |_: &str, v: Value, _: &[Value]| {
                *calls.lock() += 1;
                Ok::<_, InvokeError>(v)
            }
        };
        let (registry, table) = setup(vec![
            stub("broken", |_, _, _| Err(InvokeError::new("boom"))),
            stub("after", counted),
        ]);
        table.bind(HookBinding::new("h", "broken")).unwrap();
        table.bind(HookBinding::new("h", "after")).unwrap();

        let dispatcher = Dispatcher::new(registry, table).fail_fast("h");
        assert!(dispatcher.is_fail_fast("h"));

        let error = dispatcher.do_action("h", &[]).unwrap_err();
        assert_eq!(error.len(), 1);
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn test_cancelled_filter_stops_chain() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let record = |name: &'static str| {
            let calls = calls.clone();
            move |_: &str, v: Value, _: &[Value]| {
                calls.lock().push(name);
                Ok::<_, InvokeError>(json!(number(&v) + 1))
            }
        };
        let (registry, table) = setup(vec![
            stub("first", record("first")),
            stub_with_context("cancel", |ctx, _, v, _| {
                ctx.cancel();
                Ok(json!(number(&v) * 10))
            }),
            stub("last", record("last")),
        ]);
        for id in ["first", "cancel", "last"] {
            table.bind(HookBinding::new("h", id)).unwrap();
        }
        let bindings = table.bindings_for("h");

        let dispatcher = Dispatcher::new(registry.clone(), table.clone());
        let ctx = CallContext::new();
        let outcome = dispatcher.apply_filter_with(&ctx, "h", json!(1), &[]);

        assert!(ctx.is_cancelled());
        assert_eq!(outcome.value, json!(20));
        assert_eq!(*calls.lock(), vec!["first"]);

        let error = outcome.error.unwrap();
        assert_eq!(error.len(), 1);
        assert!(matches!(
            &error.errors()[0],
            HostError::HookInterrupted {
                plugin,
                reason: Interrupted::Cancelled,
                ..
            } if plugin == "last"
        ));

        assert_eq!(table.bindings_for("h"), bindings);
        assert_eq!(registry.ids(), vec!["cancel", "first", "last"]);
        assert!(
            registry
                .plugins()
                .iter()
                .all(|s| s.state() == LifecycleState::Started)
        );
    }

    #[test]
    fn test_elapsed_deadline_returns_initial_value() {
        let (registry, table) = setup(vec![stub("add", |_, v, _| Ok(json!(number(&v) + 1)))]);
        table.bind(HookBinding::new("save", "add")).unwrap();

        let dispatcher = Dispatcher::new(registry, table);
        let ctx = CallContext::new().with_timeout(Duration::ZERO);
        let outcome = dispatcher.apply_filter_with(&ctx, "save", json!(7), &[]);
        assert_eq!(outcome.value, json!(7));

        let error = dispatcher.do_action_with(&ctx, "save", &[]).unwrap_err();
        assert_eq!(
            error.to_string(),
            "(1 errors): [hook 'save' interrupted before plugin 'add': deadline exceeded]"
        );
    }
}

//! Start command implementation.

use std::path::Path;
use std::time::Duration;

use console::style;
use hookhost_core::{CallContext, HostError, combine};
use miette::Result;

use super::Context;
use crate::output;

/// Scans `root`, starts every plugin that loaded and reports its state.
///
/// Starting gives up once `timeout` has elapsed. Plugins are stopped again
/// before returning. Load and lifecycle failures are reported together.
pub fn execute(ctx: &Context, root: &Path, timeout: Option<Duration>) -> Result<()> {
    let registry = ctx.registry();
    let mut errors: Vec<HostError> = Vec::new();

    if let Err(aggregate) = registry.scan(root) {
        errors.push(aggregate.into());
    }

    if registry.is_empty() {
        output::warning(&format!("No plugins loaded from {}", root.display()));
    }

    if let Err(aggregate) = registry.start_all_with(&call_context(timeout)) {
        errors.push(aggregate.into());
    }

    output::section_header("Plugins");
    for stub in registry.plugins() {
        let state = stub.state();
        let marker = if stub.is_started() {
            style(state.as_str()).green()
        } else {
            style(state.as_str()).red()
        };
        output::list_item(&format!("{} [{}]", stub.id(), marker));
    }
    println!();

    if let Err(aggregate) = registry.stop_all() {
        errors.push(aggregate.into());
    }

    match combine(errors) {
        Some(aggregate) => Err(ctx.failure("Some plugins could not be started", &aggregate)),
        None => {
            output::success(&format!("{} plugin(s) started and stopped", registry.len()));
            Ok(())
        }
    }
}

fn call_context(timeout: Option<Duration>) -> CallContext {
    match timeout {
        Some(timeout) => CallContext::new().with_timeout(timeout),
        None => CallContext::new(),
    }
}

#[cfg(test)]
mod tests {
    use hookhost_core::Interrupted;

    use super::*;

    #[test]
    fn test_call_context_timeout() {
        assert!(call_context(None).deadline().is_none());
        assert_eq!(
            call_context(Some(Duration::ZERO)).check(),
            Err(Interrupted::DeadlineExceeded)
        );
    }
}

//! Validate command implementation.

use std::path::Path;

use miette::{Result, miette};

use super::Context;
use crate::output;

/// Loads a single plugin directory and reports its descriptor.
pub fn execute(ctx: &Context, plugin_dir: &Path) -> Result<()> {
    output::info(&format!("Validating {}...", plugin_dir.display()));

    let registry = ctx.registry();
    let stub = match registry.load(plugin_dir) {
        Ok(stub) => stub,
        Err(e) => {
            let message = ctx.messages.render(&e);
            output::error(&message);
            return Err(miette!("Validation failed: {}", message));
        }
    };

    let descriptor = stub.descriptor();
    output::success(&format!("Plugin '{}' is valid", descriptor.id()));
    output::key_value("name", descriptor.name());
    output::key_value("command", &descriptor.command().join(" "));
    if descriptor.min_host_version() > 0 {
        output::key_value(
            "min host version",
            &descriptor.min_host_version().to_string(),
        );
    }

    Ok(())
}

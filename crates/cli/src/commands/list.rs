//! List command implementation.

use std::path::Path;

use console::style;
use miette::Result;

use super::Context;
use crate::output;

/// Scans `root` and lists the plugins that loaded.
///
/// Plugins that failed to load are listed afterwards and make the command
/// fail.
pub fn execute(ctx: &Context, root: &Path, detailed: bool) -> Result<()> {
    let registry = ctx.registry();
    let scanned = registry.scan(root);
    let plugins = registry.plugins();

    if plugins.is_empty() {
        output::info(&format!("No plugins loaded from {}", root.display()));
    } else {
        println!(
            "{}",
            style(format!("Plugins in {}:", root.display())).bold()
        );
        println!();
    }

    for stub in &plugins {
        let descriptor = stub.descriptor();

        if detailed {
            println!("  {}", style(descriptor.id()).cyan().bold());
            if descriptor.name() != descriptor.id() {
                output::key_value("name", descriptor.name());
            }
            output::key_value("command", &descriptor.command().join(" "));
            output::key_value("directory", &descriptor.directory().display().to_string());
            if descriptor.min_host_version() > 0 {
                output::key_value(
                    "min host version",
                    &descriptor.min_host_version().to_string(),
                );
            }
            println!();
        } else {
            print!("  {}", descriptor.id());
            if descriptor.name() != descriptor.id() {
                print!(" - {}", style(descriptor.name()).dim());
            }
            println!();
        }
    }

    match scanned {
        Ok(_) => Ok(()),
        Err(aggregate) => Err(ctx.failure("Some plugins failed to load", &aggregate)),
    }
}

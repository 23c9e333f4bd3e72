//! Order command implementation.

use std::path::Path;

use console::style;
use hookhost_core::{HostError, combine};
use hookhost_engine::{HookBinding, HookTable};
use miette::{IntoDiagnostic, Result, WrapErr};

use super::Context;
use crate::output;

/// Binds everything in a bindings file and prints the derived order per hook.
pub fn execute(ctx: &Context, bindings_file: &Path, hook: Option<&str>) -> Result<()> {
    let bindings = load_bindings(bindings_file)?;
    let (table, errors) = bind_all(bindings);

    let hooks = match hook {
        Some(name) => vec![name.to_string()],
        None => table.hooks(),
    };

    for name in &hooks {
        output::section_header(name);
        let ordered = table.bindings_for(name);
        if ordered.is_empty() {
            output::list_item(&style("(no bindings)").dim().to_string());
            continue;
        }
        for (position, binding) in ordered.iter().enumerate() {
            output::list_item(&describe(position + 1, binding));
        }
    }
    println!();

    match combine(errors) {
        Some(aggregate) => Err(ctx.failure("Some bindings were rejected", &aggregate)),
        None => Ok(()),
    }
}

/// Reads a JSON array of bindings.
fn load_bindings(path: &Path) -> Result<Vec<HookBinding>> {
    let content = std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to parse bindings in {}", path.display()))
}

/// Registers bindings in file order. A rejected binding does not stop the
/// rest.
fn bind_all(bindings: Vec<HookBinding>) -> (HookTable, Vec<HostError>) {
    let table = HookTable::new();
    let errors = bindings
        .into_iter()
        .filter_map(|binding| table.bind(binding).err())
        .collect();
    (table, errors)
}

fn describe(position: usize, binding: &HookBinding) -> String {
    let mut text = format!(
        "{}. {} {}",
        position,
        binding.plugin_id,
        style(format!("(priority {})", binding.priority)).dim()
    );
    if let Some(before) = &binding.before {
        text.push_str(&format!(" {}", style(format!("before {}", before)).dim()));
    }
    if let Some(after) = &binding.after {
        text.push_str(&format!(" {}", style(format!("after {}", after)).dim()));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn ids(table: &HookTable, hook: &str) -> Vec<String> {
        table
            .bindings_for(hook)
            .into_iter()
            .map(|b| b.plugin_id)
            .collect()
    }

    #[test]
    fn test_load_bindings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bindings.json");
        fs::write(
            &path,
            r#"[
                { "hook": "save", "plugin": "lint", "priority": 1 },
                { "hook": "save", "plugin": "fmt", "before": "lint", "priority": 1 },
                { "hook": "load", "plugin": "cache" }
            ]"#,
        )
        .unwrap();

        let bindings = load_bindings(&path).unwrap();
        assert_eq!(bindings.len(), 3);

        let (table, errors) = bind_all(bindings);
        assert!(errors.is_empty());
        assert_eq!(ids(&table, "save"), vec!["fmt", "lint"]);
        assert_eq!(table.hooks(), vec!["load", "save"]);
    }

    #[test]
    fn test_cycle_rejects_only_offending_binding() {
        let bindings = vec![
            HookBinding::new("h", "a").with_before("b"),
            HookBinding::new("h", "b"),
            HookBinding::new("h", "b").with_before("a"),
            HookBinding::new("h", "c"),
        ];
        let (table, errors) = bind_all(bindings);

        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            HostError::CyclicOrderingConstraint { .. }
        ));
        assert_eq!(ids(&table, "h"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_malformed_bindings_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bindings.json");
        fs::write(&path, r#"{ "hook": "save" }"#).unwrap();
        assert!(load_bindings(&path).is_err());
    }
}

//! Hook table: per-hook ordered binding lists.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use hookhost_core::Result;
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::binding::HookBinding;
use crate::order::HookOrderer;

/// Owns, per hook name, the bindings registered against that hook, kept in
/// the order [`HookOrderer`] derives.
#[derive(Debug, Default)]
pub struct HookTable {
    hooks: RwLock<HashMap<String, Vec<HookBinding>>>,
    next_seq: AtomicU64,
}

impl HookTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a binding and re-derives the hook's order.
    ///
    /// Binding the same plugin twice is allowed; both bindings fire. If the new
    /// binding makes the ordering constraints cyclic, the error is returned and
    /// the hook keeps its previous bindings and order.
    pub fn bind(&self, mut binding: HookBinding) -> Result<()> {
        binding.seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        let mut hooks = self.hooks.write();
        let mut candidate = hooks.get(&binding.hook).cloned().unwrap_or_default();
        let hook = binding.hook.clone();
        let plugin_id = binding.plugin_id.clone();
        let priority = binding.priority;
        candidate.push(binding);

        let ordered = HookOrderer::order(&hook, candidate)?;
        hooks.insert(hook.clone(), ordered);

        info!(
            hook = %hook,
            plugin_id = %plugin_id,
            priority = priority,
            "Hook binding registered"
        );
        Ok(())
    }

    /// Ordered snapshot of the bindings for `hook`; empty for unknown hooks.
    pub fn bindings_for(&self, hook: &str) -> Vec<HookBinding> {
        self.hooks.read().get(hook).cloned().unwrap_or_default()
    }

    /// Removes every binding of `plugin_id` from `hook`. Returns how many
    /// were removed.
    pub fn unbind(&self, hook: &str, plugin_id: &str) -> usize {
        let mut hooks = self.hooks.write();
        let Some(bindings) = hooks.get_mut(hook) else {
            return 0;
        };

        let removed = remove_plugin(hook, bindings, plugin_id);
        if bindings.is_empty() {
            hooks.remove(hook);
        }
        if removed > 0 {
            debug!(hook = %hook, plugin_id = %plugin_id, removed, "Hook bindings removed");
        }
        removed
    }

    /// Removes every binding of `plugin_id` from every hook.
    pub fn unbind_plugin(&self, plugin_id: &str) -> usize {
        let mut hooks = self.hooks.write();
        let mut removed = 0;
        for (hook, bindings) in hooks.iter_mut() {
            removed += remove_plugin(hook, bindings, plugin_id);
        }
        hooks.retain(|_, bindings| !bindings.is_empty());

        info!(plugin_id = %plugin_id, removed, "All hook bindings removed for plugin");
        removed
    }

    /// Hook names with at least one binding, sorted.
    pub fn hooks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.hooks.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn binding_count(&self, hook: &str) -> usize {
        self.hooks.read().get(hook).map(Vec::len).unwrap_or(0)
    }
}

/// Drops the bindings of `plugin_id` and re-derives the order of the rest.
fn remove_plugin(hook: &str, bindings: &mut Vec<HookBinding>, plugin_id: &str) -> usize {
    let before = bindings.len();
    bindings.retain(|b| b.plugin_id != plugin_id);
    let removed = before - bindings.len();

    if removed > 0 {
        // Dropping nodes cannot introduce a cycle.
        if let Ok(ordered) = HookOrderer::order(hook, bindings.clone()) {
            *bindings = ordered;
        }
    }
    removed
}

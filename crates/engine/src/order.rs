//! Ordering policy for the bindings of one hook.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use hookhost_core::{HostError, Result};
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::binding::HookBinding;

/// Turns a hook's bindings into one deterministic invocation order.
///
/// Priority is the coarse key: lower tiers run first. Inside a tier,
/// `before`/`after` constraints form a graph that is sorted topologically;
/// bindings with no constraint between them keep registration order.
/// Constraints that point outside the tier, or at plugins that are not
/// bound, have no effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookOrderer;

impl HookOrderer {
    /// Orders `bindings` for `hook`.
    ///
    /// Fails with [`HostError::CyclicOrderingConstraint`] when the constraints
    /// inside a tier cannot all hold.
    pub fn order(hook: &str, mut bindings: Vec<HookBinding>) -> Result<Vec<HookBinding>> {
        bindings.sort_by_key(|b| (b.priority, b.seq));

        let mut ordered = Vec::with_capacity(bindings.len());
        let mut rest = bindings.into_iter().peekable();
        while let Some(first) = rest.next() {
            let priority = first.priority;
            let mut tier = vec![first];
            while let Some(next) = rest.next_if(|b| b.priority == priority) {
                tier.push(next);
            }
            ordered.extend(order_tier(hook, tier)?);
        }

        Ok(ordered)
    }
}

/// Stable topological sort of one priority tier. `tier` is in seq order.
fn order_tier(hook: &str, tier: Vec<HookBinding>) -> Result<Vec<HookBinding>> {
    if tier.len() < 2 {
        return Ok(tier);
    }

    let graph = constraint_graph(hook, &tier);

    // Kahn's algorithm; among ready nodes the lowest index (earliest
    // registration) goes first.
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(i, _)| Reverse(i))
        .collect();

    let mut order = Vec::with_capacity(tier.len());
    while let Some(Reverse(i)) = ready.pop() {
        order.push(i);
        for next in graph.neighbors_directed(NodeIndex::new(i), Direction::Outgoing) {
            let j = next.index();
            in_degree[j] -= 1;
            if in_degree[j] == 0 {
                ready.push(Reverse(j));
            }
        }
    }

    if order.len() < tier.len() {
        return Err(cycle_error(hook, &graph, &tier));
    }

    let mut slots: Vec<Option<HookBinding>> = tier.into_iter().map(Some).collect();
    Ok(order.into_iter().filter_map(|i| slots[i].take()).collect())
}

/// Edge `a -> b` means binding `a` must run before binding `b`.
/// Node `i` stands for `tier[i]`.
fn constraint_graph(hook: &str, tier: &[HookBinding]) -> DiGraph<(), ()> {
    let mut graph = DiGraph::with_capacity(tier.len(), tier.len());
    let nodes: Vec<NodeIndex> = tier.iter().map(|_| graph.add_node(())).collect();

    let mut by_plugin: HashMap<&str, Vec<NodeIndex>> = HashMap::new();
    for (binding, &node) in tier.iter().zip(&nodes) {
        by_plugin
            .entry(binding.plugin_id.as_str())
            .or_default()
            .push(node);
    }

    let targets = |binding: &HookBinding, target: &str| -> Vec<NodeIndex> {
        if target == binding.plugin_id {
            return Vec::new();
        }
        match by_plugin.get(target) {
            Some(nodes) => nodes.clone(),
            None => {
                debug!(
                    hook = %hook,
                    plugin_id = %binding.plugin_id,
                    target = %target,
                    "Ordering constraint target not bound at this priority, ignored"
                );
                Vec::new()
            }
        }
    };

    for (binding, &node) in tier.iter().zip(&nodes) {
        if let Some(target) = binding.before.as_deref() {
            for other in targets(binding, target) {
                graph.update_edge(node, other, ());
            }
        }
        if let Some(target) = binding.after.as_deref() {
            for other in targets(binding, target) {
                graph.update_edge(other, node, ());
            }
        }
    }

    graph
}

fn cycle_error(hook: &str, graph: &DiGraph<(), ()>, tier: &[HookBinding]) -> HostError {
    let mut members: Vec<usize> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .flatten()
        .map(|n| n.index())
        .collect();
    members.sort_unstable();

    let mut plugins: Vec<String> = Vec::new();
    for i in members {
        let id = &tier[i].plugin_id;
        if !plugins.contains(id) {
            plugins.push(id.clone());
        }
    }

    HostError::CyclicOrderingConstraint {
        hook: hook.to_string(),
        plugins,
    }
}

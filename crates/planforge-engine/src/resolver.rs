//! Dependency inference: document edges, the linear fallback, and
//! mutual-exclusion edges from shared exclusive resources.

use std::collections::{BTreeMap, BTreeSet};

use planforge_model::{Edge, ResourceConflict, Task};

/// Final edge list plus the resource-conflict map for `tasks.json`.
#[derive(Debug, Default)]
pub struct Resolution {
    pub edges: Vec<Edge>,
    pub conflicts: BTreeMap<String, ResourceConflict>,
}

/// Infer the dependency set for a task list.
///
/// The seed comes from document edges. Every exclusive resource shared by
/// two or more tasks records a conflict entry and one hard `resource`/
/// `mutual_exclusion` edge per unordered task pair. Only when nothing at all
/// was inferred (no seed, no conflicts) and two or more tasks exist does the
/// linear fallback chain them (first edge `sequential`, the rest
/// `technical`). Resources iterate in sorted order and IDs within a
/// resource are sorted, so output is deterministic.
#[must_use]
pub fn resolve(tasks: &[Task], base_edges: &[Edge]) -> Resolution {
    let mut edges: Vec<Edge> = base_edges.to_vec();

    let mut by_resource: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for task in tasks {
        for resource in task.exclusive_resources() {
            by_resource
                .entry(resource)
                .or_default()
                .insert(task.id.clone());
        }
    }
    let mut conflicts = BTreeMap::new();
    let mut conflict_edges: Vec<Edge> = Vec::new();
    for (resource, ids) in by_resource {
        if ids.len() < 2 {
            continue;
        }
        let sorted: Vec<String> = ids.into_iter().collect();
        for (i, from) in sorted.iter().enumerate() {
            for to in &sorted[i + 1..] {
                conflict_edges.push(Edge::mutual_exclusion(from.clone(), to.clone()));
            }
        }
        conflicts.insert(resource, ResourceConflict::exclusive(sorted));
    }

    if edges.is_empty() && conflict_edges.is_empty() && tasks.len() >= 2 {
        for (k, pair) in tasks.windows(2).enumerate() {
            let edge_type = if k == 0 { "sequential" } else { "technical" };
            edges.push(Edge::hard(
                pair[0].id.clone(),
                pair[1].id.clone(),
                edge_type,
            ));
        }
    }
    edges.extend(conflict_edges);

    Resolution { edges, conflicts }
}

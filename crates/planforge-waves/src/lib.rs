//! Wave scheduling: greedy per-layer packing that respects exclusive
//! resources.
//!
//! Nodes are grouped by Kahn depth; within a layer, IDs are packed first-fit
//! into subwaves so that no subwave holds two tasks contending on the same
//! exclusive resource. The schedule is a planning-time preview; it never
//! feeds back into the DAG.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use planforge_model::{DagFile, Task};

/// Generate subwaves from DAG layering and task resource declarations.
///
/// Properties: no subwave contains two tasks with intersecting exclusive
/// sets; all tasks in one subwave share a depth; subwaves are emitted in
/// non-decreasing depth, in creation order within a layer.
#[must_use]
pub fn generate(dag: &DagFile, tasks: &[Task]) -> Vec<Vec<String>> {
    let exclusive_of: HashMap<&str, BTreeSet<String>> = tasks
        .iter()
        .map(|task| (task.id.as_str(), task.exclusive_resources()))
        .collect();

    // BTreeMap keeps layers in ascending depth.
    let mut layers: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
    for node in &dag.nodes {
        layers.entry(node.depth).or_default().push(node.id.as_str());
    }

    let mut waves: Vec<Vec<String>> = Vec::new();
    for (_, mut ids) in layers {
        ids.sort_unstable();
        let mut subwaves: Vec<(Vec<String>, BTreeSet<String>)> = Vec::new();
        for id in ids {
            let empty = BTreeSet::new();
            let exclusives = exclusive_of.get(id).unwrap_or(&empty);
            let slot = subwaves
                .iter_mut()
                .find(|(_, used)| used.is_disjoint(exclusives));
            match slot {
                Some((members, used)) => {
                    members.push(id.to_string());
                    used.extend(exclusives.iter().cloned());
                }
                None => {
                    subwaves.push((vec![id.to_string()], exclusives.clone()));
                }
            }
        }
        waves.extend(subwaves.into_iter().map(|(members, _)| members));
    }
    waves
}

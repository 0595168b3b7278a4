//! The DAG build pipeline.

use std::collections::{BTreeSet, HashMap, VecDeque};

use tracing::debug;

use planforge_model::{DagEdge, DagFile, DagNode, Edge, SCHEMA_VERSION, Task};

use crate::bitset::BitSet;
use crate::error::DagError;

/// Compact edge record used while the graph is index-based.
struct EdgeRec {
    from: usize,
    to: usize,
    edge_type: String,
}

/// Build a minimized DAG from tasks and edges.
///
/// Applies hardness/confidence filters, excludes `resource` planning edges,
/// detects cycles, computes Kahn layering depths and the longest path
/// (critical path), and removes transitive edges. Fatal invariant violations
/// (duplicate IDs, empty task set, cycles) return a typed error; the failed
/// artifact shape is available via [`DagError::failed_file`].
pub fn build(tasks: &[Task], edges: &[Edge], min_confidence: f64) -> Result<DagFile, DagError> {
    let mut file = DagFile::default();
    file.meta.version = SCHEMA_VERSION.to_string();

    // Phase 1: index task IDs, insertion order preserved.
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        if let Some(&first) = index.get(task.id.as_str()) {
            return Err(DagError::DuplicateTask {
                id: task.id.clone(),
                first,
                duplicate: i,
            });
        }
        index.insert(task.id.as_str(), i);
    }
    let n = tasks.len();
    if n == 0 {
        return Err(DagError::EmptyTaskSet);
    }

    // Phase 2: keep only hard, confident, structural edges between known
    // endpoints. Everything else is tallied by type; soft edges additionally
    // surface in the analysis block.
    let mut kept: Vec<EdgeRec> = Vec::with_capacity(edges.len());
    for edge in edges {
        let type_key = edge_type_key(&edge.edge_type);
        let structural = edge.is_hard
            && edge.confidence >= min_confidence
            && edge.edge_type != "resource"
            && index.contains_key(edge.from.as_str())
            && index.contains_key(edge.to.as_str());
        if !structural {
            *file.metrics.dropped_by_type.entry(type_key).or_insert(0) += 1;
            if !edge.is_hard {
                file.analysis.soft_deps.push(edge.clone());
            }
            continue;
        }
        kept.push(EdgeRec {
            from: index[edge.from.as_str()],
            to: index[edge.to.as_str()],
            edge_type: edge.edge_type.clone(),
        });
    }
    debug!(
        total = edges.len(),
        kept = kept.len(),
        min_confidence,
        "filtered edges"
    );

    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree = vec![0usize; n];
    for edge in &kept {
        adjacency[edge.from].push(edge.to);
        indegree[edge.to] += 1;
    }

    // Phase 3: cycle detection, tri-color DFS in insertion order.
    detect_cycle(tasks, &adjacency)?;

    // Phase 4: Kahn layering. Depth is the longest edge-distance from any root.
    let mut depth = vec![0usize; n];
    let mut remaining = indegree.clone();
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| remaining[i] == 0).collect();
    let mut topo: Vec<usize> = Vec::with_capacity(n);
    while let Some(u) = queue.pop_front() {
        topo.push(u);
        for &v in &adjacency[u] {
            if depth[v] < depth[u] + 1 {
                depth[v] = depth[u] + 1;
            }
            remaining[v] -= 1;
            if remaining[v] == 0 {
                queue.push_back(v);
            }
        }
    }
    // Unreachable after the cycle check; kept as an invariant guard.
    if topo.len() != n {
        return Err(DagError::TopologicalOrder);
    }

    // Phase 5: longest path by node count, with predecessor pointers. The
    // sink is the first maximum encountered in topological order.
    let mut dist = vec![0usize; n];
    let mut pred = vec![usize::MAX; n];
    for &u in &topo {
        for &v in &adjacency[u] {
            if dist[v] < dist[u] + 1 {
                dist[v] = dist[u] + 1;
                pred[v] = u;
            }
        }
    }
    let mut sink = topo[0];
    for &u in &topo {
        if dist[u] > dist[sink] {
            sink = u;
        }
    }
    let mut critical_path: Vec<String> = Vec::new();
    let mut cursor = sink;
    loop {
        critical_path.push(tasks[cursor].id.clone());
        if pred[cursor] == usize::MAX {
            break;
        }
        cursor = pred[cursor];
    }
    critical_path.reverse();

    // Phase 6: transitive reduction. An edge u→v is transitive iff another
    // out-neighbor w of u reaches v.
    let reach: Vec<BitSet> = (0..n).map(|u| reachable_from(u, &adjacency, n)).collect();
    let mut final_pairs: BTreeSet<(usize, usize)> = BTreeSet::new();
    for edge in &kept {
        let transitive = adjacency[edge.from]
            .iter()
            .any(|&w| w != edge.to && reach[w].contains(edge.to));
        if !transitive {
            final_pairs.insert((edge.from, edge.to));
        }
    }
    let mut type_of: HashMap<(usize, usize), &str> = HashMap::with_capacity(kept.len());
    for edge in &kept {
        type_of
            .entry((edge.from, edge.to))
            .or_insert(edge.edge_type.as_str());
    }

    // Phase 7: serialization views and metrics.
    let mut sorted_ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    sorted_ids.sort_unstable();
    let on_critical: BTreeSet<&str> = critical_path.iter().map(String::as_str).collect();
    file.nodes = sorted_ids
        .iter()
        .map(|&id| DagNode {
            id: id.to_string(),
            depth: depth[index[id]],
            critical_path: on_critical.contains(id),
            parallel_opportunity: 1,
        })
        .collect();

    let mut rendered: Vec<DagEdge> = final_pairs
        .iter()
        .map(|&(u, v)| DagEdge {
            from: tasks[u].id.clone(),
            to: tasks[v].id.clone(),
            edge_type: type_of[&(u, v)].to_string(),
            transitive: false,
        })
        .collect();
    rendered.sort_by(|a, b| a.from.cmp(&b.from).then_with(|| a.to.cmp(&b.to)));
    for edge in &rendered {
        *file
            .metrics
            .kept_by_type
            .entry(edge_type_key(&edge.edge_type))
            .or_insert(0) += 1;
    }
    file.edges = rendered;

    let mut incident = vec![false; n];
    for &(u, v) in &final_pairs {
        incident[u] = true;
        incident[v] = true;
    }
    let mut layer_counts: HashMap<usize, usize> = HashMap::new();
    for &d in &depth {
        *layer_counts.entry(d).or_insert(0) += 1;
    }

    file.metrics.min_confidence_applied = min_confidence;
    file.metrics.nodes = n;
    file.metrics.edges = file.edges.len();
    file.metrics.edge_density = if n >= 2 {
        file.edges.len() as f64 / (n * (n - 1)) as f64
    } else {
        0.0
    };
    file.metrics.width_approx = layer_counts.values().copied().max().unwrap_or(0);
    file.metrics.longest_path_length = dist[sink] + 1;
    file.metrics.critical_path = critical_path;
    file.metrics.isolated_tasks = incident.iter().filter(|&&hit| !hit).count();
    file.analysis.ok = true;
    Ok(file)
}

fn edge_type_key(edge_type: &str) -> String {
    let trimmed = edge_type.trim();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Iterative tri-color DFS; a back edge to a `visiting` node is a cycle.
fn detect_cycle(tasks: &[Task], adjacency: &[Vec<usize>]) -> Result<(), DagError> {
    const UNSEEN: u8 = 0;
    const VISITING: u8 = 1;
    const DONE: u8 = 2;

    let n = adjacency.len();
    let mut state = vec![UNSEEN; n];
    for start in 0..n {
        if state[start] != UNSEEN {
            continue;
        }
        let mut stack: Vec<(usize, usize)> = vec![(start, 0)];
        state[start] = VISITING;
        while let Some(&mut (u, ref mut next)) = stack.last_mut() {
            if *next < adjacency[u].len() {
                let v = adjacency[u][*next];
                *next += 1;
                match state[v] {
                    VISITING => {
                        return Err(DagError::Cycle {
                            id: tasks[v].id.clone(),
                        });
                    }
                    UNSEEN => {
                        state[v] = VISITING;
                        stack.push((v, 0));
                    }
                    _ => {}
                }
            } else {
                state[u] = DONE;
                stack.pop();
            }
        }
    }
    Ok(())
}

/// All nodes reachable from `start` by one or more edges.
fn reachable_from(start: usize, adjacency: &[Vec<usize>], n: usize) -> BitSet {
    let mut seen = BitSet::with_capacity(n);
    let mut stack: Vec<usize> = adjacency[start].to_vec();
    while let Some(u) = stack.pop() {
        if seen.insert(u) {
            stack.extend_from_slice(&adjacency[u]);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use planforge_model::{AcceptanceCheck, DurationPert, Edge};

    fn task(id: &str) -> Task {
        Task {
            id: id.to_string(),
            feature_id: "F001".to_string(),
            title: format!("Task {id}"),
            duration: DurationPert::new(1.0, 2.0, 3.0),
            duration_unit: "hours".to_string(),
            acceptance_checks: vec![AcceptanceCheck::echo_ok()],
            ..Task::default()
        }
    }

    fn tasks(ids: &[&str]) -> Vec<Task> {
        ids.iter().map(|id| task(id)).collect()
    }

    #[test]
    fn linear_chain_layers_and_critical_path() {
        let ts = tasks(&["T001", "T002", "T003"]);
        let edges = vec![
            Edge::hard("T001", "T002", "sequential"),
            Edge::hard("T002", "T003", "technical"),
        ];
        let dag = build(&ts, &edges, 0.7).unwrap();
        assert!(dag.analysis.ok);
        let depths: Vec<usize> = dag.nodes.iter().map(|node| node.depth).collect();
        assert_eq!(depths, vec![0, 1, 2]);
        assert_eq!(dag.metrics.critical_path, vec!["T001", "T002", "T003"]);
        assert_eq!(dag.metrics.longest_path_length, 3);
        assert_eq!(dag.metrics.width_approx, 1);
        assert_eq!(dag.metrics.isolated_tasks, 0);
        assert!(dag.nodes.iter().all(|node| node.critical_path));
    }

    #[test]
    fn resource_edges_are_filtered_from_the_structural_dag() {
        let mut ts = tasks(&["T001", "T002", "T003"]);
        for t in &mut ts {
            t.resources.exclusive = vec!["db".to_string()];
        }
        let edges = vec![
            Edge::mutual_exclusion("T001", "T002"),
            Edge::mutual_exclusion("T001", "T003"),
            Edge::mutual_exclusion("T002", "T003"),
        ];
        let dag = build(&ts, &edges, 0.7).unwrap();
        assert!(dag.edges.is_empty());
        assert!(dag.nodes.iter().all(|node| node.depth == 0));
        assert_eq!(dag.metrics.width_approx, 3);
        assert_eq!(dag.metrics.dropped_by_type["resource"], 3);
        assert_eq!(dag.metrics.isolated_tasks, 3);
    }

    #[test]
    fn transitive_edge_is_removed() {
        let ts = tasks(&["A", "B", "C"]);
        let edges = vec![
            Edge::hard("A", "B", "technical"),
            Edge::hard("B", "C", "technical"),
            Edge::hard("A", "C", "technical"),
        ];
        let dag = build(&ts, &edges, 0.7).unwrap();
        let pairs: Vec<(String, String)> = dag
            .edges
            .iter()
            .map(|edge| (edge.from.clone(), edge.to.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("A".to_string(), "B".to_string()),
                ("B".to_string(), "C".to_string()),
            ]
        );
        assert_eq!(dag.metrics.critical_path, vec!["A", "B", "C"]);
        assert_eq!(dag.metrics.longest_path_length, 3);
        assert!(dag.edges.iter().all(|edge| !edge.transitive));
    }

    #[test]
    fn cycle_is_fatal() {
        let ts = tasks(&["A", "B"]);
        let edges = vec![
            Edge::hard("A", "B", "technical"),
            Edge::hard("B", "A", "technical"),
        ];
        let err = build(&ts, &edges, 0.7).unwrap_err();
        assert!(matches!(err, DagError::Cycle { .. }));
        let failed = err.failed_file();
        assert!(!failed.analysis.ok);
        assert!(failed.analysis.errors[0].contains("cycle detected"));
    }

    #[test]
    fn duplicate_task_id_is_fatal() {
        let ts = tasks(&["T001", "T001"]);
        let err = build(&ts, &[], 0.7).unwrap_err();
        match err {
            DagError::DuplicateTask { id, first, duplicate } => {
                assert_eq!(id, "T001");
                assert_eq!((first, duplicate), (0, 1));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_task_set_is_fatal() {
        let err = build(&[], &[], 0.7).unwrap_err();
        assert!(matches!(err, DagError::EmptyTaskSet));
    }

    #[test]
    fn low_confidence_and_soft_edges_are_dropped() {
        let ts = tasks(&["A", "B"]);
        let soft = Edge {
            is_hard: false,
            ..Edge::hard("A", "B", "sequential")
        };
        let hesitant = Edge {
            confidence: 0.3,
            ..Edge::hard("A", "B", "technical")
        };
        let dag = build(&ts, &[soft, hesitant], 0.7).unwrap();
        assert!(dag.edges.is_empty());
        assert_eq!(dag.metrics.dropped_by_type["sequential"], 1);
        assert_eq!(dag.metrics.dropped_by_type["technical"], 1);
        assert_eq!(dag.analysis.soft_deps.len(), 1);
        assert_eq!(dag.analysis.soft_deps[0].edge_type, "sequential");
    }

    #[test]
    fn unknown_endpoints_and_blank_types_are_tallied() {
        let ts = tasks(&["A"]);
        let dangling = Edge::hard("A", "GHOST", "");
        let dag = build(&ts, &[dangling], 0.7).unwrap();
        assert_eq!(dag.metrics.dropped_by_type["unknown"], 1);
    }

    #[test]
    fn nodes_are_sorted_by_id_and_edges_by_endpoints() {
        let ts = tasks(&["T003", "T001", "T002"]);
        let edges = vec![
            Edge::hard("T003", "T002", "technical"),
            Edge::hard("T001", "T002", "technical"),
        ];
        let dag = build(&ts, &edges, 0.7).unwrap();
        let ids: Vec<&str> = dag.nodes.iter().map(|node| node.id.as_str()).collect();
        assert_eq!(ids, vec!["T001", "T002", "T003"]);
        assert_eq!(dag.edges[0].from, "T001");
        assert_eq!(dag.edges[1].from, "T003");
    }

    #[test]
    fn diamond_keeps_both_branches() {
        let ts = tasks(&["A", "B", "C", "D"]);
        let edges = vec![
            Edge::hard("A", "B", "technical"),
            Edge::hard("A", "C", "technical"),
            Edge::hard("B", "D", "technical"),
            Edge::hard("C", "D", "technical"),
        ];
        let dag = build(&ts, &edges, 0.7).unwrap();
        assert_eq!(dag.edges.len(), 4);
        assert_eq!(dag.metrics.width_approx, 2);
        assert_eq!(dag.metrics.longest_path_length, 3);
        assert_eq!(dag.metrics.edge_density, 4.0 / 12.0);
    }

    #[test]
    fn duplicate_edges_collapse_in_the_artifact() {
        let ts = tasks(&["A", "B"]);
        let edges = vec![
            Edge::hard("A", "B", "sequential"),
            Edge::hard("A", "B", "technical"),
        ];
        let dag = build(&ts, &edges, 0.7).unwrap();
        assert_eq!(dag.edges.len(), 1);
        // First record wins the type lookup.
        assert_eq!(dag.edges[0].edge_type, "sequential");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Random acyclic edge sets: only forward edges i < j are generated.
        fn arb_dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
            (2usize..10).prop_flat_map(|n| {
                let pairs: Vec<(usize, usize)> = (0..n)
                    .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
                    .collect();
                let len = pairs.len();
                (
                    Just(n),
                    proptest::sample::subsequence(pairs, 0..=len),
                )
            })
        }

        proptest! {
            #[test]
            fn structural_invariants_hold((n, pairs) in arb_dag()) {
                let ts: Vec<Task> = (0..n).map(|i| task(&format!("T{:03}", i + 1))).collect();
                let edges: Vec<Edge> = pairs
                    .iter()
                    .map(|&(i, j)| Edge::hard(ts[i].id.clone(), ts[j].id.clone(), "technical"))
                    .collect();
                let dag = build(&ts, &edges, 0.7).unwrap();

                // Node count always equals the task count.
                prop_assert_eq!(dag.nodes.len(), n);

                let depth_of: std::collections::HashMap<&str, usize> = dag
                    .nodes
                    .iter()
                    .map(|node| (node.id.as_str(), node.depth))
                    .collect();
                // Every emitted edge goes strictly downward in depth.
                for edge in &dag.edges {
                    prop_assert!(depth_of[edge.to.as_str()] > depth_of[edge.from.as_str()]);
                    prop_assert!(!edge.transitive);
                }

                // No emitted edge is implied by a longer path through the
                // emitted set.
                let mut adj: std::collections::HashMap<&str, Vec<&str>> = Default::default();
                for edge in &dag.edges {
                    adj.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
                }
                let reaches = |from: &str, to: &str| -> bool {
                    let mut stack = vec![from];
                    let mut seen = std::collections::HashSet::new();
                    while let Some(u) = stack.pop() {
                        for &v in adj.get(u).map(Vec::as_slice).unwrap_or_default() {
                            if v == to {
                                return true;
                            }
                            if seen.insert(v) {
                                stack.push(v);
                            }
                        }
                    }
                    false
                };
                for edge in &dag.edges {
                    let implied = adj[edge.from.as_str()]
                        .iter()
                        .any(|&w| w != edge.to && reaches(w, edge.to.as_str()));
                    prop_assert!(!implied, "edge {}→{} is transitive", edge.from, edge.to);
                }

                // The critical path is a path in the emitted edge set.
                let path = &dag.metrics.critical_path;
                prop_assert_eq!(path.len(), dag.metrics.longest_path_length);
                for pair in path.windows(2) {
                    let present = dag
                        .edges
                        .iter()
                        .any(|edge| edge.from == pair[0] && edge.to == pair[1]);
                    prop_assert!(present, "critical path step {}→{} missing", pair[0], pair[1]);
                }
            }
        }
    }
}

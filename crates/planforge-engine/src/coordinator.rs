//! Coordinator projection: tasks + edges into the runtime handoff shape.

use std::collections::BTreeMap;

use planforge_model::{
    Coordinator, DagFile, Edge, SCHEMA_VERSION, Task,
};

/// Concurrency ceiling handed to the executor when nothing else is known.
const DEFAULT_CONCURRENCY_MAX: u32 = 4;

/// Project the plan into the coordinator contract with default policy
/// constants and schedule estimates drawn from DAG metrics.
#[must_use]
pub fn build_coordinator(tasks: &[Task], dependencies: &[Edge], dag: &DagFile) -> Coordinator {
    let mut coordinator = Coordinator::default();
    coordinator.version = SCHEMA_VERSION.to_string();
    coordinator.graph.nodes = tasks.to_vec();
    coordinator.graph.edges = dependencies.to_vec();
    coordinator
        .config
        .resources
        .profiles
        .insert("default".to_string(), BTreeMap::new());
    coordinator.config.policies.concurrency_max = DEFAULT_CONCURRENCY_MAX;
    coordinator.metrics.estimates.p50_total_hours =
        tasks.iter().map(|t| t.duration.most_likely).sum();
    coordinator.metrics.estimates.longest_path_length = dag.metrics.longest_path_length;
    coordinator.metrics.estimates.width_approx = dag.metrics.width_approx;
    coordinator
}

#[cfg(test)]
mod tests {
    use super::*;
    use planforge_model::DurationPert;

    #[test]
    fn projects_graph_and_estimates() {
        let tasks = vec![
            Task {
                id: "T001".into(),
                duration: DurationPert::new(1.0, 2.0, 3.0),
                ..Task::default()
            },
            Task {
                id: "T002".into(),
                duration: DurationPert::new(2.0, 4.0, 8.0),
                ..Task::default()
            },
        ];
        let deps = vec![Edge::hard("T001", "T002", "sequential")];
        let mut dag = DagFile::default();
        dag.metrics.longest_path_length = 2;
        dag.metrics.width_approx = 1;

        let coordinator = build_coordinator(&tasks, &deps, &dag);
        assert_eq!(coordinator.version, SCHEMA_VERSION);
        assert_eq!(coordinator.graph.nodes.len(), 2);
        assert_eq!(coordinator.graph.edges.len(), 1);
        assert_eq!(coordinator.metrics.estimates.p50_total_hours, 6.0);
        assert_eq!(coordinator.metrics.estimates.longest_path_length, 2);
        assert_eq!(coordinator.config.policies.concurrency_max, 4);
        assert!(coordinator.config.resources.profiles.contains_key("default"));
    }
}

//! On-disk artifact shapes: `tasks.json`, `dag.json`, `waves.json`,
//! `features.json`.
//!
//! Each hash-bearing artifact embeds `meta.artifact_hash` computed over its
//! canonical preimage (the hash field blanked); cross-references
//! (`dag.meta.tasks_hash`, `waves.meta.planId`) carry the tasks artifact hash.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::edge::Edge;
use crate::report::ValidatorReport;
use crate::task::Task;

/// Shared `meta` block for artifacts without cross-references.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub version: String,
    pub artifact_hash: String,
}

/// The `tasks.json` root container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksFile {
    pub meta: TasksMeta,
    pub tasks: Vec<Task>,
    pub dependencies: Vec<Edge>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub resource_conflicts: BTreeMap<String, ResourceConflict>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TasksMeta {
    pub version: String,
    pub min_confidence: f64,
    pub artifact_hash: String,
    pub codebase_analysis: Value,
    pub autonormalization: Autonormalization,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validator_reports: Vec<ValidatorReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Autonormalization {
    pub split: Vec<String>,
    pub merged: Vec<String>,
}

/// Tasks contending on one exclusive resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConflict {
    #[serde(rename = "type")]
    pub kind: String,
    pub tasks: Vec<String>,
}

impl ResourceConflict {
    /// A conflict over an exclusive resource; `tasks` must be sorted.
    #[must_use]
    pub fn exclusive(tasks: Vec<String>) -> Self {
        Self {
            kind: "exclusive".to_string(),
            tasks,
        }
    }
}

/// The `dag.json` artifact: the minimized structural precedence graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagFile {
    pub meta: DagMeta,
    pub nodes: Vec<DagNode>,
    pub edges: Vec<DagEdge>,
    pub metrics: DagMetrics,
    pub analysis: DagAnalysis,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagMeta {
    pub version: String,
    pub artifact_hash: String,
    pub tasks_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagNode {
    pub id: String,
    pub depth: usize,
    pub critical_path: bool,
    pub parallel_opportunity: u32,
}

/// Only non-transitive edges survive into the artifact, so `transitive` is
/// always false; the field stays in the shape for downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagEdge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub transitive: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagMetrics {
    pub min_confidence_applied: f64,
    pub kept_by_type: BTreeMap<String, u64>,
    pub dropped_by_type: BTreeMap<String, u64>,
    pub nodes: usize,
    pub edges: usize,
    pub edge_density: f64,
    pub width_approx: usize,
    pub longest_path_length: usize,
    pub critical_path: Vec<String>,
    pub isolated_tasks: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DagAnalysis {
    pub ok: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub soft_deps: Vec<Edge>,
}

/// The `waves.json` artifact: subwaves of task IDs, executable in parallel,
/// emitted in non-decreasing depth order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WavesArtifact {
    pub meta: WavesMeta,
    pub waves: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WavesMeta {
    pub version: String,
    /// Equal to `tasks.meta.artifact_hash`; ties the schedule to the plan.
    #[serde(rename = "planId")]
    pub plan_id: String,
    pub artifact_hash: String,
}

/// The `features.json` artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeaturesArtifact {
    pub meta: ArtifactMeta,
    pub features: Vec<FeatureEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureEntry {
    pub id: String,
    pub title: String,
}

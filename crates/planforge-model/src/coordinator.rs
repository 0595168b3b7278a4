//! The `coordinator.json` runtime handoff contract.
//!
//! This artifact carries no `artifact_hash`; its canonical bytes are hashed
//! for the emission report but nothing is embedded.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::edge::Edge;
use crate::task::Task;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Coordinator {
    pub version: String,
    pub graph: CoordinatorGraph,
    pub config: CoordinatorConfig,
    pub metrics: CoordinatorMetrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorGraph {
    pub nodes: Vec<Task>,
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub resources: CoordinatorResources,
    pub policies: CoordinatorPolicies,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorResources {
    pub catalog: BTreeMap<String, ResourceSpec>,
    pub profiles: BTreeMap<String, BTreeMap<String, u32>>,
}

/// Catalog entry for a named runtime resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSpec {
    pub capacity: u32,
    pub mode: String,
    pub lock_order: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorPolicies {
    pub concurrency_max: u32,
    pub lock_ordering: Vec<String>,
    pub circuit_breaker_thresholds: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorMetrics {
    pub estimates: CoordinatorEstimates,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoordinatorEstimates {
    pub p50_total_hours: f64,
    pub longest_path_length: usize,
    pub width_approx: usize,
}

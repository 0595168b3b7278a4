//! Domain and artifact types shared across the planforge pipeline.
//!
//! These are the serialization views: string task IDs, artifact shapes that
//! map one-to-one onto the emitted JSON files. Graph algorithms keep their
//! own compact index-based records and convert at the boundary.

pub mod artifacts;
pub mod coordinator;
pub mod edge;
pub mod report;
pub mod task;

pub use artifacts::{
    ArtifactMeta, Autonormalization, DagAnalysis, DagEdge, DagFile, DagMeta, DagMetrics, DagNode,
    FeatureEntry, FeaturesArtifact, ResourceConflict, TasksFile, TasksMeta, WavesArtifact,
    WavesMeta,
};
pub use coordinator::{Coordinator, CoordinatorEstimates, ResourceSpec};
pub use edge::{Edge, Evidence};
pub use report::{VALIDATOR_DETAIL_LIMIT, ValidatorReport, truncate_detail};
pub use task::{
    AcceptanceCheck, Compensation, DurationPert, ExecutionLogging, InterfaceConsumed,
    InterfaceProduced, ResourceNeed, Task, TaskResources,
};

/// Schema version tag stamped into every artifact's `meta.version`.
pub const SCHEMA_VERSION: &str = "v8";

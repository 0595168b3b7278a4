//! planforge - a deterministic plan compiler.
//!
//! Turns a lightweight structured planning document into content-addressed
//! JSON artifacts: the task set, a minimized precedence DAG, a wave
//! schedule, a feature index and a runtime coordinator contract. Every
//! artifact carries a SHA-256 digest over its canonical byte form so
//! downstream consumers can trust and cache by hash.

pub mod cli;

// Stable re-exports for library consumers.
pub use planforge_canon::{CanonError, HashCheck, canonicalize, check_artifact_hash, hash_canonical};
pub use planforge_engine::{
    DEFAULT_MIN_CONFIDENCE, PlanError, PlanOutcome, PlanRequest, PlanService,
};
pub use planforge_model::{
    Coordinator, DagFile, Edge, FeaturesArtifact, SCHEMA_VERSION, Task, TasksFile,
    ValidatorReport, WavesArtifact,
};
pub use planforge_validators::{DEFAULT_VALIDATOR_TIMEOUT, ValidatorConfig};

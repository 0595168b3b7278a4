use planforge_dag::DagError;
use planforge_emitter::EmitError;
use planforge_validators::ValidatorError;
use thiserror::Error;

/// Plan service failures, one variant per error kind in the pipeline
/// taxonomy. Component errors are wrapped with a short context; non-strict
/// validator failures never reach this type; they demote to warnings.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("parse plan document: {0}")]
    Spec(String),

    #[error("configuration: {0}")]
    Config(String),

    #[error("tasks missing acceptance checks: {}", ids.join(", "))]
    AcceptanceMissing { ids: Vec<String> },

    #[error("build dag: {0}")]
    Dag(#[from] DagError),

    #[error("validate {artifact}: {reason}")]
    Validation { artifact: String, reason: String },

    #[error("validators: {0}")]
    Validator(#[from] ValidatorError),

    #[error("validators reported failure: {}", names.join(", "))]
    ValidatorGate { names: Vec<String> },

    #[error("write artifacts: {0}")]
    Emit(#[from] EmitError),

    #[error("read plan document {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("analyze repository: {0}")]
    Census(#[source] std::io::Error),
}

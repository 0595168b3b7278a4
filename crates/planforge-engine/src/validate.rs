//! Structural validation of artifacts before emission.
//!
//! These are the shape checks the pipeline owns; full JSON-Schema validation
//! is an external collaborator.

use planforge_model::{DagFile, TasksFile};

use crate::error::PlanError;

/// Check `tasks.json` structure: version tag, non-empty task set, per-task
/// identity and acceptance presence.
pub fn tasks_file(tf: &TasksFile) -> Result<(), PlanError> {
    let fail = |reason: String| {
        Err(PlanError::Validation {
            artifact: "tasks.json".to_string(),
            reason,
        })
    };
    if tf.meta.version.is_empty() {
        return fail("meta.version required".to_string());
    }
    if tf.tasks.is_empty() {
        return fail("at least one task required".to_string());
    }
    for (i, task) in tf.tasks.iter().enumerate() {
        if task.id.is_empty() {
            return fail(format!("task[{i}].id required"));
        }
        if task.title.is_empty() {
            return fail(format!("task[{i}].title required"));
        }
        if task.acceptance_checks.is_empty() {
            return fail(format!("task[{}] acceptance_checks required", task.id));
        }
    }
    Ok(())
}

/// Check `dag.json` structure: version tag and non-empty node list.
pub fn dag_file(df: &DagFile) -> Result<(), PlanError> {
    let fail = |reason: String| {
        Err(PlanError::Validation {
            artifact: "dag.json".to_string(),
            reason,
        })
    };
    if df.meta.version.is_empty() {
        return fail("meta.version required".to_string());
    }
    if df.nodes.is_empty() {
        return fail("nodes required".to_string());
    }
    Ok(())
}

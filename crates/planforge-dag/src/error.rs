use planforge_model::{DagFile, SCHEMA_VERSION};
use thiserror::Error;

/// Fatal DAG build invariants. Filter decisions are never fatal; only
/// identity and structure violations are.
#[derive(Debug, Clone, Error)]
pub enum DagError {
    #[error("duplicate task id {id} (first index {first}, duplicate index {duplicate})")]
    DuplicateTask {
        id: String,
        first: usize,
        duplicate: usize,
    },

    #[error("no tasks to build DAG")]
    EmptyTaskSet,

    #[error("cycle detected in dependencies involving task {id}")]
    Cycle { id: String },

    #[error("not all nodes reached in topological order")]
    TopologicalOrder,
}

impl DagError {
    /// The failed artifact corresponding to this error: `analysis.ok` false
    /// with the error message recorded. The pipeline aborts before emission,
    /// but callers inspecting the build still see a well-formed shape.
    #[must_use]
    pub fn failed_file(&self) -> DagFile {
        let mut file = DagFile::default();
        file.meta.version = SCHEMA_VERSION.to_string();
        file.analysis.ok = false;
        file.analysis.errors.push(self.to_string());
        file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_file_carries_the_message() {
        let err = DagError::EmptyTaskSet;
        let file = err.failed_file();
        assert!(!file.analysis.ok);
        assert_eq!(file.analysis.errors, vec![err.to_string()]);
        assert_eq!(file.meta.version, SCHEMA_VERSION);
    }
}

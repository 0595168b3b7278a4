use serde::Serialize;

use planforge_canon::{CanonError, canonical_bytes, hash_canonical};
use planforge_model::{Coordinator, DagFile, TasksFile};

/// The wire payload fed to every validator on stdin: canonical JSON of the
/// tasks, DAG and coordinator artifacts.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Payload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks: Option<&'a TasksFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dag: Option<&'a DagFile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<&'a Coordinator>,
}

impl Payload<'_> {
    /// Canonical bytes and their SHA-256, computed once per run; the hash is
    /// the cache key for every validator.
    pub fn canonical(&self) -> Result<(Vec<u8>, String), CanonError> {
        let bytes = canonical_bytes(self)?;
        let hash = hash_canonical(&bytes);
        Ok((bytes, hash))
    }
}

use planforge_canon::CanonError;
use thiserror::Error;

/// Emission failures. `Aggregate` carries every artifact failure from one
/// bundle pass so the caller sees the whole picture at once.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("canonicalize {path}: {source}")]
    Canon {
        path: String,
        #[source]
        source: CanonError,
    },

    #[error("hash callback panicked for {path}")]
    SetHashPanicked { path: String },

    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Aggregate(Vec<EmitError>),
}

use thiserror::Error;

/// Errors raised while producing or verifying canonical JSON.
#[derive(Debug, Error)]
pub enum CanonError {
    #[error("failed to parse JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("failed to serialize value to JSON: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("unexpected JSON shape: {0}")]
    Shape(String),
}

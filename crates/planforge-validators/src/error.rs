use planforge_canon::CanonError;
use thiserror::Error;

/// Validator orchestration failures.
///
/// Only execution problems are errors: a validator *reporting* `fail` is a
/// report, not an error; strict-mode gating on report statuses belongs to
/// the plan service.
#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error("validator {name} timed out after {seconds}s")]
    Timeout { name: String, seconds: u64 },

    #[error("validator {name} failed to start: {reason}")]
    Spawn { name: String, reason: String },

    #[error("validator {name} exited with code {code}: {detail}")]
    Failed {
        name: String,
        code: i32,
        detail: String,
    },

    #[error("validator cache: {0}")]
    Cache(#[from] std::io::Error),

    #[error("validator payload: {0}")]
    Payload(#[from] CanonError),

    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    Aggregate(Vec<ValidatorError>),
}

impl ValidatorError {
    /// True when the failure was a deadline, i.e. a cancellation rather than
    /// a verdict.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Aggregate(errors) => errors.iter().any(Self::is_cancellation),
            _ => false,
        }
    }
}

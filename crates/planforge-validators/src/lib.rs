//! Validator orchestration.
//!
//! Validators are external programs: they receive the canonical plan payload
//! on stdin and answer with a JSON verdict on stdout. Runs are cached on the
//! filesystem keyed by `(validator name, payload hash)`, so identical
//! payloads are never re-executed. Validators run sequentially in a fixed order
//! (acceptance, evidence, interface), each under its own deadline.

mod cache;
mod config;
mod error;
mod payload;
mod runner;

pub use config::{DEFAULT_VALIDATOR_TIMEOUT, ValidatorConfig};
pub use error::ValidatorError;
pub use payload::Payload;
pub use runner::{RunOutcome, ValidatorRunner};

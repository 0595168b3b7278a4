//! Canonical JSON and preimage hashing.
//!
//! Every artifact this pipeline emits is hashed over a *canonical* byte form:
//! object keys sorted at every level, two-space indentation, no HTML escaping,
//! a single trailing newline, and numbers rendered in a minimal decimal form.
//! The canonical bytes are the contract: downstream consumers cache and diff
//! by the SHA-256 of exactly these bytes.

pub mod canonical;
pub mod error;
pub mod verify;

pub use canonical::{canonical_bytes, canonicalize, canonicalize_value, hash_canonical};
pub use error::CanonError;
pub use verify::{HashCheck, check_artifact_hash};

//! The preimage-hash write protocol for a single artifact.

use std::panic::{AssertUnwindSafe, catch_unwind};

use camino::Utf8Path;
use serde::Serialize;
use tracing::debug;

use planforge_canon::{canonical_bytes, hash_canonical};

use crate::atomic::write_bytes_atomic;
use crate::error::EmitError;

/// Write `value` as canonical JSON and return the hash of those bytes.
///
/// Used for artifacts without an embedded `artifact_hash` (the coordinator):
/// the bytes on disk are the preimage itself.
pub fn write_canonical<T: Serialize>(path: &Utf8Path, value: &T) -> Result<String, EmitError> {
    let bytes = canonical_bytes(value).map_err(|source| EmitError::Canon {
        path: path.to_string(),
        source,
    })?;
    let hash = hash_canonical(&bytes);
    write_bytes_atomic(path, &bytes).map_err(|source| EmitError::Io {
        path: path.to_string(),
        source,
    })?;
    debug!(path = %path, hash = %hash, "wrote artifact");
    Ok(hash)
}

/// Write `value` with its preimage hash embedded.
///
/// The hash is computed over the canonical form in which the hash field is
/// the empty string (the caller pre-blanks it), then `set_hash` embeds the
/// hex and the value is re-canonicalized for the final write. The stored
/// hash therefore reflects the preimage, not the on-disk bytes.
///
/// A panicking `set_hash` is trapped and converted into an error.
pub fn write_with_artifact_hash<T, F>(
    path: &Utf8Path,
    value: &mut T,
    set_hash: F,
) -> Result<String, EmitError>
where
    T: Serialize,
    F: FnOnce(&mut T, &str),
{
    let preimage = canonical_bytes(value).map_err(|source| EmitError::Canon {
        path: path.to_string(),
        source,
    })?;
    let hash = hash_canonical(&preimage);

    let embedded = catch_unwind(AssertUnwindSafe(|| set_hash(value, &hash)));
    if embedded.is_err() {
        return Err(EmitError::SetHashPanicked {
            path: path.to_string(),
        });
    }

    let final_bytes = canonical_bytes(value).map_err(|source| EmitError::Canon {
        path: path.to_string(),
        source,
    })?;
    write_bytes_atomic(path, &final_bytes).map_err(|source| EmitError::Io {
        path: path.to_string(),
        source,
    })?;
    debug!(path = %path, hash = %hash, "wrote hash-bearing artifact");
    Ok(hash)
}

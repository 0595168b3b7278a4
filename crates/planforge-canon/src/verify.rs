//! Artifact hash verification.
//!
//! Artifacts embed their own hash at `meta.artifact_hash`, computed over the
//! canonical form in which that field is the empty string. Verification
//! therefore reconstructs the preimage by blanking the field before hashing;
//! the raw SHA-256 of the on-disk bytes will not match the stored hash.

use serde_json::Value;

use crate::canonical::{canonical_bytes, hash_canonical};
use crate::error::CanonError;

/// Outcome of checking one artifact's embedded hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HashCheck {
    /// The root object carries no `meta`; there is nothing to verify.
    NoMeta,
    /// The preimage hash was recomputed and compared to the stored value.
    Checked { computed: String, stored: String },
}

impl HashCheck {
    /// True when the artifact is internally consistent.
    #[must_use]
    pub fn matches(&self) -> bool {
        match self {
            Self::NoMeta => true,
            Self::Checked { computed, stored } => computed == stored,
        }
    }
}

/// Recompute an artifact's preimage hash and compare it to the stored one.
///
/// The root must be a JSON object; `meta` missing is tolerated, `meta` of a
/// non-object shape is not.
pub fn check_artifact_hash(raw: &[u8]) -> Result<HashCheck, CanonError> {
    let value: Value = serde_json::from_slice(raw).map_err(CanonError::Parse)?;
    let Value::Object(mut root) = value else {
        return Err(CanonError::Shape("artifact root is not an object".into()));
    };
    let Some(meta_value) = root.get_mut("meta") else {
        return Ok(HashCheck::NoMeta);
    };
    let Value::Object(meta) = meta_value else {
        return Err(CanonError::Shape("meta is not an object".into()));
    };
    let stored = meta
        .get("artifact_hash")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    meta.insert("artifact_hash".to_string(), Value::String(String::new()));

    let preimage = canonical_bytes(&Value::Object(root))?;
    let computed = hash_canonical(&preimage);
    Ok(HashCheck::Checked { computed, stored })
}

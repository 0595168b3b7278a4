//! Artifact emission.
//!
//! Writes the five JSON artifacts plus the `Plan.md` summary in a fixed
//! order, because later artifacts embed earlier hashes. Every write is
//! canonical bytes through a temp-file-and-rename so a crashed run never
//! leaves a torn artifact. Write failures are collected across the whole
//! bundle rather than short-circuiting.

mod atomic;
mod bundle;
mod error;
mod write;

pub use atomic::write_bytes_atomic;
pub use bundle::{ArtifactBundle, write_bundle};
pub use error::EmitError;
pub use write::{write_canonical, write_with_artifact_hash};

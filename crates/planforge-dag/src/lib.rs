//! Minimized precedence DAG construction.
//!
//! Build phases: index and validate task IDs, filter edges down to the hard
//! structural set, detect cycles, layer with Kahn's algorithm, compute the
//! longest path (critical path), transitively reduce, then project metrics
//! and the serialization view.
//!
//! Algorithms run over compact integer indices; string task IDs appear only
//! at the artifact boundary. Reachability for the reduction uses bit-sets
//! keyed by task index.

mod bitset;
mod builder;
mod error;

pub use builder::build;
pub use error::DagError;

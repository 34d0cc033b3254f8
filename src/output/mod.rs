//! Derived file publication and the artifact registry

pub mod registry;
pub mod writer;

pub use registry::{ArtifactKey, ArtifactRegistry, PendingArtifact, Registration};
pub use writer::{pending_path, publish, sweep_pending, write_atomic, PENDING_PREFIX};

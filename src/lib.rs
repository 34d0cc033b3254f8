//! splitx library
//!
//! Splits uploaded videos at user-given markers, samples preview thumbnails
//! and splices chosen segments back into a new file, driving `ffmpeg` and
//! `ffprobe` as external processes.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod output;
pub mod planner;
pub mod ports;
pub mod probe;
pub mod server;

// Re-export commonly used types
pub use config_initialization::AppConfig;
pub use domain::errors::{DomainError, DomainResult};
pub use domain::model::{Artifact, ArtifactKind, MediaInfo, SourceAsset, TimeRange, TimeSpec};

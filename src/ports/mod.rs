// Ports - Interface definitions (contracts) for the external media tool

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Port for media file probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe a media file for duration and stream basics.
    ///
    /// Fails with `ProbeFailed` when the file cannot be read or reports no
    /// usable duration. Implementations never substitute a default.
    async fn probe_media(&self, file_path: &Path) -> Result<MediaInfo, DomainError>;
}

/// Port for the encode operations run against the media tool
#[async_trait]
pub trait ExecutePort: Send + Sync {
    /// Grab one frame at `at` seconds, scaled down to at most `max_width`
    async fn extract_frame(
        &self,
        input: &Path,
        at: f64,
        output: &Path,
        max_width: u32,
    ) -> Result<PathBuf, DomainError>;

    /// Cut `range` out of `input` without re-encoding
    async fn trim(
        &self,
        input: &Path,
        range: &TimeRange,
        output: &Path,
    ) -> Result<PathBuf, DomainError>;

    /// Join `inputs` in order into `output` without re-encoding
    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<PathBuf, DomainError>;
}


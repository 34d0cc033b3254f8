//! FFprobe adapter for media file probing
//!
//! Runs `ffprobe -print_format json` and reads duration and stream basics
//! from its output.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatSection>,
    streams: Option<Vec<StreamSection>>,
}

#[derive(Deserialize)]
struct FormatSection {
    format_name: Option<String>,
    duration: Option<String>,
}

#[derive(Deserialize)]
struct StreamSection {
    index: Option<usize>,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// FFprobe-based probe adapter
pub struct FFprobeAdapter {
    binary: String,
}

impl FFprobeAdapter {
    /// Create new FFprobe adapter for the given executable
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl ProbePort for FFprobeAdapter {
    async fn probe_media(&self, file_path: &Path) -> Result<MediaInfo, DomainError> {
        if !file_path.is_file() {
            return Err(DomainError::ProbeFailed(format!(
                "No such file: {}",
                file_path.display()
            )));
        }

        let output = Command::new(&self.binary)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(file_path)
            .output()
            .await
            .map_err(|e| {
                DomainError::ProbeFailed(format!("Failed to run {}: {}", self.binary, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DomainError::ProbeFailed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        let info = parse_probe_output(&String::from_utf8_lossy(&output.stdout))?;
        debug!(
            file = %file_path.display(),
            duration = info.duration,
            streams = info.streams.len(),
            "Probed media file"
        );
        Ok(info)
    }
}

/// Turn ffprobe JSON into [`MediaInfo`].
///
/// The container duration is preferred; the longest stream duration is used
/// when the container does not report one. No duration at all is an error.
pub fn parse_probe_output(json: &str) -> Result<MediaInfo, DomainError> {
    let probe: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| DomainError::ProbeFailed(format!("Unreadable ffprobe output: {}", e)))?;

    let sections = probe.streams.unwrap_or_default();
    let format_duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_duration);
    let stream_duration = sections
        .iter()
        .filter_map(|s| s.duration.as_deref().and_then(parse_duration))
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));

    let duration = format_duration.or(stream_duration).ok_or_else(|| {
        DomainError::ProbeFailed("Media file reports no duration".to_string())
    })?;

    let streams = sections
        .into_iter()
        .enumerate()
        .map(|(position, s)| StreamInfo {
            index: s.index.unwrap_or(position),
            codec_type: s.codec_type.unwrap_or_else(|| "unknown".to_string()),
            codec_name: s.codec_name,
            width: s.width,
            height: s.height,
        })
        .collect();

    MediaInfo::new(duration, probe.format.and_then(|f| f.format_name), streams)
}

fn parse_duration(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

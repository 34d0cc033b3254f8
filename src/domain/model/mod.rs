// Domain models - Core types and data structures

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::domain::errors::DomainError;

/// Time specification - represents time in seconds with fractional precision
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct TimeSpec {
    pub seconds: f64,
}

impl TimeSpec {
    /// Create a new TimeSpec from seconds
    pub fn from_seconds(seconds: f64) -> Self {
        Self { seconds }
    }

    pub fn as_seconds(&self) -> f64 {
        self.seconds
    }

    /// Parse time string: seconds (`93.5`), `MM:SS.ms` or `HH:MM:SS.ms`
    pub fn parse(time_str: &str) -> Result<Self, DomainError> {
        let trimmed = time_str.trim();

        if let Ok(seconds) = trimmed.parse::<f64>() {
            if !seconds.is_finite() {
                return Err(DomainError::InvalidInput(format!(
                    "Time must be a finite number: {}",
                    trimmed
                )));
            }
            if seconds < 0.0 {
                return Err(DomainError::InvalidInput("Time cannot be negative".to_string()));
            }
            return Ok(Self::from_seconds(seconds));
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        let (hours, minutes, seconds) = match parts.as_slice() {
            [m, s] => (0, Self::parse_unit(m, "minutes")?, Self::parse_seconds(s)?),
            [h, m, s] => {
                let minutes = Self::parse_unit(m, "minutes")?;
                if minutes >= 60 {
                    return Err(DomainError::InvalidInput(
                        "Minutes must be less than 60".to_string(),
                    ));
                }
                (Self::parse_unit(h, "hours")?, minutes, Self::parse_seconds(s)?)
            }
            _ => {
                return Err(DomainError::InvalidInput(format!(
                    "Invalid time format '{}'. Supported formats: seconds (e.g., 123.45), MM:SS.ms (e.g., 2:30.5), HH:MM:SS.ms (e.g., 1:02:30.5)",
                    trimmed
                )))
            }
        };

        Ok(Self::from_seconds(
            hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds,
        ))
    }

    fn parse_unit(part: &str, name: &str) -> Result<u32, DomainError> {
        part.parse::<u32>()
            .map_err(|_| DomainError::InvalidInput(format!("Invalid {} format: {}", name, part)))
    }

    fn parse_seconds(part: &str) -> Result<f64, DomainError> {
        let seconds = part
            .parse::<f64>()
            .map_err(|_| DomainError::InvalidInput(format!("Invalid seconds format: {}", part)))?;
        if !(0.0..60.0).contains(&seconds) {
            return Err(DomainError::InvalidInput(
                "Seconds must be less than 60".to_string(),
            ));
        }
        Ok(seconds)
    }

    /// Format as HH:MM:SS.ms (hours omitted when zero)
    pub fn format_hms(&self) -> String {
        let total_millis = (self.seconds * 1000.0).round() as u64;
        let hours = total_millis / 3_600_000;
        let minutes = (total_millis % 3_600_000) / 60_000;
        let seconds = (total_millis % 60_000) / 1000;
        let milliseconds = total_millis % 1000;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, milliseconds)
        } else {
            format!("{:02}:{:02}.{:03}", minutes, seconds, milliseconds)
        }
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_hms())
    }
}

/// Contiguous interval of an asset, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

impl TimeRange {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.end - self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s-{:.3}s", self.start, self.end)
    }
}

/// Basic information about one stream of a media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub index: usize,
    pub codec_type: String,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Probe result for a media file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    pub duration: f64,
    pub format: Option<String>,
    pub streams: Vec<StreamInfo>,
}

impl MediaInfo {
    /// Create new media info; the duration must be positive and finite
    pub fn new(
        duration: f64,
        format: Option<String>,
        streams: Vec<StreamInfo>,
    ) -> Result<Self, DomainError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(DomainError::ProbeFailed(format!(
                "Media reports unusable duration: {}",
                duration
            )));
        }
        Ok(Self {
            duration,
            format,
            streams,
        })
    }

    pub fn primary_video_stream(&self) -> Option<&StreamInfo> {
        self.streams.iter().find(|s| s.codec_type == "video")
    }

    pub fn has_audio(&self) -> bool {
        self.streams.iter().any(|s| s.codec_type == "audio")
    }
}

/// Check that `id` names a single file inside a managed folder
pub fn validate_identifier(id: &str) -> Result<(), DomainError> {
    let valid = !id.is_empty()
        && id != "."
        && id != ".."
        && !id.starts_with('.')
        && !id.contains(|c: char| matches!(c, '/' | '\\' | '\0'))
        && id.len() <= 255;
    if valid {
        Ok(())
    } else {
        Err(DomainError::InvalidInput(format!("Invalid identifier: {:?}", id)))
    }
}

/// Uploaded source video. Immutable apart from the lazily probed duration.
#[derive(Debug)]
pub struct SourceAsset {
    id: String,
    path: PathBuf,
    duration: OnceCell<f64>,
}

impl SourceAsset {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            duration: OnceCell::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File extension including the dot, or empty
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default()
    }

    /// Duration if it has been probed already
    pub fn cached_duration(&self) -> Option<f64> {
        self.duration.get().copied()
    }

    pub(crate) fn duration_cell(&self) -> &OnceCell<f64> {
        &self.duration
    }
}

/// Kind of derived file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Thumbnail,
    Segment,
    Output,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 3] = [
        ArtifactKind::Thumbnail,
        ArtifactKind::Segment,
        ArtifactKind::Output,
    ];

    /// File name stem used for `<stem>_<index>.<ext>`
    pub fn stem(&self) -> &'static str {
        match self {
            ArtifactKind::Thumbnail => "thumb",
            ArtifactKind::Segment => "segment",
            ArtifactKind::Output => "output",
        }
    }

    /// Public URL prefix the serving layer exposes for this kind
    pub fn public_prefix(&self) -> &'static str {
        match self {
            ArtifactKind::Thumbnail => "/thumbs",
            ArtifactKind::Segment => "/segments",
            ArtifactKind::Output => "/outputs",
        }
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.stem())
    }
}

/// What a derived file was produced from. Two artifacts under the same name
/// must share a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Recipe {
    Frame { at_ms: u64, max_width: u32 },
    Trim { start_ms: u64, end_ms: u64 },
    Concat { inputs: Vec<String> },
}

impl Recipe {
    pub fn frame(at: f64, max_width: u32) -> Self {
        Recipe::Frame {
            at_ms: to_millis(at),
            max_width,
        }
    }

    pub fn trim(range: &TimeRange) -> Self {
        Recipe::Trim {
            start_ms: to_millis(range.start),
            end_ms: to_millis(range.end),
        }
    }
}

fn to_millis(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

/// A derived file known to the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub owner: String,
    pub index: usize,
    pub path: PathBuf,
    pub reference: String,
    pub recipe: Recipe,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests;

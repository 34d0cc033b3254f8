//! FFmpeg execution adapter
//!
//! Drives the `ffmpeg` executable for frame grabs, stream-copy trims and
//! concat-demuxer joins.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// Trims shorter than this are stretched so ffmpeg always gets a usable `-t`
const MIN_TRIM_SECONDS: f64 = 0.01;

/// FFmpeg-based execution adapter
pub struct FFmpegAdapter {
    binary: String,
}

impl FFmpegAdapter {
    /// Create new FFmpeg adapter for the given executable
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn tool_error(&self, detail: impl Into<String>) -> DomainError {
        DomainError::ToolFailed {
            tool: self.binary.clone(),
            detail: detail.into(),
        }
    }

    /// Run ffmpeg to completion and check that it produced `output`.
    ///
    /// The child is not killed when this future is dropped, so a job whose
    /// request went away still finishes; its output is simply never used.
    async fn run(&self, args: Vec<OsString>, output: &Path) -> Result<PathBuf, DomainError> {
        let started = Instant::now();
        debug!(
            "Running {} {}",
            self.binary,
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        let result = Command::new(&self.binary)
            .args(["-hide_banner", "-nostdin", "-loglevel", "error"])
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(false)
            .output()
            .await
            .map_err(|e| self.tool_error(format!("failed to start: {}", e)))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            discard_partial_output(output).await;
            return Err(self.tool_error(format!("{}: {}", result.status, stderr.trim())));
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => {}
            _ => {
                discard_partial_output(output).await;
                return Err(self.tool_error(format!(
                    "no output written to {}",
                    output.display()
                )));
            }
        }

        debug!(
            output = %output.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ffmpeg finished"
        );
        Ok(output.to_path_buf())
    }
}

async fn discard_partial_output(output: &Path) {
    match tokio::fs::remove_file(output).await {
        Ok(()) => debug!(output = %output.display(), "Removed partial output"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(output = %output.display(), error = %e, "Failed to remove partial output"),
    }
}

fn seconds_arg(seconds: f64) -> OsString {
    OsString::from(format!("{:.3}", seconds.max(0.0)))
}

/// Arguments for grabbing a single scaled frame
pub fn frame_args(input: &Path, at: f64, output: &Path, max_width: u32) -> Vec<OsString> {
    vec![
        "-ss".into(),
        seconds_arg(at),
        "-i".into(),
        input.into(),
        "-frames:v".into(),
        "1".into(),
        "-vf".into(),
        format!("scale='min({},iw)':-2", max_width).into(),
        "-q:v".into(),
        "2".into(),
        "-update".into(),
        "1".into(),
        "-y".into(),
        output.into(),
    ]
}

/// Arguments for a stream-copy trim
pub fn trim_args(input: &Path, range: &TimeRange, output: &Path) -> Vec<OsString> {
    vec![
        "-ss".into(),
        seconds_arg(range.start),
        "-i".into(),
        input.into(),
        "-t".into(),
        seconds_arg(range.length().max(MIN_TRIM_SECONDS)),
        "-c".into(),
        "copy".into(),
        "-avoid_negative_ts".into(),
        "make_zero".into(),
        "-y".into(),
        output.into(),
    ]
}

/// Arguments for a concat-demuxer join driven by `list_file`
pub fn concat_args(list_file: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_file.into(),
        "-c".into(),
        "copy".into(),
        "-y".into(),
        output.into(),
    ]
}

/// Concat-demuxer list: one `file '<path>'` line per input, in order
pub fn concat_list(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| format!("file '{}'\n", p.to_string_lossy().replace('\'', "'\\''")))
        .collect()
}

#[async_trait]
impl ExecutePort for FFmpegAdapter {
    async fn extract_frame(
        &self,
        input: &Path,
        at: f64,
        output: &Path,
        max_width: u32,
    ) -> Result<PathBuf, DomainError> {
        self.run(frame_args(input, at, output, max_width), output).await
    }

    async fn trim(
        &self,
        input: &Path,
        range: &TimeRange,
        output: &Path,
    ) -> Result<PathBuf, DomainError> {
        self.run(trim_args(input, range, output), output).await
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<PathBuf, DomainError> {
        if inputs.is_empty() {
            return Err(DomainError::InvalidInput("Nothing to concatenate".to_string()));
        }

        let mut absolute = Vec::with_capacity(inputs.len());
        for input in inputs {
            let resolved = tokio::fs::canonicalize(input)
                .await
                .map_err(|e| self.tool_error(format!("unreadable input {}: {}", input.display(), e)))?;
            absolute.push(resolved);
        }

        let list_dir = output.parent().unwrap_or_else(|| Path::new("."));
        let list_file = tempfile::Builder::new()
            .prefix(".pending-concat-")
            .suffix(".txt")
            .tempfile_in(list_dir)
            .map_err(|e| DomainError::FsFail(format!("Failed to create concat list: {}", e)))?
            .into_temp_path();
        tokio::fs::write(&list_file, concat_list(&absolute)).await?;

        // list_file is removed when it goes out of scope
        self.run(concat_args(&list_file, output), output).await
    }
}

// Mock adapter - Scripted in-process media tool for tests and dry runs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;

/// One recorded call against the mock tool
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    Probe(PathBuf),
    Frame { at_ms: u64 },
    Trim { start_ms: u64, end_ms: u64 },
    Concat { inputs: Vec<PathBuf> },
}

/// Media tool double implementing both ports.
///
/// Outputs are small text files describing what was produced, so tests can
/// check contents and ordering without real video.
pub struct MockMediaTool {
    duration: Option<f64>,
    failing_frames: HashSet<u64>,
    failing_trims: HashSet<u64>,
    fail_concat: bool,
    delay: Option<Duration>,
    calls: Mutex<Vec<ToolCall>>,
}

fn millis(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

impl MockMediaTool {
    /// Tool reporting `duration` for every probed file
    pub fn new(duration: f64) -> Self {
        Self {
            duration: Some(duration),
            failing_frames: HashSet::new(),
            failing_trims: HashSet::new(),
            fail_concat: false,
            delay: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Tool that cannot read any file
    pub fn unreadable() -> Self {
        Self {
            duration: None,
            ..Self::new(0.0)
        }
    }

    /// Frame grabs at `at` seconds fail
    pub fn failing_frame_at(mut self, at: f64) -> Self {
        self.failing_frames.insert(millis(at));
        self
    }

    /// Trims starting at `start` seconds fail
    pub fn failing_trim_from(mut self, start: f64) -> Self {
        self.failing_trims.insert(millis(start));
        self
    }

    pub fn failing_concat(mut self) -> Self {
        self.fail_concat = true;
        self
    }

    /// Sleep before every encode, to widen concurrency windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.lock().clone()
    }

    /// Number of frame, trim and concat invocations so far
    pub fn encode_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|c| !matches!(c, ToolCall::Probe(_)))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ToolCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(&self, call: ToolCall) {
        self.lock().push(call);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn failure(detail: impl Into<String>) -> DomainError {
        DomainError::ToolFailed {
            tool: "mock".to_string(),
            detail: detail.into(),
        }
    }

    async fn write(output: &Path, content: String) -> Result<PathBuf, DomainError> {
        tokio::fs::write(output, content).await?;
        Ok(output.to_path_buf())
    }
}

#[async_trait]
impl ProbePort for MockMediaTool {
    async fn probe_media(&self, file_path: &Path) -> Result<MediaInfo, DomainError> {
        self.record(ToolCall::Probe(file_path.to_path_buf()));
        let duration = self.duration.ok_or_else(|| {
            DomainError::ProbeFailed(format!("Cannot read {}", file_path.display()))
        })?;
        MediaInfo::new(
            duration,
            Some("mock".to_string()),
            vec![StreamInfo {
                index: 0,
                codec_type: "video".to_string(),
                codec_name: Some("h264".to_string()),
                width: Some(640),
                height: Some(360),
            }],
        )
    }
}

#[async_trait]
impl ExecutePort for MockMediaTool {
    async fn extract_frame(
        &self,
        _input: &Path,
        at: f64,
        output: &Path,
        max_width: u32,
    ) -> Result<PathBuf, DomainError> {
        let at_ms = millis(at);
        self.record(ToolCall::Frame { at_ms });
        self.pause().await;
        if self.failing_frames.contains(&at_ms) {
            return Err(Self::failure(format!("cannot seek to {}ms", at_ms)));
        }
        Self::write(output, format!("frame@{}ms w{}\n", at_ms, max_width)).await
    }

    async fn trim(
        &self,
        _input: &Path,
        range: &TimeRange,
        output: &Path,
    ) -> Result<PathBuf, DomainError> {
        let (start_ms, end_ms) = (millis(range.start), millis(range.end));
        self.record(ToolCall::Trim { start_ms, end_ms });
        self.pause().await;
        if self.failing_trims.contains(&start_ms) {
            return Err(Self::failure(format!("cannot cut from {}ms", start_ms)));
        }
        Self::write(output, format!("trim {}-{}ms\n", start_ms, end_ms)).await
    }

    async fn concat(&self, inputs: &[PathBuf], output: &Path) -> Result<PathBuf, DomainError> {
        self.record(ToolCall::Concat {
            inputs: inputs.to_vec(),
        });
        self.pause().await;
        if self.fail_concat {
            return Err(Self::failure("concat demuxer error"));
        }

        let mut joined = String::new();
        for input in inputs {
            let part = tokio::fs::read_to_string(input)
                .await
                .map_err(|e| Self::failure(format!("unreadable {}: {}", input.display(), e)))?;
            joined.push_str(&part);
        }
        Self::write(output, joined).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scripted_failures() {
        let dir = TempDir::new().unwrap();
        let tool = MockMediaTool::new(10.0).failing_frame_at(2.5);

        let ok = tool
            .extract_frame(Path::new("in"), 0.0, &dir.path().join("a.jpg"), 320)
            .await;
        assert!(ok.is_ok());
        let failed = tool
            .extract_frame(Path::new("in"), 2.5, &dir.path().join("b.jpg"), 320)
            .await;
        assert!(matches!(failed, Err(DomainError::ToolFailed { .. })));
        assert!(!dir.path().join("b.jpg").exists());
        assert_eq!(tool.encode_count(), 2);
    }

    #[tokio::test]
    async fn test_concat_joins_in_order() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a");
        let b = dir.path().join("b");
        std::fs::write(&a, "A\n").unwrap();
        std::fs::write(&b, "B\n").unwrap();

        let tool = MockMediaTool::new(1.0);
        let out = dir.path().join("out");
        tool.concat(&[b.clone(), a.clone()], &out).await.unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "B\nA\n");
    }

    #[tokio::test]
    async fn test_unreadable_probe() {
        let tool = MockMediaTool::unreadable();
        let result = tool.probe_media(Path::new("x.mp4")).await;
        assert!(matches!(result, Err(DomainError::ProbeFailed(_))));
        assert_eq!(tool.calls(), vec![ToolCall::Probe(PathBuf::from("x.mp4"))]);
    }
}
